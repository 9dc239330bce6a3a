//! Stack commands: deploy, destroy and list

use crate::cli::dashboard::{self, DashboardStyle, Outcome, RunOptions};
use crate::cli::display::TableRenderer;
use crate::domain::config::{apply_to_app, apply_to_settings, parse_properties, AppSpec, Settings};
use crate::domain::stack::{
    Engine, EventSink, Operation, OperationDriver, ProgressSink, ProviderSpec, StackName,
};
use crate::infrastructure::kubernetes::resources::render_manifests;
use crate::infrastructure::kubernetes::{DeployKubeClientImpl, KubeEngine};
use clap::{Args, Parser};
use colored::Colorize;
use std::collections::HashMap;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Stack and deployment name; a random three-word name is used if omitted
    #[arg(long, global = true)]
    pub name: Option<String>,

    /// Configuration file path (TOML)
    #[arg(long, global = true, env = "PRODUCTIONAPP_CONFIG")]
    pub config_file: Option<String>,

    /// Dynamic configuration properties (-D key=value), override the config file
    /// Examples:
    ///   -D stack.project=web
    ///   -D engine.ready-timeout-secs=120
    ///   -D service.annotations=service.beta.kubernetes.io/aws-load-balancer-type=nlb
    #[arg(short = 'D', value_name = "KEY=VALUE", global = true, verbatim_doc_comment)]
    pub properties: Vec<String>,

    /// Path to kubeconfig file
    /// If not specified, uses default kubeconfig resolution (KUBECONFIG env or ~/.kube/config)
    #[arg(long, global = true)]
    pub kubeconfig: Option<String>,

    /// Kubernetes context to use
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Print progress as plain lines instead of the interactive dashboard
    #[arg(long, global = true)]
    pub plain: bool,
}

impl GlobalOpts {
    pub fn dynamic_configs(&self) -> anyhow::Result<HashMap<String, String>> {
        parse_properties(&self.properties)
            .map_err(|e| anyhow::anyhow!("Failed to parse dynamic configs: {}", e))
    }

    /// Config file, then command-line flags, then `-D` properties.
    pub fn load_settings(&self) -> anyhow::Result<Settings> {
        let mut settings = match &self.config_file {
            Some(path) => Settings::from(path)?,
            None => Settings::default(),
        };

        if let Some(kubeconfig) = &self.kubeconfig {
            settings.kubernetes.kubeconfig = Some(kubeconfig.clone());
        }
        if let Some(context) = &self.context {
            settings.kubernetes.context = Some(context.clone());
        }

        apply_to_settings(&self.dynamic_configs()?, &mut settings);
        Ok(settings)
    }
}

#[derive(Parser, Debug, Clone)]
pub struct DeployCommand {
    /// Container image to deploy
    #[arg(long)]
    pub image: String,

    /// Port the container listens on
    #[arg(long, default_value = "80")]
    pub port: i32,

    /// Print the generated manifests without touching the cluster
    #[arg(long)]
    pub dry_run: bool,
}

impl DeployCommand {
    pub async fn execute(&self, global: &GlobalOpts, settings: &Settings) -> anyhow::Result<()> {
        let stack = StackName::resolve(global.name.as_deref())?;

        let mut app = AppSpec::new(stack.as_str(), &self.image, self.port);
        apply_to_app(&global.dynamic_configs()?, &mut app);
        app.validate()?;

        if self.dry_run {
            print!("{}", render_manifests(&app)?);
            return Ok(());
        }

        info!(stack = %stack, image = %app.image, "Deploying");
        if run_operation(Operation::Update(app), stack, global, settings).await?
            == Outcome::Finished
        {
            println!("{}", "your application has been deployed!".green());
        }
        Ok(())
    }
}

#[derive(Parser, Debug, Clone)]
pub struct DestroyCommand {}

impl DestroyCommand {
    pub async fn execute(&self, global: &GlobalOpts, settings: &Settings) -> anyhow::Result<()> {
        let name = global
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Must specify a name for destroys"))?;
        let stack: StackName = name.parse()?;

        info!(stack = %stack, "Destroying");
        if run_operation(Operation::Destroy, stack, global, settings).await? == Outcome::Finished {
            println!("{}", "your application has been destroyed!".green());
        }
        Ok(())
    }
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {}

impl ListCommand {
    pub async fn execute(&self, settings: &Settings) -> anyhow::Result<()> {
        let engine = build_engine(settings).await?;
        let stacks = engine.list_stacks().await?;

        let renderer = TableRenderer::new();
        println!(
            "{}",
            renderer.render_stack_list(&settings.stack.project, &stacks)
        );
        Ok(())
    }
}

async fn build_engine(settings: &Settings) -> anyhow::Result<KubeEngine> {
    let client = DeployKubeClientImpl::new_with_config(
        settings.kubernetes.field_manager.clone(),
        settings.kubernetes.kubeconfig.clone(),
        settings.kubernetes.context.clone(),
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    Ok(KubeEngine::new(Arc::new(client), settings)?)
}

/// Spawn the operation and watch it on the dashboard until it ends.
async fn run_operation(
    operation: Operation,
    stack: StackName,
    global: &GlobalOpts,
    settings: &Settings,
) -> anyhow::Result<Outcome> {
    let engine: Arc<dyn Engine> = Arc::new(build_engine(settings).await?);
    let provider = ProviderSpec {
        name: settings.provider.name.clone(),
        min_server_minor: settings.provider.min_server_minor,
    };
    let driver = OperationDriver::new(engine, provider);

    let (progress_tx, progress_rx) = mpsc::channel(1);
    let (event_tx, event_rx) = mpsc::channel(1);
    let producer = tokio::spawn(async move {
        driver
            .run(
                operation,
                stack,
                ProgressSink::new(progress_tx),
                EventSink::new(event_tx),
            )
            .await
    });

    let plain = global.plain || !std::io::stdout().is_terminal();
    debug!(plain, "Starting dashboard");
    let options = RunOptions {
        style: DashboardStyle::from_conf(&settings.dashboard),
        tick: Duration::from_millis(settings.dashboard.tick_ms.max(1)),
        plain,
    };

    let outcome = dashboard::run(progress_rx, event_rx, producer, options).await?;
    if outcome == Outcome::Interrupted {
        eprintln!(
            "{}",
            "Interrupted; the operation may still be running on the cluster".yellow()
        );
    }
    Ok(outcome)
}
