// CLI command definitions

use super::stack::{DeployCommand, DestroyCommand, GlobalOpts, ListCommand};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

#[derive(Parser, Debug)]
#[command(
    name = "productionapp",
    version,
    about = "A command-line application deployment tool for Kubernetes",
    long_about = "Deploys a container image to Kubernetes as a namespace, a three-replica \
                  deployment and a load-balanced service, with a live progress dashboard"
)]
pub struct CliArgs {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Deploy a container image
    Deploy(DeployCommand),

    /// Destroy a deployment
    Destroy(DestroyCommand),

    /// List deployments of the project
    List(ListCommand),
}

impl CliArgs {
    /// Checks clap cannot express on its own.
    pub fn validate(&self) -> Result<(), clap::Error> {
        let has_name = self
            .global
            .name
            .as_deref()
            .is_some_and(|name| !name.is_empty());

        if matches!(self.command, Commands::Destroy(_)) && !has_name {
            return Err(Self::command().error(
                ErrorKind::MissingRequiredArgument,
                "Must specify a name for destroys",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_destroy_requires_name() {
        let args = CliArgs::try_parse_from(["productionapp", "destroy"]).unwrap();
        let err = args.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert!(err.to_string().contains("Must specify a name for destroys"));

        let args =
            CliArgs::try_parse_from(["productionapp", "destroy", "--name", "demo"]).unwrap();
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_deploy_defaults() {
        let args = CliArgs::try_parse_from(["productionapp", "deploy", "--image", "nginx"]).unwrap();
        assert!(args.validate().is_ok());
        match args.command {
            Commands::Deploy(cmd) => {
                assert_eq!(cmd.image, "nginx");
                assert_eq!(cmd.port, 80);
                assert!(!cmd.dry_run);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(args.global.name.is_none());
    }

    #[test]
    fn test_deploy_requires_image() {
        assert!(CliArgs::try_parse_from(["productionapp", "deploy"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "productionapp",
            "deploy",
            "--image",
            "nginx",
            "--name",
            "demo",
            "-D",
            "stack.project=web",
            "--plain",
        ])
        .unwrap();
        assert_eq!(args.global.name.as_deref(), Some("demo"));
        assert_eq!(args.global.properties, vec!["stack.project=web".to_string()]);
        assert!(args.global.plain);
    }
}
