// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Drives one deploy or destroy end to end and reports what happens

use crate::domain::config::AppSpec;
use crate::domain::stack::engine::{Engine, ProviderSpec};
use crate::domain::stack::events::{EventSink, ProgressMessage, ProgressSink};
use crate::domain::stack::name::StackName;
use crate::infrastructure::constants::OUTPUT_URL;
use crate::shared::error::OperationError;
use std::sync::Arc;
use tracing::{info, instrument};

/// What a run should do to its stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Update(AppSpec),
    Destroy,
}

impl Operation {
    pub fn is_destroy(&self) -> bool {
        matches!(self, Operation::Destroy)
    }
}

pub struct OperationDriver {
    engine: Arc<dyn Engine>,
    provider: ProviderSpec,
}

impl OperationDriver {
    pub fn new(engine: Arc<dyn Engine>, provider: ProviderSpec) -> Self {
        Self { engine, provider }
    }

    /// Select the stack, install the provider, refresh, then update or destroy.
    ///
    /// Every phase is bracketed by progress steps. The last message on success is
    /// `Completed` for a destroy or `CompletedWithEndpoint` for an update. Any
    /// failure stops the run and is returned as-is; nothing is retried here.
    #[instrument(skip_all, fields(stack = %stack, destroy = operation.is_destroy()))]
    pub async fn run(
        &self,
        operation: Operation,
        stack: StackName,
        progress: ProgressSink,
        events: EventSink,
    ) -> Result<(), OperationError> {
        self.engine
            .upsert_stack(&stack)
            .await
            .map_err(OperationError::StackSelection)?;
        progress
            .step(format!("Created/Selected stack \"{}\"", stack))
            .await;

        let provider_label = display_name(&self.provider.name);
        progress
            .step(format!("Installing the {} plugin", provider_label))
            .await;
        self.engine
            .install_provider(&self.provider)
            .await
            .map_err(OperationError::PluginInstall)?;
        progress
            .step(format!("Successfully installed {} plugin", provider_label))
            .await;

        progress.step("Running refresh...").await;
        let summary = self
            .engine
            .refresh(&stack)
            .await
            .map_err(OperationError::Refresh)?;
        info!(resources = summary.resources.len(), "Refresh complete");
        progress.step("Refresh succeeded!").await;

        match operation {
            Operation::Destroy => {
                progress.step("Running destroy...").await;
                self.engine
                    .destroy(&stack, &events)
                    .await
                    .map_err(OperationError::Destroy)?;
                self.engine
                    .remove_stack(&stack)
                    .await
                    .map_err(OperationError::Destroy)?;
                progress.step("Stack successfully destroyed").await;
                progress.send(ProgressMessage::Completed).await;
            }
            Operation::Update(app) => {
                progress.step("Running update...").await;
                let result = self
                    .engine
                    .up(&stack, &app, &events)
                    .await
                    .map_err(OperationError::Update)?;
                progress.step("Update succeeded!").await;

                let url = result
                    .outputs
                    .get(OUTPUT_URL)
                    .ok_or_else(|| {
                        OperationError::OutputContract(format!("output '{}' is missing", OUTPUT_URL))
                    })?
                    .as_str()
                    .ok_or_else(|| {
                        OperationError::OutputContract(format!(
                            "output '{}' is not a string",
                            OUTPUT_URL
                        ))
                    })?
                    .to_string();

                let finished = ProgressMessage::classify(&url);
                if !matches!(finished, ProgressMessage::CompletedWithEndpoint(_)) {
                    return Err(OperationError::OutputContract(format!(
                        "output '{}' is not an absolute URL: '{}'",
                        OUTPUT_URL, url
                    )));
                }

                progress.step(format!("URL: {}", url)).await;
                progress.send(finished).await;
            }
        }

        Ok(())
    }
}

fn display_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stack::events::EngineEvent;
    use crate::domain::stack::memory::{FailurePoint, InMemoryEngine};
    use crate::shared::error::ErrorClass;
    use tokio::sync::mpsc;

    fn provider() -> ProviderSpec {
        ProviderSpec {
            name: "kubernetes".to_string(),
            min_server_minor: 24,
        }
    }

    async fn run_collecting(
        engine: Arc<InMemoryEngine>,
        operation: Operation,
    ) -> (
        Result<(), OperationError>,
        Vec<ProgressMessage>,
        Vec<EngineEvent>,
    ) {
        let (progress_tx, mut progress_rx) = mpsc::channel(1);
        let (event_tx, mut event_rx) = mpsc::channel(1);
        let driver = OperationDriver::new(engine, provider());
        let stack: StackName = "demo".parse().unwrap();

        let handle = tokio::spawn(async move {
            driver
                .run(
                    operation,
                    stack,
                    ProgressSink::new(progress_tx),
                    EventSink::new(event_tx),
                )
                .await
        });

        let mut progress = Vec::new();
        let mut events = Vec::new();
        let mut progress_open = true;
        let mut events_open = true;
        while progress_open || events_open {
            tokio::select! {
                msg = progress_rx.recv(), if progress_open => match msg {
                    Some(msg) => progress.push(msg),
                    None => progress_open = false,
                },
                ev = event_rx.recv(), if events_open => match ev {
                    Some(ev) => events.push(ev),
                    None => events_open = false,
                },
            }
        }

        (handle.await.unwrap(), progress, events)
    }

    fn steps(progress: &[ProgressMessage]) -> Vec<String> {
        progress
            .iter()
            .filter_map(|m| match m {
                ProgressMessage::Step(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_update_reports_phases_in_order() {
        let engine = Arc::new(InMemoryEngine::new("http://10.0.0.7"));
        let app = AppSpec::new("demo", "nginx", 8080);

        let (result, progress, events) = run_collecting(engine, Operation::Update(app)).await;
        assert!(result.is_ok());

        assert_eq!(
            steps(&progress),
            vec![
                "Created/Selected stack \"demo\"",
                "Installing the Kubernetes plugin",
                "Successfully installed Kubernetes plugin",
                "Running refresh...",
                "Refresh succeeded!",
                "Running update...",
                "Update succeeded!",
                "URL: http://10.0.0.7",
            ]
        );
        assert_eq!(
            progress.last(),
            Some(&ProgressMessage::CompletedWithEndpoint(
                "http://10.0.0.7".to_string()
            ))
        );
        assert_eq!(events.len(), 8);
    }

    #[tokio::test]
    async fn test_destroy_finishes_with_completed() {
        let engine = Arc::new(InMemoryEngine::new("http://10.0.0.7"));
        let stack: StackName = "demo".parse().unwrap();
        engine.seed(&stack, AppSpec::new("demo", "nginx", 80));

        let (result, progress, events) = run_collecting(engine.clone(), Operation::Destroy).await;
        assert!(result.is_ok());
        assert_eq!(progress.last(), Some(&ProgressMessage::Completed));
        assert!(steps(&progress).contains(&"Stack successfully destroyed".to_string()));
        assert_eq!(events.len(), 8);
        assert!(!engine.has_stack(&stack));
    }

    #[tokio::test]
    async fn test_setup_failure_is_fatal() {
        let engine = Arc::new(
            InMemoryEngine::new("http://10.0.0.7").failing_at(FailurePoint::InstallProvider),
        );
        let app = AppSpec::new("demo", "nginx", 80);

        let (result, progress, events) = run_collecting(engine, Operation::Update(app)).await;
        let err = result.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Setup);
        assert!(!progress.iter().any(ProgressMessage::is_terminal));
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_failure_is_operational() {
        let engine =
            Arc::new(InMemoryEngine::new("http://10.0.0.7").failing_at(FailurePoint::Refresh));

        let (result, progress, _) = run_collecting(engine, Operation::Destroy).await;
        assert_eq!(result.unwrap_err().class(), ErrorClass::Operational);
        assert_eq!(steps(&progress).last().map(String::as_str), Some("Running refresh..."));
    }

    #[tokio::test]
    async fn test_missing_url_output_breaks_contract() {
        let engine = Arc::new(InMemoryEngine::with_outputs(Default::default()));
        let app = AppSpec::new("demo", "nginx", 80);

        let (result, progress, _) = run_collecting(engine, Operation::Update(app)).await;
        let err = result.unwrap_err();
        assert_eq!(err.class(), ErrorClass::OutputContract);
        assert!(!progress.iter().any(ProgressMessage::is_terminal));
    }

    #[tokio::test]
    async fn test_non_string_or_non_url_output_breaks_contract() {
        let mut outputs = std::collections::HashMap::new();
        outputs.insert("url".to_string(), serde_json::json!(42));
        let engine = Arc::new(InMemoryEngine::with_outputs(outputs));
        let (result, _, _) =
            run_collecting(engine, Operation::Update(AppSpec::new("demo", "nginx", 80))).await;
        assert_eq!(result.unwrap_err().class(), ErrorClass::OutputContract);

        let mut outputs = std::collections::HashMap::new();
        outputs.insert("url".to_string(), serde_json::json!("could not find ingress"));
        let engine = Arc::new(InMemoryEngine::with_outputs(outputs));
        let (result, _, _) =
            run_collecting(engine, Operation::Update(AppSpec::new("demo", "nginx", 80))).await;
        assert_eq!(result.unwrap_err().class(), ErrorClass::OutputContract);
    }

    #[tokio::test]
    async fn test_run_survives_viewer_going_away() {
        let engine = Arc::new(InMemoryEngine::new("http://10.0.0.7"));
        let (progress_tx, progress_rx) = mpsc::channel(1);
        let (event_tx, event_rx) = mpsc::channel(1);
        drop(progress_rx);
        drop(event_rx);

        let driver = OperationDriver::new(engine.clone(), provider());
        let stack: StackName = "demo".parse().unwrap();
        let result = driver
            .run(
                Operation::Update(AppSpec::new("demo", "nginx", 80)),
                stack.clone(),
                ProgressSink::new(progress_tx),
                EventSink::new(event_tx),
            )
            .await;

        assert!(result.is_ok());
        assert!(engine.has_stack(&stack));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("kubernetes"), "Kubernetes");
        assert_eq!(display_name(""), "");
    }
}
