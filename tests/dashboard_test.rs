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

#[cfg(test)]
mod tests {
    use futures::stream::{self, StreamExt};
    use productionapp::cli::dashboard::{
        drive, render, DashboardMsg, DashboardState, DashboardStyle, Outcome, Surface,
        TerminalInput,
    };
    use productionapp::domain::stack::{
        EngineEvent, EventSink, FailurePoint, ProgressMessage, ProgressSink, ProviderSpec,
    };
    use productionapp::shared::OperationError;
    use productionapp::{AppSpec, InMemoryEngine, Operation, OperationDriver, StackName};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;

    const TICK: Duration = Duration::from_secs(3600);

    /// Keeps every state the loop showed.
    #[derive(Default)]
    struct RecordingSurface {
        snapshots: Vec<DashboardState>,
        messages: Vec<DashboardMsg>,
        finished: Option<DashboardState>,
    }

    impl Surface for RecordingSurface {
        fn draw(&mut self, state: &DashboardState) -> anyhow::Result<()> {
            self.snapshots.push(state.clone());
            Ok(())
        }

        fn on_message(&mut self, msg: &DashboardMsg, state: &DashboardState) -> anyhow::Result<()> {
            self.messages.push(msg.clone());
            self.snapshots.push(state.clone());
            Ok(())
        }

        fn finish(&mut self, state: &DashboardState) -> anyhow::Result<()> {
            self.finished = Some(state.clone());
            Ok(())
        }
    }

    fn plain_style() -> DashboardStyle {
        DashboardStyle::default().with_color(false)
    }

    fn no_input() -> stream::Pending<TerminalInput> {
        stream::pending()
    }

    fn assert_exclusive(surface: &RecordingSurface) {
        for state in &surface.snapshots {
            for urn in state.completed.keys() {
                assert!(
                    !state.in_progress.contains_key(urn),
                    "{} is both in progress and completed",
                    urn
                );
            }
        }
    }

    fn spawn_driver(
        engine: Arc<InMemoryEngine>,
        operation: Operation,
        stack: StackName,
    ) -> (
        mpsc::Receiver<ProgressMessage>,
        mpsc::Receiver<EngineEvent>,
        JoinHandle<Result<(), OperationError>>,
    ) {
        let (progress_tx, progress_rx) = mpsc::channel(1);
        let (event_tx, event_rx) = mpsc::channel(1);
        let driver = OperationDriver::new(
            engine,
            ProviderSpec {
                name: "kubernetes".to_string(),
                min_server_minor: 20,
            },
        );
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
        (progress_rx, event_rx, producer)
    }

    #[tokio::test]
    async fn test_deploy_ends_with_endpoint() {
        let engine = Arc::new(InMemoryEngine::new("http://1.2.3.4"));
        let stack: StackName = "demo".parse().unwrap();
        let app = AppSpec::new("demo", "nginx:1.27", 80);
        let (progress, events, producer) =
            spawn_driver(engine.clone(), Operation::Update(app), stack.clone());

        let mut surface = RecordingSurface::default();
        let outcome = drive(progress, events, producer, TICK, no_input(), &mut surface)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Finished);
        let last = surface.finished.clone().unwrap();
        assert!(last.is_quitting());
        assert_eq!(last.current_step, "Succeeded! http://1.2.3.4");
        assert!(render(&last, &plain_style()).contains("Succeeded! http://1.2.3.4"));
        assert_exclusive(&surface);
        assert_eq!(engine.resources(&stack).len(), 4);

        let steps: Vec<&ProgressMessage> = surface
            .messages
            .iter()
            .filter_map(|msg| match msg {
                DashboardMsg::Progress(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(
            steps.first(),
            Some(&&ProgressMessage::step("Created/Selected stack \"demo\""))
        );
        assert!(steps.contains(&&ProgressMessage::step("Running refresh...")));
        assert_eq!(
            steps.last(),
            Some(&&ProgressMessage::CompletedWithEndpoint(
                "http://1.2.3.4".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_deploy_final_frame_shows_every_resource_completed() {
        for run in 0..200 {
            let engine = Arc::new(InMemoryEngine::new("http://1.2.3.4"));
            let app = AppSpec::new("demo", "nginx:1.27", 80);
            let (progress, events, producer) =
                spawn_driver(engine, Operation::Update(app), "demo".parse().unwrap());

            let mut surface = RecordingSurface::default();
            let outcome = drive(progress, events, producer, TICK, no_input(), &mut surface)
                .await
                .unwrap();

            assert_eq!(outcome, Outcome::Finished);
            let last = surface.finished.unwrap();
            assert!(
                last.in_progress.is_empty(),
                "run {}: still in progress {:?}",
                run,
                last.in_progress
            );
            assert_eq!(last.completed.len(), 4, "run {}", run);
        }
    }

    #[tokio::test]
    async fn test_destroy_ends_with_success() {
        let engine = Arc::new(InMemoryEngine::new("http://1.2.3.4"));
        let stack: StackName = "demo".parse().unwrap();
        engine.seed(&stack, AppSpec::new("demo", "nginx:1.27", 80));
        let (progress, events, producer) =
            spawn_driver(engine.clone(), Operation::Destroy, stack.clone());

        let mut surface = RecordingSurface::default();
        let outcome = drive(progress, events, producer, TICK, no_input(), &mut surface)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Finished);
        assert_eq!(surface.finished.unwrap().current_step, "Succeeded!");
        assert!(!engine.has_stack(&stack));
    }

    #[tokio::test]
    async fn test_failed_operation_has_no_final_frame() {
        let engine =
            Arc::new(InMemoryEngine::new("http://1.2.3.4").failing_at(FailurePoint::Refresh));
        let app = AppSpec::new("demo", "nginx:1.27", 80);
        let (progress, events, producer) =
            spawn_driver(engine, Operation::Update(app), "demo".parse().unwrap());

        let mut surface = RecordingSurface::default();
        let err = drive(progress, events, producer, TICK, no_input(), &mut surface)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Failed to refresh stack"));
        assert!(surface.finished.is_none());
    }

    #[tokio::test]
    async fn test_interrupt_before_any_event() {
        let (_progress_tx, progress) = mpsc::channel::<ProgressMessage>(1);
        let (_event_tx, events) = mpsc::channel::<EngineEvent>(1);
        let producer = tokio::spawn(futures::future::pending::<Result<(), OperationError>>());

        let input = stream::iter(vec![TerminalInput::Interrupt]).chain(stream::pending());
        let mut surface = RecordingSurface::default();
        let outcome = drive(progress, events, producer, TICK, input, &mut surface)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Interrupted);
        let last = surface.finished.unwrap();
        assert!(last.is_quitting());
        assert!(last.in_progress.is_empty());
        assert!(last.completed.is_empty());
    }

    #[tokio::test]
    async fn test_completed_resource_leaves_in_progress() {
        let (progress_tx, progress) = mpsc::channel::<ProgressMessage>(1);
        let (event_tx, events) = mpsc::channel::<EngineEvent>(1);
        let producer = tokio::spawn(async move {
            let _progress_tx = progress_tx;
            event_tx
                .send(EngineEvent::pre("A", "kubernetes:apps/v1:Deployment"))
                .await
                .unwrap();
            event_tx
                .send(EngineEvent::pre("B", "kubernetes:core/v1:Service"))
                .await
                .unwrap();
            event_tx
                .send(EngineEvent::outputs("A", "kubernetes:apps/v1:Deployment"))
                .await
                .unwrap();
            Ok::<(), OperationError>(())
        });

        let mut surface = RecordingSurface::default();
        let outcome = drive(progress, events, producer, TICK, no_input(), &mut surface)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Finished);
        let last = surface.finished.clone().unwrap();
        assert_eq!(last.in_progress_types(), vec!["kubernetes:core/v1:Service"]);
        assert_eq!(
            last.completed_types(),
            vec!["kubernetes:apps/v1:Deployment"]
        );
        assert_exclusive(&surface);
    }

    #[tokio::test]
    async fn test_resize_redraws_without_changing_state() {
        let (progress_tx, progress) = mpsc::channel::<ProgressMessage>(1);
        let (_event_tx, events) = mpsc::channel::<EngineEvent>(1);
        let producer = tokio::spawn(futures::future::pending::<Result<(), OperationError>>());

        let input = stream::iter(vec![TerminalInput::Resize(40), TerminalInput::Interrupt])
            .chain(stream::pending());
        progress_tx
            .send(ProgressMessage::step("Running update..."))
            .await
            .unwrap();

        let mut surface = RecordingSurface::default();
        let outcome = drive(progress, events, producer, TICK, input, &mut surface)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Interrupted);
        assert!(surface.snapshots.len() >= 3);
    }
}
