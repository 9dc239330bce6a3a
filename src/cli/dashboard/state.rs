//! Dashboard view model and its transition function

use super::msg::DashboardMsg;
use crate::domain::stack::{EngineEvent, ProgressMessage};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Running,
    Quitting,
}

/// What the runner should do after a message has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Wait for the next lifecycle event.
    ListenEvents,
    /// Wait for the next progress message.
    ListenProgress,
    /// Schedule the next animation tick.
    Tick,
    /// Stop the loop.
    Quit,
    None,
}

/// Visible state of a running operation.
///
/// A resource identifier is in at most one of `in_progress` and `completed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardState {
    pub in_progress: HashMap<String, String>,
    pub completed: HashMap<String, String>,
    pub current_step: String,
    pub phase: Phase,
    pub spinner_frame: usize,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_quitting(&self) -> bool {
        self.phase == Phase::Quitting
    }

    pub fn update(&mut self, msg: DashboardMsg) -> Command {
        if self.is_quitting() {
            return Command::Quit;
        }

        match msg {
            DashboardMsg::Event(event) => {
                self.apply_event(event);
                Command::ListenEvents
            }
            DashboardMsg::Progress(ProgressMessage::Completed) => {
                self.current_step = "Succeeded!".to_string();
                self.quit()
            }
            DashboardMsg::Progress(ProgressMessage::CompletedWithEndpoint(endpoint)) => {
                self.current_step = format!("Succeeded! {}", endpoint);
                self.quit()
            }
            DashboardMsg::Progress(ProgressMessage::Step(text)) => {
                self.current_step = text;
                Command::ListenProgress
            }
            DashboardMsg::Tick => {
                self.spinner_frame = self.spinner_frame.wrapping_add(1);
                Command::Tick
            }
            DashboardMsg::Interrupt => self.quit(),
        }
    }

    /// Record a lifecycle event. Unlike `update`, this still applies once
    /// quitting, so events left over at completion reach the last frame.
    pub fn apply_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::ResourcePre { urn, type_name } => {
                self.completed.remove(&urn);
                self.in_progress.insert(urn, type_name);
            }
            EngineEvent::ResourceOutputs { urn, type_name } => {
                self.in_progress.remove(&urn);
                self.completed.insert(urn, type_name);
            }
        }
    }

    /// Type names of resources being worked on, sorted.
    pub fn in_progress_types(&self) -> Vec<&str> {
        sorted_values(&self.in_progress)
    }

    /// Type names of finished resources, sorted.
    pub fn completed_types(&self) -> Vec<&str> {
        sorted_values(&self.completed)
    }

    fn quit(&mut self) -> Command {
        self.phase = Phase::Quitting;
        Command::Quit
    }
}

fn sorted_values(map: &HashMap<String, String>) -> Vec<&str> {
    let mut values: Vec<&str> = map.values().map(String::as_str).collect();
    values.sort_unstable();
    values
}
