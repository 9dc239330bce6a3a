use crate::domain::stack::{EngineEvent, ProgressMessage};

/// Everything the dashboard reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardMsg {
    /// Lifecycle event from the engine.
    Event(EngineEvent),
    /// Progress line from the running operation.
    Progress(ProgressMessage),
    /// Animation tick.
    Tick,
    /// Any key press.
    Interrupt,
}

impl From<EngineEvent> for DashboardMsg {
    fn from(event: EngineEvent) -> Self {
        Self::Event(event)
    }
}

impl From<ProgressMessage> for DashboardMsg {
    fn from(msg: ProgressMessage) -> Self {
        Self::Progress(msg)
    }
}
