//! Live view of a running deploy or destroy

pub mod msg;
pub mod runner;
pub mod state;
pub mod view;

pub use self::msg::DashboardMsg;
pub use self::runner::{drive, run, Outcome, RunOptions, Surface, TerminalInput};
pub use self::state::{Command, DashboardState, Phase};
pub use self::view::{plain_line, render, DashboardStyle, Rgb};
