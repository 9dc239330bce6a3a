//! Command-line surface: argument parsing, commands and terminal output

pub mod commands;
pub mod dashboard;
pub mod display;
pub mod logging;
pub mod stack;

pub use commands::{CliArgs, Commands};
