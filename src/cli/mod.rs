//! CLI module - argument parsing and command dispatch

pub mod args;
pub mod commands;
pub mod output;
pub mod payload;
pub mod workspace;

pub use args::{Cli, Commands, GlobalOpts, OutputFormat};

use crate::core::config::LoggingConfig;
use crate::core::telemetry;

/// Install the log subscriber for this invocation
///
/// The workspace's `logging` section applies when one can be found; a broken
/// or missing config falls back to defaults so the command itself can report it.
pub fn init_telemetry(global: &GlobalOpts) {
    let logging = workspace::Workspace::locate(global)
        .ok()
        .flatten()
        .map(|ws| ws.config().logging.clone())
        .unwrap_or_else(LoggingConfig::default);
    telemetry::init(global.verbose, &logging);
}
