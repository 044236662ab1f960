//! CLI command implementations

pub mod completions;
pub mod family;
pub mod init;
