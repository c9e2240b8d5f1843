//! CLI argument parsing and command dispatch

pub mod args;
pub mod blacklist;
pub mod classify;
mod common;
pub mod export;
pub mod init;
pub mod list;
pub mod rule;
pub mod run;
pub mod scope;

// Re-export types for convenient access
pub use args::{Cli, ColorChoice, Command, OutputFormat};
pub use common::{EXIT_BLOCKED, EXIT_ERROR, EXIT_PARSE_ERROR, EXIT_SUCCESS};
