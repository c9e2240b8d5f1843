//! List command implementation
//!
//! This module implements the `assetgate list` command, which:
//! - Loads the authored rule catalog
//! - Prints the global tier, then every local scope in path order
//! - Shows each rule with the position `rule remove` takes

use crate::cli::args::OutputFormat;
use crate::cli::common::{
    EXIT_ERROR, EXIT_SUCCESS, config_exit_code, load_catalog, load_config, resolve_color, stdout,
};
use crate::config::ColorOption;
use crate::error::ConfigError;
use crate::output::{HumanFormatter, JsonlFormatter, catalog_listing};
use std::io::{self, Write};

/// Error type specific to list command
#[derive(Debug, thiserror::Error)]
enum ListError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Run the list command
///
/// # Returns
///
/// Exit code:
/// - 0: Success
/// - 2: Error
/// - 3: Configuration or catalog parse error
pub fn run_list(format: Option<OutputFormat>, color: ColorOption) -> i32 {
    match run_list_inner(format, color) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            match &e {
                ListError::Config(config) => config_exit_code(config),
                ListError::Io(_) => EXIT_ERROR,
            }
        }
    }
}

fn run_list_inner(format: Option<OutputFormat>, color: ColorOption) -> Result<(), ListError> {
    let config = load_config()?;
    let catalog = load_catalog(&config)?;
    let listing = catalog_listing(&catalog);

    let format = format.unwrap_or_else(|| config.output.format.into());
    match format {
        OutputFormat::Human => {
            let mut out = stdout(resolve_color(color, Some(&config)));
            if catalog.rule_count() == 0 && catalog.scopes().is_empty() {
                writeln!(out, "No rules are configured.")?;
                return Ok(());
            }
            HumanFormatter::new().write_listing(&mut out, &listing)?;
        }
        OutputFormat::Jsonl => {
            let output = JsonlFormatter::new().format_listing(&listing);
            io::stdout().write_all(output.as_bytes())?;
        }
    }
    Ok(())
}
