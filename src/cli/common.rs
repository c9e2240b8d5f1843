//! Common helper functions shared across CLI commands
//!
//! Commands run from the project root: `assetgate.toml` and every path it
//! names are resolved against the current directory.

use crate::catalog::RuleCatalog;
use crate::config::{CONFIG_FILE, ColorOption, Config};
use crate::error::{ConfigError, SnapshotError};
use crate::output::color_choice;
use std::path::Path;
use termcolor::StandardStream;

/// Exit codes
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_BLOCKED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;
pub const EXIT_PARSE_ERROR: i32 = 3;

/// Project root all configured paths are relative to
pub(crate) fn project_root() -> &'static Path {
    Path::new(".")
}

/// Load assetgate.toml configuration
///
/// # Errors
///
/// Returns `ConfigError::Io` if assetgate.toml does not exist or cannot be read.
/// Returns `ConfigError::Parse` if assetgate.toml is invalid.
pub(crate) fn load_config() -> Result<Config, ConfigError> {
    let config_path = project_root().join(CONFIG_FILE);
    if !config_path.exists() {
        return Err(ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "assetgate.toml not found. Run 'assetgate init' to create it.",
        )));
    }

    Config::load(config_path)
}

/// Load the authored rule catalog named by the configuration
///
/// # Errors
///
/// Returns `ConfigError::Io` if the catalog does not exist, `ConfigError::Parse`
/// if it is not valid TOML, or the invariant error its contents break.
pub(crate) fn load_catalog(config: &Config) -> Result<RuleCatalog, ConfigError> {
    let path = config.rules_path(project_root());
    if !path.exists() {
        return Err(ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!(
                "{} not found. Run 'assetgate init' to create it.",
                path.display()
            ),
        )));
    }
    RuleCatalog::load(&path)
}

/// Write the catalog back to the configured file
pub(crate) fn save_catalog(config: &Config, catalog: &RuleCatalog) -> Result<(), ConfigError> {
    catalog.save(&config.rules_path(project_root()))
}

/// Command-line color unless it is `auto`, then the configured color
pub(crate) fn resolve_color(cli: ColorOption, config: Option<&Config>) -> ColorOption {
    match (cli, config) {
        (ColorOption::Auto, Some(config)) => config.output.color,
        (cli, _) => cli,
    }
}

pub(crate) fn stdout(color: ColorOption) -> StandardStream {
    StandardStream::stdout(color_choice(color))
}

/// Exit code for a configuration error
pub(crate) fn config_exit_code(e: &ConfigError) -> i32 {
    match e {
        ConfigError::Parse(_) => EXIT_PARSE_ERROR,
        _ => EXIT_ERROR,
    }
}

/// Exit code for a snapshot error
pub(crate) fn snapshot_exit_code(e: &SnapshotError) -> i32 {
    match e {
        SnapshotError::Parse { .. } => EXIT_PARSE_ERROR,
        SnapshotError::Config(inner) => config_exit_code(inner),
        _ => EXIT_ERROR,
    }
}
