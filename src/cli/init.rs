//! Initialize an assetgate project
//!
//! Creates the configuration, an empty rule catalog, and the resource root.

use crate::config::{CONFIG_FILE, DEFAULT_CONFIG};
use std::fs;
use std::path::Path;

/// Default content for assetgate-rules.toml
const DEFAULT_CATALOG_TOML: &str = r#"# assetgate rule catalog
# Global rules run before local scopes; outer scopes run before inner ones.
#
# Example:
# [[global]]
# id = "check.file-size"
# stage = "common-preprocess"
# params = { max_bytes = 8388608 }
#
# [[scopes]]
# path = "Assets/Art"
#
# [[scopes.rules]]
# id = "process.import-setting"
# stage = "typed-preprocess"
# types = ["texture"]
# params = { key = "compression", value = "bc7" }
"#;

const CATALOG_FILE: &str = "assetgate-rules.toml";
const RESOURCE_ROOT: &str = "Assets";

/// Error type for init command
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Path error
    #[error("Path error: {0}")]
    Path(String),
}

/// Result of init command
#[derive(Debug, PartialEq, Eq)]
pub struct InitResult {
    /// Files that were created
    pub created: Vec<String>,
    /// Files that were skipped (already existed)
    pub skipped: Vec<String>,
    /// Files that were overwritten
    pub overwritten: Vec<String>,
}

impl InitResult {
    fn new() -> Self {
        Self {
            created: Vec::new(),
            skipped: Vec::new(),
            overwritten: Vec::new(),
        }
    }
}

/// Run the init command
///
/// Creates the following files and directories:
/// - assetgate.toml (project configuration)
/// - assetgate-rules.toml (authored rule catalog, empty)
/// - Assets/ (default resource root)
///
/// # Arguments
/// * `force` - If true, overwrite existing files. If false, skip existing files.
pub fn run_init(force: bool) -> Result<InitResult, InitError> {
    let mut result = InitResult::new();

    handle_file(Path::new(CONFIG_FILE), DEFAULT_CONFIG, force, &mut result)?;
    handle_file(
        Path::new(CATALOG_FILE),
        DEFAULT_CATALOG_TOML,
        force,
        &mut result,
    )?;
    create_directory(RESOURCE_ROOT, &mut result)?;

    tracing::debug!(created = result.created.len(), "initialized project");
    Ok(result)
}

fn handle_file(
    path: &Path,
    content: &str,
    force: bool,
    result: &mut InitResult,
) -> Result<(), InitError> {
    let path_str = path_to_string(path)?;

    if path.exists() {
        if force {
            fs::write(path, content)?;
            result.overwritten.push(path_str);
        } else {
            result.skipped.push(path_str);
        }
    } else {
        fs::write(path, content)?;
        result.created.push(path_str);
    }

    Ok(())
}

fn create_directory(path: &str, result: &mut InitResult) -> Result<(), InitError> {
    let dir_path = Path::new(path);

    if dir_path.exists() {
        if dir_path.is_dir() {
            Ok(())
        } else {
            Err(InitError::Path(format!(
                "Path '{}' exists but is not a directory",
                path
            )))
        }
    } else {
        fs::create_dir_all(dir_path)?;
        result.created.push(format!("{}/", path));
        Ok(())
    }
}

fn path_to_string(path: &Path) -> Result<String, InitError> {
    path.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| InitError::Path(format!("Invalid UTF-8 in path: {:?}", path)))
}
