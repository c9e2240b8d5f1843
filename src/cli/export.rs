//! Export command implementation
//!
//! Writes the runtime snapshot (manifest, global and local record files)
//! into the configured snapshot directory.

use crate::cli::common::{
    EXIT_SUCCESS, config_exit_code, load_catalog, load_config, project_root, snapshot_exit_code,
};
use crate::error::{ConfigError, SnapshotError};
use crate::snapshot::SnapshotExporter;

/// Error type specific to export command
#[derive(Debug, thiserror::Error)]
enum ExportError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Run the export command
///
/// # Returns
///
/// Exit code:
/// - 0: Success
/// - 2: Error
/// - 3: Configuration or catalog parse error
pub fn run_export() -> i32 {
    match run_export_inner() {
        Ok(message) => {
            println!("{}", message);
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            match &e {
                ExportError::Config(config) => config_exit_code(config),
                ExportError::Snapshot(snapshot) => snapshot_exit_code(snapshot),
            }
        }
    }
}

fn run_export_inner() -> Result<String, ExportError> {
    let config = load_config()?;
    let catalog = load_catalog(&config)?;
    let dir = config.snapshot_path(project_root());

    let snapshot = SnapshotExporter::export(&catalog, &dir)?;
    let count = snapshot.manifest.entries.len();
    if count == 0 && catalog.scopes().is_empty() {
        tracing::warn!("exported an empty snapshot");
    }

    let noun = if count == 1 { "rule" } else { "rules" };
    Ok(format!("Exported {} {} to {}", count, noun, dir.display()))
}
