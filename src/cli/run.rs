//! Run command implementation
//!
//! This module implements the `assetgate run` command, which:
//! - Builds the dispatch index from the authored catalog, or from the
//!   exported snapshot with `--snapshot`
//! - Dispatches one event for the given path and stage
//! - Prints the outcome, and with `--explain` every dispatch decision
//!
//! The exit code is 1 when a check blocked the stage.

use crate::cli::args::{OutputFormat, RunArgs};
use crate::cli::common::{
    EXIT_BLOCKED, EXIT_ERROR, EXIT_SUCCESS, config_exit_code, load_catalog, load_config,
    project_root, resolve_color, snapshot_exit_code, stdout,
};
use crate::config::{ColorOption, Config};
use crate::engine::{AssetEvent, Diagnostics, DispatchEngine, RecordingSink, TracingSink};
use crate::error::{ConfigError, ResolutionError, SnapshotError};
use crate::index::ScopeIndex;
use crate::output::{HumanFormatter, JsonlFormatter, RunReport};
use crate::rules::{HandlerRegistry, ImportSettings};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

/// Error type specific to run command
#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Run the run command
///
/// # Returns
///
/// Exit code:
/// - 0: The event was dispatched (or filtered) without being blocked
/// - 1: A check blocked the stage
/// - 2: Error
/// - 3: Configuration, catalog, or snapshot parse error
pub fn run_run(args: &RunArgs, color: ColorOption) -> i32 {
    match run_run_inner(args, color) {
        Ok(true) => EXIT_BLOCKED,
        Ok(false) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            match &e {
                RunError::Config(config) => config_exit_code(config),
                RunError::Snapshot(snapshot) => snapshot_exit_code(snapshot),
                RunError::Io(_) => EXIT_ERROR,
            }
        }
    }
}

/// Returns whether the event was blocked
fn run_run_inner(args: &RunArgs, color: ColorOption) -> Result<bool, RunError> {
    let config = load_config()?;
    let registry = HandlerRegistry::with_builtins();
    let (index, resolution_errors) = build_index(&config, &registry, args.snapshot)?;
    for error in &resolution_errors {
        tracing::warn!(error = %error, "rule left out of dispatch");
    }

    let recorder = args.explain.then(|| Arc::new(RecordingSink::new()));
    let diagnostics = match &recorder {
        Some(recorder) => Diagnostics::new(recorder.clone()),
        None if config.diagnostics.enabled => Diagnostics::new(Arc::new(TracingSink)),
        None => Diagnostics::disabled(),
    };

    let engine = DispatchEngine::new(index)
        .with_filter(config.event_filter()?)
        .with_diagnostics(diagnostics)
        .with_project_root(project_root());

    let mut event = build_event(args);
    let outcome = engine.dispatch(&mut event);
    let decisions = recorder.map(|r| r.take()).unwrap_or_default();

    let report = RunReport {
        path: &args.path,
        stage: args.stage,
        outcome: &outcome,
        decisions: &decisions,
        resolution_errors: &resolution_errors,
        settings: event.settings.as_ref(),
    };

    let format = args
        .format
        .unwrap_or_else(|| config.output.format.into());
    match format {
        OutputFormat::Human => {
            let mut out = stdout(resolve_color(color, Some(&config)));
            HumanFormatter::new().write_run(&mut out, &report)?;
        }
        OutputFormat::Jsonl => {
            let output = JsonlFormatter::new().format_run(&report);
            io::stdout().write_all(output.as_bytes())?;
        }
    }

    Ok(outcome.is_blocked())
}

/// Index from the catalog, or from the snapshot directory
fn build_index(
    config: &Config,
    registry: &HandlerRegistry,
    from_snapshot: bool,
) -> Result<(ScopeIndex, Vec<ResolutionError>), RunError> {
    if from_snapshot {
        let dir = config.snapshot_path(project_root());
        let loaded = crate::snapshot::SnapshotImporter::new(registry).load(&dir)?;
        Ok((loaded.build_index(), loaded.errors))
    } else {
        let catalog = load_catalog(config)?;
        Ok(ScopeIndex::from_catalog(&catalog, registry))
    }
}

fn build_event(args: &RunArgs) -> AssetEvent {
    let mut event = AssetEvent::new(args.path.as_str(), args.stage);
    if let Some(asset_type) = args.asset_type {
        event = event.with_type(asset_type);
    }
    if Path::new(&args.path).is_dir() {
        event = event.directory();
    }
    if args.stage.is_import() {
        event = event.with_settings(ImportSettings::new());
    }
    event
}
