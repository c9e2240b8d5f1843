//! Classify command implementation
//!
//! Prints the asset type each path maps to. Needs no configuration, so it
//! works outside an initialized project.

use crate::classify::AssetTypeClassifier;
use crate::cli::args::OutputFormat;
use crate::cli::common::{EXIT_ERROR, EXIT_SUCCESS, stdout};
use crate::config::ColorOption;
use crate::output::{ClassifiedPath, HumanFormatter, JsonlFormatter};
use std::io::{self, Write};
use std::path::Path;

/// Error type specific to classify command
#[derive(Debug, thiserror::Error)]
enum ClassifyError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Run the classify command
///
/// # Returns
///
/// Exit code:
/// - 0: Success
/// - 2: Error
pub fn run_classify(paths: &[String], format: OutputFormat, color: ColorOption) -> i32 {
    match run_classify_inner(paths, format, color) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_ERROR
        }
    }
}

fn run_classify_inner(
    paths: &[String],
    format: OutputFormat,
    color: ColorOption,
) -> Result<(), ClassifyError> {
    let classified = classify_paths(paths);

    match format {
        OutputFormat::Human => {
            let mut out = stdout(color);
            HumanFormatter::new().write_classifications(&mut out, &classified)?;
        }
        OutputFormat::Jsonl => {
            let output = JsonlFormatter::new().format_classifications(&classified);
            io::stdout().write_all(output.as_bytes())?;
        }
    }
    Ok(())
}

/// Classifies paths in argument order; existing directories are folders
fn classify_paths(paths: &[String]) -> Vec<ClassifiedPath> {
    let classifier = AssetTypeClassifier::new();
    paths
        .iter()
        .map(|path| ClassifiedPath {
            path: path.clone(),
            classification: classifier.classify_detailed(path, Path::new(path).is_dir()),
        })
        .collect()
}
