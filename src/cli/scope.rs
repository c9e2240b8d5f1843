//! Scope command implementation

use crate::cli::args::ScopeAction;
use crate::cli::common::{EXIT_SUCCESS, config_exit_code, load_catalog, load_config, save_catalog};
use crate::error::ConfigError;
use crate::types::ScopePath;

/// Run the scope command
///
/// Removing a scope also removes every rule it holds.
///
/// # Returns
///
/// Exit code:
/// - 0: Success
/// - 2: Error
/// - 3: Configuration or catalog parse error
pub fn run_scope(action: ScopeAction) -> i32 {
    match run_scope_inner(action) {
        Ok(message) => {
            println!("{}", message);
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            config_exit_code(&e)
        }
    }
}

fn run_scope_inner(action: ScopeAction) -> Result<String, ConfigError> {
    let config = load_config()?;
    let mut catalog = load_catalog(&config)?;

    let message = match action {
        ScopeAction::Add { dir } => {
            let path = ScopePath::new(dir);
            catalog.add_scope(path.clone())?;
            format!("Added scope {}", path)
        }
        ScopeAction::Remove { dir } => {
            let removed = catalog.remove_scope(&ScopePath::new(dir))?;
            let noun = if removed.len() == 1 { "rule" } else { "rules" };
            format!(
                "Removed scope {} ({} {})",
                removed.path(),
                removed.len(),
                noun
            )
        }
    };

    save_catalog(&config, &catalog)?;
    Ok(message)
}
