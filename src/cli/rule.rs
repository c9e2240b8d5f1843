//! Rule command implementation
//!
//! `assetgate rule add` validates the rule against the built-in handler
//! registry before it is written to the catalog; `assetgate rule remove`
//! removes by position within a scope, as shown by `assetgate list`.

use crate::catalog::{RuleCatalog, ScopeRef};
use crate::cli::args::{RuleAction, RuleAddArgs};
use crate::cli::common::{
    EXIT_ERROR, EXIT_SUCCESS, config_exit_code, load_catalog, load_config, save_catalog,
};
use crate::error::ConfigError;
use crate::rules::{HandlerRegistry, RuleSpec};
use crate::types::{AssetType, RuleId};

/// Error type specific to rule command
#[derive(Debug, thiserror::Error)]
enum RuleCommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid rule identity '{0}'")]
    InvalidId(String),
}

/// Run the rule command
///
/// # Returns
///
/// Exit code:
/// - 0: Success
/// - 2: Error
/// - 3: Configuration or catalog parse error
pub fn run_rule(action: RuleAction) -> i32 {
    match run_rule_inner(action) {
        Ok(message) => {
            println!("{}", message);
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if let RuleCommandError::Config(ConfigError::NullRule(_)) = &e {
                eprintln!("Registered rule types:");
                for line in registered_types(&HandlerRegistry::with_builtins()) {
                    eprintln!("  {}", line);
                }
            }
            match &e {
                RuleCommandError::Config(config) => config_exit_code(config),
                RuleCommandError::InvalidId(_) => EXIT_ERROR,
            }
        }
    }
}

fn run_rule_inner(action: RuleAction) -> Result<String, RuleCommandError> {
    let config = load_config()?;
    let mut catalog = load_catalog(&config)?;

    let message = match action {
        RuleAction::Add(args) => {
            let registry = HandlerRegistry::with_builtins();
            let scope = args.scope.clone();
            let spec = spec_from_args(args)?;
            let id = spec.id.clone();
            add_rule(&mut catalog, &scope, spec, &registry)?;
            format!("Added {} to {}", id, scope)
        }
        RuleAction::Remove { scope, index } => {
            let removed = catalog.remove_rule(&scope, index)?;
            format!("Removed {} from {}", removed.id, scope)
        }
    };

    save_catalog(&config, &catalog)?;
    Ok(message)
}

/// Builds the rule spec described by `rule add` arguments
fn spec_from_args(args: RuleAddArgs) -> Result<RuleSpec, RuleCommandError> {
    let id = RuleId::new(args.id.as_str()).ok_or(RuleCommandError::InvalidId(args.id))?;
    let mut spec = RuleSpec::new(id, args.stage)
        .with_types(args.types.unwrap_or(AssetType::ALL))
        .with_order(args.order);
    if let Some(name) = args.name {
        spec.name = name;
    }
    if let Some(description) = args.description {
        spec.description = description;
    }
    for (key, value) in args.params {
        spec.params.insert(key, value);
    }
    Ok(spec)
}

fn add_rule(
    catalog: &mut RuleCatalog,
    scope: &ScopeRef,
    spec: RuleSpec,
    registry: &HandlerRegistry,
) -> Result<(), ConfigError> {
    catalog.add_rule_checked(scope, spec, registry)
}

/// One `id (kind): summary` line per registered handler, in identity order
fn registered_types(registry: &HandlerRegistry) -> Vec<String> {
    registry
        .iter()
        .map(|(id, kind, summary)| format!("{} ({}): {}", id, kind, summary))
        .collect()
}
