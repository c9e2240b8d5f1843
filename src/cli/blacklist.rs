//! Blacklist command implementation
//!
//! Blacklist entries are directory prefixes under which one rule is
//! suppressed. The rule is addressed by scope and identity; global rules
//! may also need a stage, since one identity can appear once per stage.

use crate::catalog::RuleCatalog;
use crate::cli::args::{BlacklistAction, BlacklistTarget};
use crate::cli::common::{
    EXIT_ERROR, EXIT_SUCCESS, config_exit_code, load_catalog, load_config, save_catalog,
};
use crate::error::ConfigError;
use crate::types::{RuleId, ScopePath};

/// Error type specific to blacklist command
#[derive(Debug, thiserror::Error)]
enum BlacklistError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid rule identity '{0}'")]
    InvalidId(String),
}

/// Run the blacklist command
///
/// # Returns
///
/// Exit code:
/// - 0: Success
/// - 2: Error
/// - 3: Configuration or catalog parse error
pub fn run_blacklist(action: BlacklistAction) -> i32 {
    match run_blacklist_inner(action) {
        Ok(message) => {
            println!("{}", message);
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            match &e {
                BlacklistError::Config(config) => config_exit_code(config),
                BlacklistError::InvalidId(_) => EXIT_ERROR,
            }
        }
    }
}

fn run_blacklist_inner(action: BlacklistAction) -> Result<String, BlacklistError> {
    let config = load_config()?;
    let mut catalog = load_catalog(&config)?;

    let message = apply(&mut catalog, action)?;

    save_catalog(&config, &catalog)?;
    Ok(message)
}

/// Applies one blacklist edit to the catalog
fn apply(catalog: &mut RuleCatalog, action: BlacklistAction) -> Result<String, BlacklistError> {
    match action {
        BlacklistAction::Add { target, path } => {
            let index = rule_index(catalog, &target)?;
            let path = ScopePath::new(path);
            catalog.add_blacklist_path(&target.scope, index, path.clone())?;
            Ok(format!("Blacklisted {} under {}", target.rule, path))
        }
        BlacklistAction::Remove { target, index } => {
            let rule = rule_index(catalog, &target)?;
            let removed = catalog.remove_blacklist_path(&target.scope, rule, index)?;
            Ok(format!(
                "Removed blacklist entry {} from {}",
                removed, target.rule
            ))
        }
    }
}

fn rule_index(catalog: &RuleCatalog, target: &BlacklistTarget) -> Result<usize, BlacklistError> {
    let id = RuleId::new(target.rule.as_str())
        .ok_or_else(|| BlacklistError::InvalidId(target.rule.clone()))?;
    Ok(catalog.position(&target.scope, &id, target.stage)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ScopeRef;
    use crate::rules::RuleSpec;
    use crate::types::PipelineStage;

    fn catalog() -> RuleCatalog {
        let mut catalog = RuleCatalog::new();
        catalog
            .add_rule(
                &ScopeRef::Global,
                RuleSpec::new(
                    RuleId::new("check.file-size").unwrap(),
                    PipelineStage::CommonPreprocess,
                ),
            )
            .unwrap();
        catalog
    }

    fn target() -> BlacklistTarget {
        BlacklistTarget {
            scope: ScopeRef::Global,
            rule: "check.file-size".to_string(),
            stage: None,
        }
    }

    #[test]
    fn test_add_then_remove() {
        let mut catalog = catalog();

        apply(
            &mut catalog,
            BlacklistAction::Add {
                target: target(),
                path: "Assets/Raw/".to_string(),
            },
        )
        .unwrap();
        assert_eq!(
            catalog.global().rules()[0].blacklist,
            vec![ScopePath::new("Assets/Raw")]
        );

        apply(
            &mut catalog,
            BlacklistAction::Remove {
                target: target(),
                index: 0,
            },
        )
        .unwrap();
        assert!(catalog.global().rules()[0].blacklist.is_empty());
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let mut catalog = catalog();
        let add = || BlacklistAction::Add {
            target: target(),
            path: "Assets/Raw".to_string(),
        };

        apply(&mut catalog, add()).unwrap();
        let err = apply(&mut catalog, add()).unwrap_err();
        assert!(matches!(
            err,
            BlacklistError::Config(ConfigError::DuplicateBlacklistPath { .. })
        ));
        assert_eq!(catalog.global().rules()[0].blacklist.len(), 1);
    }

    #[test]
    fn test_unknown_rule() {
        let mut catalog = catalog();
        let mut missing = target();
        missing.rule = "check.name-pattern".to_string();

        let err = apply(
            &mut catalog,
            BlacklistAction::Add {
                target: missing,
                path: "Assets".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BlacklistError::Config(ConfigError::RuleNotFound { .. })
        ));
    }
}
