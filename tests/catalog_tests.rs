//! Integration tests for catalog editing and persistence

mod common;

use assetgate::catalog::{RuleCatalog, ScopeRef};
use assetgate::error::ConfigError;
use assetgate::rules::RuleSpec;
use assetgate::types::{PipelineStage, RuleId, ScopePath};
use common::TestResult;

fn rule(id: &str, stage: PipelineStage, order: i32) -> RuleSpec {
    RuleSpec::new(RuleId::new(id).unwrap(), stage).with_order(order)
}

fn is_sorted(rules: &[RuleSpec]) -> bool {
    rules.windows(2).all(|w| w[0].sort_key() <= w[1].sort_key())
}

/// Deterministic sequence of adds and removes, checking order after every edit
#[test]
fn test_lists_stay_sorted_after_every_edit() {
    let mut catalog = RuleCatalog::new();
    let scope = ScopeRef::Local(ScopePath::new("Assets/Art"));
    catalog.add_scope(ScopePath::new("Assets/Art")).unwrap();

    let stages = PipelineStage::all();
    let mut seed: u32 = 7;
    let mut next = || {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        (seed >> 16) as usize
    };

    for i in 0..60 {
        let stage = stages[next() % stages.len()];
        let order = (next() % 7) as i32 - 3;
        let id = format!("check.rule-{}", i);

        catalog
            .add_rule(&ScopeRef::Global, rule(&id, stage, order))
            .unwrap();
        catalog.add_rule(&scope, rule(&id, stage, order)).unwrap();

        if i % 4 == 3 {
            let len = catalog.global().len();
            catalog.remove_rule(&ScopeRef::Global, next() % len).unwrap();
            let len = catalog.rules(&scope).unwrap().len();
            catalog.remove_rule(&scope, next() % len).unwrap();
        }

        assert!(is_sorted(catalog.global().rules()), "global unsorted after edit {}", i);
        assert!(is_sorted(catalog.rules(&scope).unwrap()), "scope unsorted after edit {}", i);
    }
}

#[test]
fn test_duplicate_identity_leaves_count_unchanged() {
    let mut catalog = RuleCatalog::new();
    catalog.add_scope(ScopePath::new("Assets")).unwrap();
    let scope = ScopeRef::Local(ScopePath::new("Assets"));

    catalog
        .add_rule(&scope, rule("check.file-size", PipelineStage::Move, 0))
        .unwrap();
    let before = catalog.rule_count();

    let err = catalog
        .add_rule(&scope, rule("check.file-size", PipelineStage::Delete, 9))
        .unwrap_err();

    assert!(matches!(err, ConfigError::DuplicateRuleKind { .. }));
    assert_eq!(catalog.rule_count(), before);
}

#[test]
fn test_duplicate_scope_rejected() {
    let mut catalog = RuleCatalog::new();
    catalog.add_scope(ScopePath::new("Assets/Audio")).unwrap();

    // trailing separators normalize to the same directory
    let err = catalog.add_scope(ScopePath::new("Assets\\Audio\\")).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateScope(_)));
    assert_eq!(catalog.scopes().len(), 1);
}

#[test]
fn test_save_and_load_preserve_catalog() -> TestResult {
    let temp = tempfile::TempDir::new()?;
    let path = temp.path().join("assetgate-rules.toml");

    let mut catalog = RuleCatalog::new();
    catalog.add_rule(
        &ScopeRef::Global,
        rule("check.file-size", PipelineStage::CommonPreprocess, 2)
            .with_param("max_bytes", 4096)
            .with_description("small files only"),
    )?;
    catalog.add_scope(ScopePath::new("Assets/UI"))?;
    let ui = ScopeRef::Local(ScopePath::new("Assets/UI"));
    catalog.add_rule(
        &ui,
        rule("process.notify", PipelineStage::Move, 0).with_param("message", "moved"),
    )?;
    catalog.add_blacklist_path(&ui, 0, ScopePath::new("Assets/UI/Legacy"))?;

    catalog.save(&path)?;
    let loaded = RuleCatalog::load(&path)?;

    assert_eq!(loaded, catalog);
    Ok(())
}

#[test]
fn test_load_rejects_duplicate_rules_in_file() -> TestResult {
    let temp = tempfile::TempDir::new()?;
    let path = temp.path().join("rules.toml");
    std::fs::write(
        &path,
        r#"
[[scopes]]
path = "Assets"

[[scopes.rules]]
id = "process.notify"
stage = "move"

[[scopes.rules]]
id = "process.notify"
stage = "delete"
"#,
    )?;

    let err = RuleCatalog::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateRuleKind { .. }));
    Ok(())
}
