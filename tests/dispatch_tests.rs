//! Integration tests for rule dispatch
//!
//! Spy handlers append their label to a shared log, so each test can assert
//! exactly which handlers ran and in which order.

mod common;

use assetgate::catalog::{RuleCatalog, ScopeRef};
use assetgate::engine::{AssetEvent, DispatchEngine, DispatchOutcome};
use assetgate::error::HandlerError;
use assetgate::index::ScopeIndex;
use assetgate::rules::{
    AssetContext, Checker, Handler, HandlerKind, HandlerRegistry, ImportSettings, Processor,
    RuleSpec,
};
use assetgate::types::{AssetType, PipelineStage, RuleId, ScopePath};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

struct SpyCheck {
    label: String,
    pass: bool,
    error: bool,
    log: Log,
}

impl Checker for SpyCheck {
    fn check(&self, _ctx: &AssetContext) -> Result<bool, HandlerError> {
        self.log.lock().unwrap().push(self.label.clone());
        if self.error {
            return Err(HandlerError::Failed(format!("{} exploded", self.label)));
        }
        Ok(self.pass)
    }
}

struct SpyProcess {
    label: String,
    error: bool,
    log: Log,
}

impl Processor for SpyProcess {
    fn process(
        &self,
        _ctx: &AssetContext,
        settings: Option<&mut ImportSettings>,
    ) -> Result<(), HandlerError> {
        self.log.lock().unwrap().push(self.label.clone());
        if self.error {
            return Err(HandlerError::Failed(format!("{} exploded", self.label)));
        }
        if let Some(settings) = settings {
            settings.set(self.label.clone(), toml::Value::Boolean(true));
        }
        Ok(())
    }
}

fn label(id: &RuleId, params: &toml::Table) -> String {
    params
        .get("label")
        .and_then(|v| v.as_str())
        .unwrap_or(id.as_str())
        .to_string()
}

fn flag(params: &toml::Table, key: &str) -> bool {
    params.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

/// Built-in handlers plus spy checkers `spy.check-a..c` and processors `spy.process-a..c`
fn spy_registry(log: &Log) -> HandlerRegistry {
    let mut registry = HandlerRegistry::with_builtins();
    for suffix in ["a", "b", "c"] {
        let check_log = Arc::clone(log);
        registry
            .register(
                RuleId::new(format!("spy.check-{}", suffix)).unwrap(),
                HandlerKind::Checker,
                "spy checker",
                move |id, params| {
                    Ok(Handler::Checker(Box::new(SpyCheck {
                        label: label(id, params),
                        pass: !flag(params, "fail"),
                        error: flag(params, "error"),
                        log: Arc::clone(&check_log),
                    })))
                },
            )
            .unwrap();

        let process_log = Arc::clone(log);
        registry
            .register(
                RuleId::new(format!("spy.process-{}", suffix)).unwrap(),
                HandlerKind::Processor,
                "spy processor",
                move |id, params| {
                    Ok(Handler::Processor(Box::new(SpyProcess {
                        label: label(id, params),
                        error: flag(params, "error"),
                        log: Arc::clone(&process_log),
                    })))
                },
            )
            .unwrap();
    }
    registry
}

fn spec(id: &str, stage: PipelineStage, label: &str) -> RuleSpec {
    RuleSpec::new(RuleId::new(id).unwrap(), stage).with_param("label", label)
}

fn local(path: &str) -> ScopeRef {
    ScopeRef::Local(ScopePath::new(path))
}

fn engine(catalog: &RuleCatalog, registry: &HandlerRegistry) -> DispatchEngine {
    let (index, errors) = ScopeIndex::from_catalog(catalog, registry);
    assert!(errors.is_empty(), "unexpected resolution errors: {:?}", errors);
    DispatchEngine::new(index)
}

fn taken(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.lock().unwrap())
}

const PRE: PipelineStage = PipelineStage::CommonPreprocess;

#[test]
fn test_global_failure_prevents_local_rules() {
    let log = Log::default();
    let registry = spy_registry(&log);

    let mut catalog = RuleCatalog::new();
    catalog
        .add_rule(
            &ScopeRef::Global,
            spec("spy.check-a", PRE, "global-check").with_param("fail", true),
        )
        .unwrap();
    catalog.add_scope(ScopePath::new("Assets")).unwrap();
    catalog
        .add_rule(&local("Assets"), spec("spy.check-b", PRE, "local-check"))
        .unwrap();
    catalog
        .add_rule(&local("Assets"), spec("spy.process-a", PRE, "local-process"))
        .unwrap();

    let engine = engine(&catalog, &registry);
    let outcome = engine.dispatch(&mut AssetEvent::new("Assets/hero.png", PRE));

    assert!(outcome.is_blocked());
    assert_eq!(taken(&log), vec!["global-check"]);
}

#[test]
fn test_failing_local_check_blocks_stage() {
    let log = Log::default();
    let registry = spy_registry(&log);

    let mut catalog = RuleCatalog::new();
    catalog
        .add_rule(&ScopeRef::Global, spec("spy.process-a", PRE, "global-process"))
        .unwrap();
    catalog.add_scope(ScopePath::new("Assets")).unwrap();
    catalog
        .add_rule(
            &local("Assets"),
            spec("spy.check-a", PRE, "local-check").with_param("fail", true),
        )
        .unwrap();

    let engine = engine(&catalog, &registry);

    assert!(!engine.run_check_stage("Assets/hero.png", AssetType::TEXTURE, PRE));
    assert_eq!(taken(&log), vec!["local-check"]);

    let outcome = engine.dispatch(&mut AssetEvent::new("Assets/hero.png", PRE));
    let DispatchOutcome::Blocked { check, .. } = outcome else {
        panic!("expected blocked outcome");
    };
    let failure = assert_some!(check.blocked_by);
    assert_eq!(failure.location, "local/Assets/spy.check-a");
    assert_eq!(failure.error, None);
    // processors never ran
    assert_eq!(taken(&log), vec!["local-check"]);
}

#[test]
fn test_checker_error_blocks_stage() {
    let log = Log::default();
    let registry = spy_registry(&log);

    let mut catalog = RuleCatalog::new();
    catalog
        .add_rule(
            &ScopeRef::Global,
            spec("spy.check-a", PRE, "first").with_param("error", true),
        )
        .unwrap();
    catalog
        .add_rule(
            &ScopeRef::Global,
            spec("spy.check-b", PRE, "second").with_order(1),
        )
        .unwrap();

    let engine = engine(&catalog, &registry);
    let outcome = engine.dispatch(&mut AssetEvent::new("Assets/a.png", PRE));

    let DispatchOutcome::Blocked { check, .. } = outcome else {
        panic!("expected blocked outcome");
    };
    let failure = assert_some!(check.blocked_by);
    assert_eq!(failure.error.as_deref(), Some("first exploded"));
    assert_eq!(taken(&log), vec!["first"]);
}

#[test]
fn test_blacklisted_path_never_invokes_rule() {
    let log = Log::default();
    let registry = spy_registry(&log);

    let mut catalog = RuleCatalog::new();
    catalog.add_scope(ScopePath::new("Assets")).unwrap();
    catalog
        .add_rule(&local("Assets"), spec("spy.check-a", PRE, "check"))
        .unwrap();
    catalog
        .add_rule(&local("Assets"), spec("spy.process-a", PRE, "process"))
        .unwrap();
    let check = catalog
        .position(&local("Assets"), &RuleId::new("spy.check-a").unwrap(), None)
        .unwrap();
    catalog
        .add_blacklist_path(&local("Assets"), check, ScopePath::new("Assets/Raw"))
        .unwrap();

    let engine = engine(&catalog, &registry);

    let outcome = engine.dispatch(&mut AssetEvent::new("Assets/Raw/scan.png", PRE));
    assert!(!outcome.is_blocked());
    assert_eq!(taken(&log), vec!["process"]);

    engine.dispatch(&mut AssetEvent::new("Assets/Cooked/scan.png", PRE));
    assert_eq!(taken(&log), vec!["check", "process"]);
}

#[test]
fn test_execution_order_global_then_outer_to_inner() {
    let log = Log::default();
    let registry = spy_registry(&log);

    let mut catalog = RuleCatalog::new();
    catalog
        .add_rule(
            &ScopeRef::Global,
            spec("spy.process-b", PRE, "global-late").with_order(10),
        )
        .unwrap();
    catalog
        .add_rule(
            &ScopeRef::Global,
            spec("spy.process-a", PRE, "global-early").with_order(-1),
        )
        .unwrap();
    // insertion order differs from path order
    for dir in ["A/B/C", "A", "A/B"] {
        catalog.add_scope(ScopePath::new(dir)).unwrap();
        catalog
            .add_rule(&local(dir), spec("spy.process-c", PRE, dir))
            .unwrap();
    }

    let engine = engine(&catalog, &registry);
    let outcome = engine.dispatch(&mut AssetEvent::new("A/B/C/x.png", PRE));

    let DispatchOutcome::Completed { process, .. } = outcome else {
        panic!("expected completed outcome");
    };
    assert_eq!(process.processors_run, 5);
    assert_eq!(
        taken(&log),
        vec!["global-early", "global-late", "A", "A/B", "A/B/C"]
    );
}

#[test]
fn test_local_scopes_for_returns_outermost_first() {
    let log = Log::default();
    let registry = spy_registry(&log);

    let mut catalog = RuleCatalog::new();
    for dir in ["A/B", "A/B/C", "Other", "A"] {
        catalog.add_scope(ScopePath::new(dir)).unwrap();
    }
    let (index, _) = ScopeIndex::from_catalog(&catalog, &registry);

    let paths: Vec<&str> = index
        .local_scopes_for("A/B/C/x.png")
        .iter()
        .map(|scope| scope.path().as_str())
        .collect();
    assert_eq!(paths, vec!["A", "A/B", "A/B/C"]);
}

#[test]
fn test_rules_only_run_for_matching_type_and_stage() {
    let log = Log::default();
    let registry = spy_registry(&log);

    let mut catalog = RuleCatalog::new();
    catalog
        .add_rule(
            &ScopeRef::Global,
            spec("spy.process-a", PRE, "textures").with_types(AssetType::TEXTURE),
        )
        .unwrap();
    catalog
        .add_rule(
            &ScopeRef::Global,
            spec("spy.process-b", PipelineStage::Delete, "deletes"),
        )
        .unwrap();

    let engine = engine(&catalog, &registry);

    engine.dispatch(&mut AssetEvent::new("Assets/theme.ogg", PRE));
    assert!(taken(&log).is_empty());

    engine.dispatch(&mut AssetEvent::new("Assets/hero.png", PRE));
    assert_eq!(taken(&log), vec!["textures"]);

    engine.dispatch(&mut AssetEvent::new("Assets/theme.ogg", PipelineStage::Delete));
    assert_eq!(taken(&log), vec!["deletes"]);
}

#[test]
fn test_processor_failure_does_not_stop_later_processors() {
    let log = Log::default();
    let registry = spy_registry(&log);

    let mut catalog = RuleCatalog::new();
    catalog
        .add_rule(
            &ScopeRef::Global,
            spec("spy.process-a", PRE, "broken").with_param("error", true),
        )
        .unwrap();
    catalog
        .add_rule(&ScopeRef::Global, spec("spy.process-b", PRE, "healthy"))
        .unwrap();

    let engine = engine(&catalog, &registry);
    let mut event = AssetEvent::new("Assets/a.png", PRE).with_settings(ImportSettings::new());
    let outcome = engine.dispatch(&mut event);

    let DispatchOutcome::Completed { process, .. } = outcome else {
        panic!("expected completed outcome");
    };
    assert_eq!(process.processors_run, 2);
    assert_eq!(process.failures.len(), 1);
    assert_eq!(process.failures[0].location, "global/common-preprocess/spy.process-a");
    assert_eq!(taken(&log), vec!["broken", "healthy"]);

    let settings = assert_some!(event.settings);
    assert_eq!(settings.get("healthy"), Some(&toml::Value::Boolean(true)));
}

#[test]
fn test_oversized_file_blocks_check_stage() {
    let log = Log::default();
    let registry = spy_registry(&log);
    let temp = tempfile::TempDir::new().unwrap();

    let art = temp.path().join("Art");
    std::fs::create_dir_all(&art).unwrap();
    let big = std::fs::File::create(art.join("big.png")).unwrap();
    big.set_len(10 * 1024 * 1024).unwrap();

    let mut catalog = RuleCatalog::new();
    catalog
        .add_rule(
            &ScopeRef::Global,
            RuleSpec::new(RuleId::new("check.file-size").unwrap(), PRE)
                .with_param("max_bytes", 8 * 1024 * 1024),
        )
        .unwrap();
    catalog
        .add_rule(
            &ScopeRef::Global,
            spec("spy.check-a", PRE, "later").with_order(5),
        )
        .unwrap();

    let engine = engine(&catalog, &registry).with_project_root(temp.path());

    assert!(!engine.run_check_stage("Art/big.png", AssetType::TEXTURE, PRE));
    assert!(taken(&log).is_empty());

    let small = std::fs::File::create(art.join("small.png")).unwrap();
    small.set_len(1024).unwrap();
    assert!(engine.run_check_stage("Art/small.png", AssetType::TEXTURE, PRE));
    assert_eq!(taken(&log), vec!["later"]);
}

#[test]
fn test_rebuild_replaces_rules() {
    let log = Log::default();
    let registry = spy_registry(&log);

    let mut catalog = RuleCatalog::new();
    catalog
        .add_rule(&ScopeRef::Global, spec("spy.process-a", PRE, "before"))
        .unwrap();
    let mut engine = engine(&catalog, &registry);

    engine.dispatch(&mut AssetEvent::new("Assets/a.png", PRE));
    assert_eq!(taken(&log), vec!["before"]);

    catalog.remove_rule(&ScopeRef::Global, 0).unwrap();
    catalog
        .add_rule(&ScopeRef::Global, spec("spy.process-b", PRE, "after"))
        .unwrap();
    let (index, errors) = ScopeIndex::from_catalog(&catalog, &registry);
    assert!(errors.is_empty());
    engine.rebuild(index);

    engine.dispatch(&mut AssetEvent::new("Assets/a.png", PRE));
    assert_eq!(taken(&log), vec!["after"]);
}

#[test]
fn test_batch_counts_outcomes() {
    let log = Log::default();
    let registry = spy_registry(&log);

    let mut catalog = RuleCatalog::new();
    catalog
        .add_rule(
            &ScopeRef::Global,
            spec("spy.check-a", PRE, "audio-gate")
                .with_types(AssetType::AUDIO)
                .with_param("fail", true),
        )
        .unwrap();
    let engine = engine(&catalog, &registry);

    let mut batch = engine.begin_batch();
    batch.dispatch(&mut AssetEvent::new("Assets/a.png", PRE));
    batch.dispatch(&mut AssetEvent::new("Assets/b.wav", PRE));
    batch.dispatch(&mut AssetEvent::new("Assets/c.ogg", PRE));
    let report = batch.end();

    assert_eq!(report.events, 3);
    assert_eq!(report.blocked, 2);
    assert_eq!(report.completed, 1);
    assert_eq!(report.filtered, 0);
}

#[test]
fn test_type_masks_reach_both_tiers() {
    let log = Log::default();
    let registry = spy_registry(&log);

    let mut catalog = RuleCatalog::new();
    catalog
        .add_rule(&ScopeRef::Global, spec("spy.check-a", PRE, "global-check"))
        .unwrap();
    catalog
        .add_rule(&ScopeRef::Global, spec("spy.process-a", PRE, "global-process"))
        .unwrap();
    catalog.add_scope(ScopePath::new("Assets")).unwrap();
    catalog
        .add_rule(&local("Assets"), spec("spy.check-b", PRE, "local-check"))
        .unwrap();
    catalog
        .add_rule(&local("Assets"), spec("spy.process-b", PRE, "local-process"))
        .unwrap();
    let engine = engine(&catalog, &registry);

    for mask in [
        AssetType::TEXTURE,
        AssetType::ALL,
        AssetType::TEXTURE | AssetType::AUDIO,
        AssetType::NONE,
    ] {
        let mut event = AssetEvent::new("Assets/hero.png", PRE).with_type(mask);
        let outcome = engine.dispatch(&mut event);

        assert!(
            matches!(outcome, DispatchOutcome::Completed { asset_type, .. } if asset_type == AssetType::TEXTURE),
            "mask {}",
            mask
        );
        assert_eq!(
            taken(&log),
            vec!["global-check", "local-check", "global-process", "local-process"],
            "mask {}",
            mask
        );
    }

    assert!(engine.run_check_stage("Assets/hero.png", AssetType::ALL, PRE));
    assert_eq!(taken(&log), vec!["global-check", "local-check"]);

    let report = engine.run_process_stage(
        "Assets/hero.png",
        AssetType::TEXTURE | AssetType::MESH,
        PRE,
        None,
    );
    assert_eq!(report.processors_run, 2);
    assert_eq!(taken(&log), vec!["global-process", "local-process"]);
}

#[test]
fn test_type_mask_still_blocked_by_global_check() {
    let log = Log::default();
    let registry = spy_registry(&log);

    let mut catalog = RuleCatalog::new();
    catalog
        .add_rule(
            &ScopeRef::Global,
            spec("spy.check-a", PRE, "global-gate").with_param("fail", true),
        )
        .unwrap();
    catalog.add_scope(ScopePath::new("Assets")).unwrap();
    catalog
        .add_rule(&local("Assets"), spec("spy.check-b", PRE, "local-check"))
        .unwrap();
    let engine = engine(&catalog, &registry);

    let mut event = AssetEvent::new("Assets/hero.png", PRE).with_type(AssetType::ALL);
    assert!(engine.dispatch(&mut event).is_blocked());
    assert_eq!(taken(&log), vec!["global-gate"]);

    assert!(!engine.run_check_stage("Assets/hero.png", AssetType::TEXTURE | AssetType::AUDIO, PRE));
    assert_eq!(taken(&log), vec!["global-gate"]);
}
