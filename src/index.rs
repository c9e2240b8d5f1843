#![forbid(unsafe_code)]

//! Read-only lookup structures built from a catalog and its live handlers
//!
//! The index is rebuilt wholesale whenever rules, scopes or blacklists
//! change. Dispatch only ever reads it.

use crate::catalog::{RuleCatalog, ScopeRef};
use crate::error::{ResolutionError, RuleError};
use crate::rules::{Handler, HandlerKind, HandlerRegistry, RuleSpec};
use crate::types::{AssetType, PipelineStage, RuleId, ScopePath};
use std::collections::HashMap;
use std::sync::Arc;

/// Backing location of a rule instance
///
/// Unique across a valid catalog: `global/<stage>/<id>` or `local/<dir>/<id>`.
pub fn rule_location(scope: &ScopeRef, rule: &RuleSpec) -> String {
    match scope {
        ScopeRef::Global => format!("global/{}/{}", rule.stage, rule.id),
        ScopeRef::Local(path) => format!("local/{}/{}", path, rule.id),
    }
}

/// Every rule instance of a catalog with its scope and location, global tier first
pub fn catalog_entries(catalog: &RuleCatalog) -> Vec<(ScopeRef, String, &RuleSpec)> {
    let mut entries = Vec::with_capacity(catalog.rule_count());
    for rule in catalog.global().rules() {
        entries.push((ScopeRef::Global, rule_location(&ScopeRef::Global, rule), rule));
    }
    for scope in catalog.scopes() {
        let scope_ref = ScopeRef::Local(scope.path().clone());
        for rule in scope.rules() {
            entries.push((scope_ref.clone(), rule_location(&scope_ref, rule), rule));
        }
    }
    entries
}

/// Live handler instances keyed by rule location
#[derive(Debug, Default)]
pub struct HandlerSet {
    handlers: HashMap<String, Arc<Handler>>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a handler for every rule of the catalog
    ///
    /// Rules that cannot be built are skipped and reported; the rest resolve.
    pub fn instantiate(
        catalog: &RuleCatalog,
        registry: &HandlerRegistry,
    ) -> (Self, Vec<ResolutionError>) {
        let mut set = Self::new();
        let mut errors = Vec::new();

        for (_, location, rule) in catalog_entries(catalog) {
            match resolve_handler(registry, rule, &location) {
                Ok(handler) => set.insert(location, handler),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unresolvable rule");
                    errors.push(e);
                }
            }
        }

        (set, errors)
    }

    pub fn insert(&mut self, location: String, handler: Handler) {
        self.handlers.insert(location, Arc::new(handler));
    }

    pub fn get(&self, location: &str) -> Option<&Arc<Handler>> {
        self.handlers.get(location)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Builds one handler, translating construction failures into resolution errors
pub fn resolve_handler(
    registry: &HandlerRegistry,
    rule: &RuleSpec,
    location: &str,
) -> Result<Handler, ResolutionError> {
    registry.construct(rule).map_err(|e| match e {
        RuleError::UnknownType(id) => ResolutionError::UnknownRuleType {
            id,
            location: location.to_string(),
        },
        other => ResolutionError::InvalidParams {
            id: rule.id.to_string(),
            location: location.to_string(),
            message: other.to_string(),
        },
    })
}

/// A rule paired with its live handler
#[derive(Debug)]
pub struct ResolvedRule {
    pub location: String,
    pub spec: RuleSpec,
    pub handler: Arc<Handler>,
}

impl ResolvedRule {
    pub fn id(&self) -> &RuleId {
        &self.spec.id
    }

    pub fn kind(&self) -> HandlerKind {
        self.handler.kind()
    }
}

/// A local scope with resolved rules
#[derive(Debug)]
pub struct ResolvedScope {
    path: ScopePath,
    rules: Vec<Arc<ResolvedRule>>,
}

impl ResolvedScope {
    pub fn path(&self) -> &ScopePath {
        &self.path
    }

    /// All resolved rules of the scope, in sort-key order
    pub fn rules(&self) -> &[Arc<ResolvedRule>] {
        &self.rules
    }

    /// Rules valid for the stage and asset type, in sort-key order
    pub fn rules_for(
        &self,
        stage: PipelineStage,
        asset_type: AssetType,
    ) -> impl Iterator<Item = &Arc<ResolvedRule>> {
        self.rules
            .iter()
            .filter(move |r| r.spec.applies_to(stage, asset_type))
    }
}

/// Two-tier lookup of rules for dispatch
#[derive(Debug, Default)]
pub struct ScopeIndex {
    /// (stage, concrete type) → global rules in sort-key order
    global: HashMap<(PipelineStage, AssetType), Vec<Arc<ResolvedRule>>>,
    /// Sorted by ascending path length, then path
    scopes: Vec<ResolvedScope>,
    rule_count: usize,
}

impl ScopeIndex {
    /// Builds the index from a catalog and the handlers resolved for it
    ///
    /// Rules without a handler in `handlers` are left out.
    pub fn build(catalog: &RuleCatalog, handlers: &HandlerSet) -> Self {
        let mut rule_count = 0;
        let mut resolve = |scope: &ScopeRef, spec: &RuleSpec| -> Option<Arc<ResolvedRule>> {
            let location = rule_location(scope, spec);
            let Some(handler) = handlers.get(&location) else {
                tracing::debug!(location, "no handler resolved, leaving rule out of the index");
                return None;
            };
            rule_count += 1;
            Some(Arc::new(ResolvedRule {
                location,
                spec: spec.clone(),
                handler: Arc::clone(handler),
            }))
        };

        let global_rules: Vec<Arc<ResolvedRule>> = catalog
            .global()
            .rules()
            .iter()
            .filter_map(|spec| resolve(&ScopeRef::Global, spec))
            .collect();

        let mut scopes: Vec<ResolvedScope> = catalog
            .scopes()
            .iter()
            .map(|scope| {
                let scope_ref = ScopeRef::Local(scope.path().clone());
                ResolvedScope {
                    path: scope.path().clone(),
                    rules: scope
                        .rules()
                        .iter()
                        .filter_map(|spec| resolve(&scope_ref, spec))
                        .collect(),
                }
            })
            .collect();
        scopes.sort_by(|a, b| {
            a.path
                .len()
                .cmp(&b.path.len())
                .then_with(|| a.path.cmp(&b.path))
        });

        let mut global = HashMap::new();
        for stage in PipelineStage::all() {
            for asset_type in AssetType::concrete_types() {
                let matching: Vec<Arc<ResolvedRule>> = global_rules
                    .iter()
                    .filter(|r| r.spec.applies_to(stage, asset_type))
                    .cloned()
                    .collect();
                if !matching.is_empty() {
                    global.insert((stage, asset_type), matching);
                }
            }
        }

        Self {
            global,
            scopes,
            rule_count,
        }
    }

    /// Resolves handlers from a registry and builds the index in one step
    pub fn from_catalog(
        catalog: &RuleCatalog,
        registry: &HandlerRegistry,
    ) -> (Self, Vec<ResolutionError>) {
        let (handlers, errors) = HandlerSet::instantiate(catalog, registry);
        (Self::build(catalog, &handlers), errors)
    }

    /// Global rules for a stage and concrete asset type, in sort-key order
    ///
    /// Masks with more or less than one bit never name a concrete asset and
    /// yield no rules.
    pub fn global_rules_for(
        &self,
        stage: PipelineStage,
        asset_type: AssetType,
    ) -> &[Arc<ResolvedRule>] {
        self.global
            .get(&(stage, asset_type))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Local scopes whose directory is a prefix of `path`, outermost first
    pub fn local_scopes_for(&self, path: &str) -> Vec<&ResolvedScope> {
        self.scopes
            .iter()
            .filter(|scope| scope.path.is_prefix_of(path))
            .collect()
    }

    /// All local scopes, outermost first
    pub fn scopes(&self) -> &[ResolvedScope] {
        &self.scopes
    }

    /// Number of rules that made it into the index
    pub fn rule_count(&self) -> usize {
        self.rule_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSpec;

    fn rule(id: &str, stage: PipelineStage, order: i32) -> RuleSpec {
        RuleSpec::new(RuleId::new(id).unwrap(), stage).with_order(order)
    }

    fn local(path: &str) -> ScopeRef {
        ScopeRef::Local(ScopePath::new(path))
    }

    fn ids(rules: &[Arc<ResolvedRule>]) -> Vec<&str> {
        rules.iter().map(|r| r.id().as_str()).collect()
    }

    #[test]
    fn test_rule_location() {
        let spec = rule("check.file-size", PipelineStage::Move, 0);
        assert_eq!(
            rule_location(&ScopeRef::Global, &spec),
            "global/move/check.file-size"
        );
        assert_eq!(
            rule_location(&local("Assets/Art"), &spec),
            "local/Assets/Art/check.file-size"
        );
    }

    #[test]
    fn test_global_rules_filtered_and_ordered() {
        let mut catalog = RuleCatalog::new();
        catalog
            .add_rule(
                &ScopeRef::Global,
                rule("check.deny-extension", PipelineStage::CommonPreprocess, 5),
            )
            .unwrap();
        catalog
            .add_rule(
                &ScopeRef::Global,
                rule("check.file-size", PipelineStage::CommonPreprocess, 1)
                    .with_types(AssetType::TEXTURE),
            )
            .unwrap();
        catalog
            .add_rule(&ScopeRef::Global, rule("process.notify", PipelineStage::Move, 0))
            .unwrap();

        let (index, errors) = ScopeIndex::from_catalog(&catalog, &HandlerRegistry::with_builtins());
        assert!(errors.is_empty());
        assert_eq!(index.rule_count(), 3);

        assert_eq!(
            ids(index.global_rules_for(PipelineStage::CommonPreprocess, AssetType::TEXTURE)),
            vec!["check.file-size", "check.deny-extension"]
        );
        assert_eq!(
            ids(index.global_rules_for(PipelineStage::CommonPreprocess, AssetType::AUDIO)),
            vec!["check.deny-extension"]
        );
        assert_eq!(
            ids(index.global_rules_for(PipelineStage::Move, AssetType::FOLDER)),
            vec!["process.notify"]
        );
        assert!(
            index
                .global_rules_for(PipelineStage::Delete, AssetType::TEXTURE)
                .is_empty()
        );
        assert!(
            index
                .global_rules_for(PipelineStage::CommonPreprocess, AssetType::ALL)
                .is_empty()
        );
    }

    #[test]
    fn test_local_scopes_outer_to_inner() {
        let mut catalog = RuleCatalog::new();
        // Inserted inner-first to show ordering does not depend on insertion
        for path in ["A/B/C", "A", "A/B", "Other"] {
            catalog.add_scope(ScopePath::new(path)).unwrap();
        }
        let (index, _) = ScopeIndex::from_catalog(&catalog, &HandlerRegistry::new());

        let paths: Vec<&str> = index
            .local_scopes_for("A/B/C/x.png")
            .iter()
            .map(|s| s.path().as_str())
            .collect();
        assert_eq!(paths, vec!["A", "A/B", "A/B/C"]);

        let paths: Vec<&str> = index
            .local_scopes_for("A/B/y.png")
            .iter()
            .map(|s| s.path().as_str())
            .collect();
        assert_eq!(paths, vec!["A", "A/B"]);

        assert!(index.local_scopes_for("Z/z.png").is_empty());
    }

    #[test]
    fn test_unknown_rules_left_out() {
        let mut catalog = RuleCatalog::new();
        catalog
            .add_rule(&ScopeRef::Global, rule("check.missing", PipelineStage::Move, 0))
            .unwrap();
        catalog
            .add_rule(&ScopeRef::Global, rule("process.notify", PipelineStage::Move, 1))
            .unwrap();

        let (index, errors) = ScopeIndex::from_catalog(&catalog, &HandlerRegistry::with_builtins());
        assert_eq!(
            errors,
            vec![ResolutionError::UnknownRuleType {
                id: "check.missing".to_string(),
                location: "global/move/check.missing".to_string(),
            }]
        );
        assert_eq!(
            ids(index.global_rules_for(PipelineStage::Move, AssetType::TEXTURE)),
            vec!["process.notify"]
        );
    }

    #[test]
    fn test_invalid_params_reported() {
        let mut catalog = RuleCatalog::new();
        catalog
            .add_rule(
                &ScopeRef::Global,
                rule("check.name-pattern", PipelineStage::Move, 0).with_param("pattern", "("),
            )
            .unwrap();
        let (index, errors) = ScopeIndex::from_catalog(&catalog, &HandlerRegistry::with_builtins());
        assert_eq!(index.rule_count(), 0);
        assert!(matches!(errors[0], ResolutionError::InvalidParams { .. }));
    }

    #[test]
    fn test_scope_rules_for() {
        let mut catalog = RuleCatalog::new();
        catalog.add_scope(ScopePath::new("Assets")).unwrap();
        catalog
            .add_rule(
                &local("Assets"),
                rule("check.file-size", PipelineStage::CommonPreprocess, 0)
                    .with_types(AssetType::AUDIO),
            )
            .unwrap();
        catalog
            .add_rule(&local("Assets"), rule("process.notify", PipelineStage::Move, 0))
            .unwrap();

        let (index, _) = ScopeIndex::from_catalog(&catalog, &HandlerRegistry::with_builtins());
        let scope = &index.scopes()[0];
        assert_eq!(scope.rules().len(), 2);
        assert_eq!(
            scope
                .rules_for(PipelineStage::CommonPreprocess, AssetType::AUDIO)
                .count(),
            1
        );
        assert_eq!(
            scope
                .rules_for(PipelineStage::CommonPreprocess, AssetType::TEXTURE)
                .count(),
            0
        );
    }
}
