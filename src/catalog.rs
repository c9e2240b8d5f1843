#![forbid(unsafe_code)]

//! Authored rule catalog: the global tier and directory-scoped local tiers
//!
//! Every rule list is kept sorted by [`RuleSpec::sort_key`]. Mutations
//! validate uniqueness before touching state, so a rejected call leaves the
//! catalog unchanged.

use crate::error::ConfigError;
use crate::rules::{HandlerRegistry, RuleSpec};
use crate::types::{PipelineStage, RuleId, ScopePath};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Identifies one scope of the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeRef {
    /// The project-wide tier
    Global,
    /// A directory-attached tier
    Local(ScopePath),
}

impl fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeRef::Global => write!(f, "global"),
            ScopeRef::Local(path) => write!(f, "{}", path),
        }
    }
}

impl FromStr for ScopeRef {
    type Err = String;

    /// Exactly `global` names the global tier; anything else is a directory
    ///
    /// A directory literally named `global` is written `global/`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "global" {
            return Ok(ScopeRef::Global);
        }
        let path = ScopePath::new(s);
        if path.is_empty() {
            return Err("Scope directory must not be empty".to_string());
        }
        Ok(ScopeRef::Local(path))
    }
}

/// How identity uniqueness is enforced within a rule set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Uniqueness {
    /// One rule per (stage, identity); used by the global tier
    PerStage,
    /// One rule per identity across the whole scope
    PerScope,
}

/// An ordered list of rules for one scope
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    rules: Vec<RuleSpec>,
    uniqueness: Uniqueness,
}

impl RuleSet {
    fn new(uniqueness: Uniqueness) -> Self {
        Self {
            rules: Vec::new(),
            uniqueness,
        }
    }

    /// Rules in sort-key order
    pub fn rules(&self) -> &[RuleSpec] {
        &self.rules
    }

    pub fn get(&self, index: usize) -> Option<&RuleSpec> {
        self.rules.get(index)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Position of the rule with this identity (and stage, for the global tier)
    pub fn position(&self, id: &RuleId, stage: Option<PipelineStage>) -> Option<usize> {
        self.rules
            .iter()
            .position(|r| &r.id == id && stage.is_none_or(|s| r.stage == s))
    }

    fn conflicts(&self, rule: &RuleSpec) -> bool {
        self.rules.iter().any(|existing| {
            existing.id == rule.id
                && (self.uniqueness == Uniqueness::PerScope || existing.stage == rule.stage)
        })
    }

    fn insert(&mut self, rule: RuleSpec, scope: &ScopeRef) -> Result<(), ConfigError> {
        if self.conflicts(&rule) {
            return Err(ConfigError::DuplicateRuleKind {
                id: rule.id.to_string(),
                scope: scope.to_string(),
            });
        }
        self.rules.push(rule);
        self.rules.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Ok(())
    }

    fn remove(&mut self, index: usize) -> Result<RuleSpec, ConfigError> {
        if index >= self.rules.len() {
            return Err(ConfigError::IndexOutOfRange {
                index,
                len: self.rules.len(),
            });
        }
        Ok(self.rules.remove(index))
    }

    fn rule_mut(&mut self, index: usize) -> Result<&mut RuleSpec, ConfigError> {
        let len = self.rules.len();
        self.rules
            .get_mut(index)
            .ok_or(ConfigError::IndexOutOfRange { index, len })
    }
}

/// Project-wide rules, evaluated before any local scope
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalRuleSet {
    rules: RuleSet,
}

impl GlobalRuleSet {
    pub fn new() -> Self {
        Self {
            rules: RuleSet::new(Uniqueness::PerStage),
        }
    }

    pub fn rules(&self) -> &[RuleSpec] {
        self.rules.rules()
    }

    /// Rules of one stage, in sort-key order
    pub fn rules_for_stage(&self, stage: PipelineStage) -> impl Iterator<Item = &RuleSpec> {
        self.rules.rules().iter().filter(move |r| r.stage == stage)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for GlobalRuleSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Rules attached to one directory
#[derive(Debug, Clone, PartialEq)]
pub struct LocalScope {
    path: ScopePath,
    rules: RuleSet,
}

impl LocalScope {
    pub fn new(path: ScopePath) -> Self {
        Self {
            path,
            rules: RuleSet::new(Uniqueness::PerScope),
        }
    }

    pub fn path(&self) -> &ScopePath {
        &self.path
    }

    pub fn rules(&self) -> &[RuleSpec] {
        self.rules.rules()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// The complete authored configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleCatalog {
    global: GlobalRuleSet,
    /// Sorted by directory path
    scopes: Vec<LocalScope>,
}

impl RuleCatalog {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from raw lists, validating every invariant
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` any insertion raises.
    pub fn from_parts(
        global: Vec<RuleSpec>,
        scopes: Vec<(ScopePath, Vec<RuleSpec>)>,
    ) -> Result<Self, ConfigError> {
        let mut catalog = Self::new();
        for rule in global {
            catalog.add_rule(&ScopeRef::Global, rule)?;
        }
        for (path, rules) in scopes {
            catalog.add_scope(path.clone())?;
            let scope = ScopeRef::Local(path);
            for rule in rules {
                catalog.add_rule(&scope, rule)?;
            }
        }
        Ok(catalog)
    }

    pub fn global(&self) -> &GlobalRuleSet {
        &self.global
    }

    /// Local scopes, sorted by directory path
    pub fn scopes(&self) -> &[LocalScope] {
        &self.scopes
    }

    pub fn scope(&self, path: &ScopePath) -> Option<&LocalScope> {
        self.scopes.iter().find(|s| &s.path == path)
    }

    /// Rules of a scope, in sort-key order
    pub fn rules(&self, scope: &ScopeRef) -> Result<&[RuleSpec], ConfigError> {
        match scope {
            ScopeRef::Global => Ok(self.global.rules()),
            ScopeRef::Local(path) => self
                .scope(path)
                .map(LocalScope::rules)
                .ok_or_else(|| ConfigError::ScopeNotFound(path.to_string())),
        }
    }

    /// Total number of rules across all scopes
    pub fn rule_count(&self) -> usize {
        self.global.len() + self.scopes.iter().map(LocalScope::len).sum::<usize>()
    }

    /// Registers a new local scope for a directory
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateScope` if the directory already has a scope.
    pub fn add_scope(&mut self, path: ScopePath) -> Result<(), ConfigError> {
        if path.is_empty() {
            return Err(ConfigError::Validation(
                "Scope directory must not be empty".to_string(),
            ));
        }
        match self.scopes.binary_search_by(|s| s.path.cmp(&path)) {
            Ok(_) => Err(ConfigError::DuplicateScope(path.to_string())),
            Err(pos) => {
                self.scopes.insert(pos, LocalScope::new(path));
                Ok(())
            }
        }
    }

    /// Removes a local scope and every rule attached to it
    pub fn remove_scope(&mut self, path: &ScopePath) -> Result<LocalScope, ConfigError> {
        let pos = self
            .scopes
            .iter()
            .position(|s| &s.path == path)
            .ok_or_else(|| ConfigError::ScopeNotFound(path.to_string()))?;
        Ok(self.scopes.remove(pos))
    }

    /// Adds a rule to a scope and re-sorts the scope's list
    ///
    /// # Errors
    ///
    /// - `ConfigError::DuplicateRuleKind` if the scope already holds the identity
    ///   (for the global tier: the identity within the same stage)
    /// - `ConfigError::ScopeNotFound` if the local scope does not exist
    pub fn add_rule(&mut self, scope: &ScopeRef, rule: RuleSpec) -> Result<(), ConfigError> {
        self.rule_set_mut(scope)?.insert(rule, scope)
    }

    /// Adds a rule after confirming the registry can build its handler
    ///
    /// # Errors
    ///
    /// - `ConfigError::NullRule` if no handler type is registered for the identity
    /// - `ConfigError::InvalidParams` if the params do not fit the handler
    /// - any error of [`RuleCatalog::add_rule`]
    pub fn add_rule_checked(
        &mut self,
        scope: &ScopeRef,
        rule: RuleSpec,
        registry: &HandlerRegistry,
    ) -> Result<(), ConfigError> {
        if !registry.contains(&rule.id) {
            return Err(ConfigError::NullRule(rule.id.to_string()));
        }
        registry
            .construct(&rule)
            .map_err(|e| ConfigError::InvalidParams {
                id: rule.id.to_string(),
                message: e.to_string(),
            })?;
        self.add_rule(scope, rule)
    }

    /// Removes the rule at `index` of the scope's sorted list
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::IndexOutOfRange` if the index is invalid.
    pub fn remove_rule(&mut self, scope: &ScopeRef, index: usize) -> Result<RuleSpec, ConfigError> {
        self.rule_set_mut(scope)?.remove(index)
    }

    /// Adds a directory prefix to a rule's blacklist
    ///
    /// A path already present is rejected with `ConfigError::DuplicateBlacklistPath`
    /// and logged; the blacklist is left as it was.
    pub fn add_blacklist_path(
        &mut self,
        scope: &ScopeRef,
        rule_index: usize,
        path: ScopePath,
    ) -> Result<(), ConfigError> {
        let rule = self.rule_set_mut(scope)?.rule_mut(rule_index)?;
        if rule.blacklist.contains(&path) {
            tracing::warn!(
                scope = %scope,
                rule = %rule.id,
                path = %path,
                "blacklist path already present"
            );
            return Err(ConfigError::DuplicateBlacklistPath {
                rule: rule.id.to_string(),
                path: path.to_string(),
            });
        }
        rule.blacklist.push(path);
        Ok(())
    }

    /// Removes the blacklist entry at `path_index` from a rule
    pub fn remove_blacklist_path(
        &mut self,
        scope: &ScopeRef,
        rule_index: usize,
        path_index: usize,
    ) -> Result<ScopePath, ConfigError> {
        let rule = self.rule_set_mut(scope)?.rule_mut(rule_index)?;
        if path_index >= rule.blacklist.len() {
            return Err(ConfigError::IndexOutOfRange {
                index: path_index,
                len: rule.blacklist.len(),
            });
        }
        Ok(rule.blacklist.remove(path_index))
    }

    /// Position of a rule within a scope's sorted list
    pub fn position(
        &self,
        scope: &ScopeRef,
        id: &RuleId,
        stage: Option<PipelineStage>,
    ) -> Result<usize, ConfigError> {
        let set = match scope {
            ScopeRef::Global => &self.global.rules,
            ScopeRef::Local(path) => {
                &self
                    .scope(path)
                    .ok_or_else(|| ConfigError::ScopeNotFound(path.to_string()))?
                    .rules
            }
        };
        set.position(id, stage)
            .ok_or_else(|| ConfigError::RuleNotFound {
                id: id.to_string(),
                scope: scope.to_string(),
            })
    }

    fn rule_set_mut(&mut self, scope: &ScopeRef) -> Result<&mut RuleSet, ConfigError> {
        match scope {
            ScopeRef::Global => Ok(&mut self.global.rules),
            ScopeRef::Local(path) => self
                .scopes
                .iter_mut()
                .find(|s| &s.path == path)
                .map(|s| &mut s.rules)
                .ok_or_else(|| ConfigError::ScopeNotFound(path.to_string())),
        }
    }

    /// Parses a catalog from its TOML form
    ///
    /// Expected format:
    /// ```toml
    /// [[global]]
    /// id = "check.file-size"
    /// stage = "common-preprocess"
    ///
    /// [[scopes]]
    /// path = "Assets/Art"
    ///
    /// [[scopes.rules]]
    /// id = "process.import-setting"
    /// stage = "typed-preprocess"
    /// types = ["texture"]
    /// params = { key = "compression", value = "bc7" }
    /// ```
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = toml::from_str(s)?;
        Self::from_parts(
            file.global,
            file.scopes.into_iter().map(|s| (s.path, s.rules)).collect(),
        )
    }

    /// Loads a catalog from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Serializes the catalog back to TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        let file = CatalogFile {
            global: self.global.rules().to_vec(),
            scopes: self
                .scopes
                .iter()
                .map(|s| ScopeFile {
                    path: s.path.clone(),
                    rules: s.rules().to_vec(),
                })
                .collect(),
        };
        let mut result = String::from(CATALOG_HEADER);
        result.push_str(&toml::to_string_pretty(&file)?);
        Ok(result)
    }

    /// Writes the catalog to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

const CATALOG_HEADER: &str = "# assetgate rule catalog\n\
# Global rules run before local scopes; outer scopes run before inner ones.\n\n";

#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    global: Vec<RuleSpec>,
    #[serde(default)]
    scopes: Vec<ScopeFile>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ScopeFile {
    path: ScopePath,
    #[serde(default)]
    rules: Vec<RuleSpec>,
}
