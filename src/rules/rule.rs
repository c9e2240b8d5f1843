#![forbid(unsafe_code)]

//! Rule data model and the handler traits rules are backed by

use crate::error::HandlerError;
use crate::types::{AssetType, PipelineStage, RuleId, ScopePath};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One configured rule instance, as plain data
///
/// The `id` names the handler type that backs the rule; `params` is the
/// serialized field state overlaid onto a fresh handler when it is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Stable identity of the handler type
    pub id: RuleId,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Asset types the rule targets
    #[serde(default = "all_types")]
    pub types: AssetType,

    /// Pipeline stage the rule targets
    pub stage: PipelineStage,

    /// Tie-break key within a stage, lower runs first
    #[serde(default)]
    pub order: i32,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// Directory prefixes under which this rule is suppressed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blacklist: Vec<ScopePath>,

    /// Handler field state
    #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
    pub params: toml::Table,
}

fn all_types() -> AssetType {
    AssetType::ALL
}

impl RuleSpec {
    /// Creates a rule targeting every asset type with order 0
    pub fn new(id: RuleId, stage: PipelineStage) -> Self {
        Self {
            name: id.as_str().to_string(),
            id,
            types: AssetType::ALL,
            stage,
            order: 0,
            description: String::new(),
            blacklist: Vec::new(),
            params: toml::Table::new(),
        }
    }

    /// Sets the targeted asset types
    pub fn with_types(mut self, types: AssetType) -> Self {
        self.types = types;
        self
    }

    /// Sets the order key
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Sets one handler parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Sets the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sort key: (stage, order, identity) ascending
    pub fn sort_key(&self) -> (PipelineStage, i32, &str) {
        (self.stage, self.order, self.id.as_str())
    }

    /// Returns true when the rule targets this stage and asset type
    pub fn applies_to(&self, stage: PipelineStage, asset_type: AssetType) -> bool {
        self.stage == stage && self.types.matches(asset_type)
    }

    /// Returns the blacklist entry that suppresses this rule for `path`, if any
    pub fn blacklisted_by(&self, path: &str) -> Option<&ScopePath> {
        self.blacklist.iter().find(|prefix| prefix.is_prefix_of(path))
    }
}

/// Stand-in for the host's importer handle
///
/// Processors mutate type-specific import settings through this map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportSettings(BTreeMap<String, toml::Value>);

impl ImportSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.0.get(key)
    }

    /// Sets a value, returning the previous one
    pub fn set(&mut self, key: impl Into<String>, value: toml::Value) -> Option<toml::Value> {
        self.0.insert(key.into(), value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &toml::Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What a handler sees of the asset it runs against
#[derive(Debug, Clone, Copy)]
pub struct AssetContext<'a> {
    /// Canonical (forward-slash) asset path
    pub path: &'a str,

    /// Concrete asset type
    pub asset_type: AssetType,

    /// Stage being dispatched
    pub stage: PipelineStage,

    /// Size of the file in bytes, when known
    pub file_size: Option<u64>,
}

impl AssetContext<'_> {
    /// File name component of the path
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(self.path)
    }
}

/// A handler that validates an asset and may block the stage
pub trait Checker: Send + Sync {
    /// Returns `Ok(false)` to block the stage
    fn check(&self, ctx: &AssetContext) -> Result<bool, HandlerError>;
}

/// A handler that applies a side effect and never blocks the stage
pub trait Processor: Send + Sync {
    /// Applies the side effect; `settings` is `None` for move and delete events
    fn process(
        &self,
        ctx: &AssetContext,
        settings: Option<&mut ImportSettings>,
    ) -> Result<(), HandlerError>;
}

/// The two handler capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    Checker,
    Processor,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerKind::Checker => write!(f, "checker"),
            HandlerKind::Processor => write!(f, "processor"),
        }
    }
}

/// A live handler instance
pub enum Handler {
    Checker(Box<dyn Checker>),
    Processor(Box<dyn Processor>),
}

impl Handler {
    pub fn kind(&self) -> HandlerKind {
        match self {
            Handler::Checker(_) => HandlerKind::Checker,
            Handler::Processor(_) => HandlerKind::Processor,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler::{:?}", self.kind())
    }
}
