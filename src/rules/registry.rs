#![forbid(unsafe_code)]

//! Handler registry mapping stable rule identities to constructors
//!
//! The registry is responsible for:
//! - Holding one constructor per rule identity
//! - Building live handlers from a rule's serialized field state
//! - Reporting which identities are known, and their handler kind

use crate::error::RuleError;
use crate::rules::builtin;
use crate::rules::{Handler, HandlerKind, RuleSpec};
use crate::types::RuleId;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// Builds a handler from its serialized field state
pub type HandlerConstructor =
    Box<dyn Fn(&RuleId, &toml::Table) -> Result<Handler, RuleError> + Send + Sync>;

struct RegisteredType {
    kind: HandlerKind,
    summary: String,
    construct: HandlerConstructor,
}

/// Registry of constructible handler types, keyed by identity
pub struct HandlerRegistry {
    types: BTreeMap<RuleId, RegisteredType>,
}

impl HandlerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: BTreeMap::new(),
        }
    }

    /// Create a registry holding every built-in handler
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_builtins(&mut registry);
        registry
    }

    /// Register a constructor for an identity
    ///
    /// # Errors
    ///
    /// Returns `RuleError::DuplicateType` if the identity is already registered.
    pub fn register<F>(
        &mut self,
        id: RuleId,
        kind: HandlerKind,
        summary: impl Into<String>,
        construct: F,
    ) -> Result<(), RuleError>
    where
        F: Fn(&RuleId, &toml::Table) -> Result<Handler, RuleError> + Send + Sync + 'static,
    {
        if self.types.contains_key(&id) {
            return Err(RuleError::DuplicateType(id.to_string()));
        }
        self.types.insert(
            id,
            RegisteredType {
                kind,
                summary: summary.into(),
                construct: Box::new(construct),
            },
        );
        Ok(())
    }

    /// Build a handler for a rule, overlaying its params onto the handler's defaults
    ///
    /// # Errors
    ///
    /// Returns `RuleError::UnknownType` if the identity is not registered, or
    /// the constructor's error if the params do not fit the handler.
    pub fn construct(&self, spec: &RuleSpec) -> Result<Handler, RuleError> {
        let registered = self
            .types
            .get(&spec.id)
            .ok_or_else(|| RuleError::UnknownType(spec.id.to_string()))?;
        let handler = (registered.construct)(&spec.id, &spec.params)?;

        if handler.kind() != registered.kind {
            tracing::warn!(
                id = %spec.id,
                declared = %registered.kind,
                built = %handler.kind(),
                "constructor built a different handler kind than registered"
            );
        }
        Ok(handler)
    }

    /// Returns true if a constructor exists for the identity
    pub fn contains(&self, id: &RuleId) -> bool {
        self.types.contains_key(id)
    }

    /// Iterate over (identity, kind, summary) in identity order
    pub fn iter(&self) -> impl Iterator<Item = (&RuleId, HandlerKind, &str)> {
        self.types
            .iter()
            .map(|(id, t)| (id, t.kind, t.summary.as_str()))
    }

    /// Get the number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Deserialize a handler's fields from its params table
///
/// Handler structs mark their fields `#[serde(default)]`, so missing keys keep
/// their defaults and present keys overwrite them.
pub fn overlay<T: DeserializeOwned>(id: &RuleId, params: &toml::Table) -> Result<T, RuleError> {
    toml::Value::Table(params.clone())
        .try_into()
        .map_err(|e: toml::de::Error| RuleError::InvalidParams {
            id: id.to_string(),
            message: e.message().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::rules::{AssetContext, Checker};
    use crate::types::PipelineStage;
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct Threshold {
        limit: u32,
    }

    impl Default for Threshold {
        fn default() -> Self {
            Self { limit: 7 }
        }
    }

    impl Checker for Threshold {
        fn check(&self, _ctx: &AssetContext) -> Result<bool, HandlerError> {
            Ok(self.limit > 5)
        }
    }

    fn id(s: &str) -> RuleId {
        RuleId::new(s).unwrap()
    }

    fn threshold_registry() -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry
            .register(id("test.threshold"), HandlerKind::Checker, "test", |id, params| {
                Ok(Handler::Checker(Box::new(overlay::<Threshold>(id, params)?)))
            })
            .unwrap();
        registry
    }

    #[test]
    fn test_new_registry() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_register_and_construct() {
        let registry = threshold_registry();
        assert!(registry.contains(&id("test.threshold")));
        assert_eq!(
            registry.iter().map(|(id, kind, _)| (id.as_str(), kind)).collect::<Vec<_>>(),
            vec![("test.threshold", HandlerKind::Checker)]
        );

        let spec = RuleSpec::new(id("test.threshold"), PipelineStage::CommonPreprocess);
        let handler = registry.construct(&spec).unwrap();
        assert_eq!(handler.kind(), HandlerKind::Checker);
    }

    #[test]
    fn test_register_duplicate() {
        let mut registry = threshold_registry();
        let result = registry.register(
            id("test.threshold"),
            HandlerKind::Checker,
            "again",
            |_, _| Err(RuleError::InvalidRegex("unused".to_string())),
        );
        assert!(matches!(result, Err(RuleError::DuplicateType(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_construct_unknown_type() {
        let registry = threshold_registry();
        let spec = RuleSpec::new(id("test.missing"), PipelineStage::Move);
        assert!(matches!(
            registry.construct(&spec),
            Err(RuleError::UnknownType(_))
        ));
    }

    #[test]
    fn test_overlay_keeps_defaults() {
        let table = toml::Table::new();
        let t: Threshold = overlay(&id("test.threshold"), &table).unwrap();
        assert_eq!(t.limit, 7);
    }

    #[test]
    fn test_overlay_overwrites_fields() {
        let mut table = toml::Table::new();
        table.insert("limit".to_string(), toml::Value::Integer(3));
        let t: Threshold = overlay(&id("test.threshold"), &table).unwrap();
        assert_eq!(t.limit, 3);
    }

    #[test]
    fn test_overlay_rejects_unknown_fields() {
        let mut table = toml::Table::new();
        table.insert("limt".to_string(), toml::Value::Integer(3));
        let result = overlay::<Threshold>(&id("test.threshold"), &table);
        assert!(matches!(result, Err(RuleError::InvalidParams { .. })));
    }

    #[test]
    fn test_builtins_registered() {
        let registry = HandlerRegistry::with_builtins();
        assert!(registry.contains(&id("check.file-size")));
        assert!(registry.contains(&id("process.import-setting")));
        let ids: Vec<&str> = registry.iter().map(|(id, _, _)| id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
