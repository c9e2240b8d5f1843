#![forbid(unsafe_code)]

//! Rebuilds live handlers from a snapshot without the authoring catalog

use crate::catalog::RuleCatalog;
use crate::error::{ResolutionError, SnapshotError};
use crate::index::{HandlerSet, ScopeIndex, resolve_handler};
use crate::rules::HandlerRegistry;
use crate::snapshot::records::{RuleRecord, SNAPSHOT_VERSION, Snapshot};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Result of importing a snapshot
#[derive(Debug)]
pub struct LoadedSnapshot {
    /// Catalog reconstructed from the records
    pub catalog: RuleCatalog,
    /// Handlers for every manifest entry that resolved
    pub handlers: HandlerSet,
    /// Entries that did not resolve; their rules are left out of the index
    pub errors: Vec<ResolutionError>,
}

impl LoadedSnapshot {
    pub fn build_index(&self) -> ScopeIndex {
        ScopeIndex::build(&self.catalog, &self.handlers)
    }
}

/// Replays snapshots against a runtime handler registry
#[derive(Debug)]
pub struct SnapshotImporter<'a> {
    registry: &'a HandlerRegistry,
}

impl<'a> SnapshotImporter<'a> {
    pub fn new(registry: &'a HandlerRegistry) -> Self {
        Self { registry }
    }

    /// Reads and imports the snapshot in `dir`
    pub fn load(&self, dir: &Path) -> Result<LoadedSnapshot, SnapshotError> {
        let snapshot = Snapshot::read(dir)?;
        self.import(&snapshot)
    }

    /// Resolves every manifest entry to a live handler
    ///
    /// Entries whose identity is unknown, whose record is missing, or whose
    /// field state does not fit the handler are reported in
    /// `LoadedSnapshot::errors` and skipped.
    ///
    /// # Errors
    ///
    /// Fails as a whole only for an unsupported version or records that
    /// break catalog invariants.
    pub fn import(&self, snapshot: &Snapshot) -> Result<LoadedSnapshot, SnapshotError> {
        if snapshot.manifest.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(
                snapshot.manifest.version.clone(),
            ));
        }

        let catalog = snapshot.to_catalog()?;
        let records: HashMap<&str, &RuleRecord> = snapshot
            .records()
            .map(|(_, record)| (record.location.as_str(), record))
            .collect();

        let mut handlers = HandlerSet::new();
        let mut errors = Vec::new();
        let mut listed = HashSet::new();

        for entry in &snapshot.manifest.entries {
            listed.insert(entry.location.as_str());
            let Some(record) = records.get(entry.location.as_str()) else {
                tracing::warn!(location = %entry.location, "manifest entry has no record");
                errors.push(ResolutionError::MissingBackingFile {
                    location: entry.location.clone(),
                });
                continue;
            };

            match resolve_handler(self.registry, &record.to_spec(), &record.location) {
                Ok(handler) => handlers.insert(record.location.clone(), handler),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping snapshot rule");
                    errors.push(e);
                }
            }
        }

        for location in records.keys().filter(|loc| !listed.contains(*loc)) {
            tracing::warn!(location, "record is not listed in the manifest, leaving it out");
        }

        tracing::debug!(
            handlers = handlers.len(),
            errors = errors.len(),
            "imported rule snapshot"
        );
        Ok(LoadedSnapshot {
            catalog,
            handlers,
            errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ScopeRef;
    use crate::rules::RuleSpec;
    use crate::snapshot::export::SnapshotExporter;
    use crate::snapshot::records::ManifestEntry;
    use crate::types::{PipelineStage, RuleId};

    fn catalog() -> RuleCatalog {
        let mut catalog = RuleCatalog::new();
        catalog
            .add_rule(
                &ScopeRef::Global,
                RuleSpec::new(RuleId::new("check.file-size").unwrap(), PipelineStage::Move)
                    .with_param("max_bytes", 5),
            )
            .unwrap();
        catalog
            .add_rule(
                &ScopeRef::Global,
                RuleSpec::new(RuleId::new("custom.rule").unwrap(), PipelineStage::Move),
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_unknown_identity_skipped() {
        let registry = HandlerRegistry::with_builtins();
        let snapshot = SnapshotExporter::from_catalog(&catalog()).unwrap();
        let loaded = SnapshotImporter::new(&registry).import(&snapshot).unwrap();

        assert_eq!(loaded.catalog.rule_count(), 2);
        assert_eq!(loaded.handlers.len(), 1);
        assert_eq!(
            loaded.errors,
            vec![ResolutionError::UnknownRuleType {
                id: "custom.rule".to_string(),
                location: "global/move/custom.rule".to_string(),
            }]
        );
        assert_eq!(loaded.build_index().rule_count(), 1);
    }

    #[test]
    fn test_missing_record_reported() {
        let registry = HandlerRegistry::with_builtins();
        let mut snapshot = SnapshotExporter::from_catalog(&catalog()).unwrap();
        snapshot.manifest.entries.push(ManifestEntry {
            id: RuleId::new("process.notify").unwrap(),
            location: "global/delete/process.notify".to_string(),
        });

        let loaded = SnapshotImporter::new(&registry).import(&snapshot).unwrap();
        assert!(loaded.errors.contains(&ResolutionError::MissingBackingFile {
            location: "global/delete/process.notify".to_string(),
        }));
    }

    #[test]
    fn test_invalid_state_reported() {
        let registry = HandlerRegistry::with_builtins();
        let mut snapshot = SnapshotExporter::from_catalog(&catalog()).unwrap();
        snapshot.global.rules[0]
            .params
            .insert("max_bytes".to_string(), toml::Value::from("lots"));

        let loaded = SnapshotImporter::new(&registry).import(&snapshot).unwrap();
        assert!(
            loaded
                .errors
                .iter()
                .any(|e| matches!(e, ResolutionError::InvalidParams { .. }))
        );
        assert!(loaded.handlers.is_empty());
    }

    #[test]
    fn test_unsupported_version() {
        let registry = HandlerRegistry::new();
        let mut snapshot = Snapshot::default();
        snapshot.manifest.version = "9".to_string();
        assert!(matches!(
            SnapshotImporter::new(&registry).import(&snapshot),
            Err(SnapshotError::UnsupportedVersion(v)) if v == "9"
        ));
    }

    #[test]
    fn test_import_does_not_mutate_snapshot() {
        let registry = HandlerRegistry::with_builtins();
        let snapshot = SnapshotExporter::from_catalog(&catalog()).unwrap();
        let before = snapshot.clone();
        SnapshotImporter::new(&registry).import(&snapshot).unwrap();
        assert_eq!(snapshot, before);
    }
}
