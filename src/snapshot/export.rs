#![forbid(unsafe_code)]

//! Flattens a catalog into a snapshot

use crate::catalog::{RuleCatalog, ScopeRef};
use crate::error::SnapshotError;
use crate::index::rule_location;
use crate::rules::RuleSpec;
use crate::snapshot::records::{ManifestEntry, RuleRecord, ScopeRecords, Snapshot};
use crate::types::{RuleId, ScopePath};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// Accumulates rule records, rejecting duplicate backing locations
#[derive(Debug, Default)]
pub struct SnapshotExporter {
    snapshot: Snapshot,
    locations: HashSet<String>,
    identities: BTreeSet<RuleId>,
}

impl SnapshotExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walks the global tier, then every local scope
    pub fn from_catalog(catalog: &RuleCatalog) -> Result<Snapshot, SnapshotError> {
        let mut exporter = Self::new();
        for rule in catalog.global().rules() {
            exporter.push(&ScopeRef::Global, rule)?;
        }
        for scope in catalog.scopes() {
            exporter.push_scope(scope.path());
            let scope_ref = ScopeRef::Local(scope.path().clone());
            for rule in scope.rules() {
                exporter.push(&scope_ref, rule)?;
            }
        }
        Ok(exporter.finish())
    }

    /// Flattens `catalog` and writes it into `dir`
    pub fn export(catalog: &RuleCatalog, dir: &Path) -> Result<Snapshot, SnapshotError> {
        let snapshot = Self::from_catalog(catalog)?;
        snapshot.write(dir)?;
        tracing::info!(
            dir = %dir.display(),
            rules = snapshot.manifest.entries.len(),
            "exported rule snapshot"
        );
        Ok(snapshot)
    }

    /// Records a local scope, even one without rules
    pub fn push_scope(&mut self, path: &ScopePath) {
        self.scope_records(path);
    }

    /// Adds one rule record
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::DuplicateExportPath` if the rule's location was
    /// already exported.
    pub fn push(&mut self, scope: &ScopeRef, rule: &RuleSpec) -> Result<(), SnapshotError> {
        let location = rule_location(scope, rule);
        if !self.locations.insert(location.clone()) {
            return Err(SnapshotError::DuplicateExportPath(location));
        }

        self.identities.insert(rule.id.clone());
        self.snapshot.manifest.entries.push(ManifestEntry {
            id: rule.id.clone(),
            location: location.clone(),
        });

        let record = RuleRecord::from_spec(location, rule);
        match scope {
            ScopeRef::Global => self.snapshot.global.rules.push(record),
            ScopeRef::Local(path) => self.scope_records(path).rules.push(record),
        }
        Ok(())
    }

    pub fn finish(mut self) -> Snapshot {
        self.snapshot.manifest.identities = self.identities.into_iter().collect();
        self.snapshot
    }

    fn scope_records(&mut self, path: &ScopePath) -> &mut ScopeRecords {
        let scopes = &mut self.snapshot.local.scopes;
        let pos = match scopes.iter().position(|s| &s.path == path) {
            Some(pos) => pos,
            None => {
                scopes.push(ScopeRecords {
                    path: path.clone(),
                    rules: Vec::new(),
                });
                scopes.len() - 1
            }
        };
        &mut scopes[pos]
    }
}
