#![forbid(unsafe_code)]

//! On-disk snapshot layout
//!
//! A snapshot directory holds three files:
//! - `rules-manifest.toml`: format version, every identity seen, and one
//!   entry per rule location
//! - `rules-global.toml`: `[[rules]]` records of the global tier
//! - `rules-local.toml`: `[[scopes]]` with nested `[[scopes.rules]]` records

use crate::catalog::{RuleCatalog, ScopeRef};
use crate::error::{ConfigError, SnapshotError};
use crate::index::rule_location;
use crate::rules::RuleSpec;
use crate::types::{AssetType, PipelineStage, RuleId, ScopePath};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE: &str = "rules-manifest.toml";
pub const GLOBAL_FILE: &str = "rules-global.toml";
pub const LOCAL_FILE: &str = "rules-local.toml";

/// Format version written into every manifest
pub const SNAPSHOT_VERSION: &str = "1";

const SNAPSHOT_HEADER: &str = "# Generated by `assetgate export`. Do not edit by hand.\n\n";

/// One flattened rule instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    /// Backing location, unique across the snapshot
    pub location: String,
    pub id: RuleId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "all_types")]
    pub types: AssetType,
    pub stage: PipelineStage,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blacklist: Vec<ScopePath>,
    /// Serialized handler field state
    #[serde(default)]
    pub params: toml::Table,
}

fn all_types() -> AssetType {
    AssetType::ALL
}

impl RuleRecord {
    pub fn from_spec(location: String, spec: &RuleSpec) -> Self {
        Self {
            location,
            id: spec.id.clone(),
            name: spec.name.clone(),
            types: spec.types,
            stage: spec.stage,
            order: spec.order,
            description: spec.description.clone(),
            blacklist: spec.blacklist.clone(),
            params: spec.params.clone(),
        }
    }

    pub fn to_spec(&self) -> RuleSpec {
        RuleSpec {
            id: self.id.clone(),
            name: self.name.clone(),
            types: self.types,
            stage: self.stage,
            order: self.order,
            description: self.description.clone(),
            blacklist: self.blacklist.clone(),
            params: self.params.clone(),
        }
    }
}

/// Manifest line for one rule location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: RuleId,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    /// Every distinct identity in the snapshot, sorted
    #[serde(default)]
    pub identities: Vec<RuleId>,
    #[serde(default)]
    pub entries: Vec<ManifestEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            identities: Vec::new(),
            entries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalFile {
    #[serde(default)]
    pub rules: Vec<RuleRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeRecords {
    pub path: ScopePath,
    #[serde(default)]
    pub rules: Vec<RuleRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalFile {
    #[serde(default)]
    pub scopes: Vec<ScopeRecords>,
}

/// A complete snapshot held in memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub manifest: Manifest,
    pub global: GlobalFile,
    pub local: LocalFile,
}

impl Snapshot {
    /// Reads the three snapshot files from `dir`
    pub fn read(dir: &Path) -> Result<Self, SnapshotError> {
        Ok(Self {
            manifest: read_toml(&dir.join(MANIFEST_FILE))?,
            global: read_toml(&dir.join(GLOBAL_FILE))?,
            local: read_toml(&dir.join(LOCAL_FILE))?,
        })
    }

    /// Writes the three snapshot files into `dir`, creating it if needed
    pub fn write(&self, dir: &Path) -> Result<(), SnapshotError> {
        fs::create_dir_all(dir)?;
        write_toml(&dir.join(MANIFEST_FILE), &self.manifest)?;
        write_toml(&dir.join(GLOBAL_FILE), &self.global)?;
        write_toml(&dir.join(LOCAL_FILE), &self.local)?;
        Ok(())
    }

    /// Every record with the scope it belongs to, global tier first
    pub fn records(&self) -> impl Iterator<Item = (ScopeRef, &RuleRecord)> {
        let global = self
            .global
            .rules
            .iter()
            .map(|record| (ScopeRef::Global, record));
        let local = self.local.scopes.iter().flat_map(|scope| {
            scope
                .rules
                .iter()
                .map(move |record| (ScopeRef::Local(scope.path.clone()), record))
        });
        global.chain(local)
    }

    /// Rebuilds the authored catalog, re-validating every invariant
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Config` if a record's location does not match
    /// its scope and identity, or if the records break a catalog invariant.
    pub fn to_catalog(&self) -> Result<RuleCatalog, SnapshotError> {
        for (scope, record) in self.records() {
            let expected = rule_location(&scope, &record.to_spec());
            if record.location != expected {
                return Err(ConfigError::Validation(format!(
                    "record location '{}' does not match its rule (expected '{}')",
                    record.location, expected
                ))
                .into());
            }
        }

        let global = self.global.rules.iter().map(RuleRecord::to_spec).collect();
        let scopes = self
            .local
            .scopes
            .iter()
            .map(|scope| {
                (
                    scope.path.clone(),
                    scope.rules.iter().map(RuleRecord::to_spec).collect(),
                )
            })
            .collect();
        Ok(RuleCatalog::from_parts(global, scopes)?)
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, SnapshotError> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|source| SnapshotError::Parse {
        file: path.to_path_buf(),
        source,
    })
}

fn write_toml<T: Serialize>(path: &Path, value: &T) -> Result<(), SnapshotError> {
    let mut content = String::from(SNAPSHOT_HEADER);
    content.push_str(&toml::to_string_pretty(value)?);
    fs::write(path, content)?;
    Ok(())
}
