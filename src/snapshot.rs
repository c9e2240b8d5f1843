//! Snapshot export and import
//!
//! The snapshot is the only artifact a runtime consumes: plain records plus a
//! manifest, replayed against a handler registry on load.

pub mod export;
pub mod import;
pub mod records;

pub use export::SnapshotExporter;
pub use import::{LoadedSnapshot, SnapshotImporter};
pub use records::{
    GLOBAL_FILE, GlobalFile, LOCAL_FILE, LocalFile, MANIFEST_FILE, Manifest, ManifestEntry,
    RuleRecord, SNAPSHOT_VERSION, ScopeRecords, Snapshot,
};
