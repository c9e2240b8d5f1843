#![forbid(unsafe_code)]

//! assetgate: ordered, scoped rule dispatch for asset pipeline events
//!
//! Rules are authored in a catalog with one global tier and any number of
//! directory scopes. For each file-change event the engine runs the check
//! stage (global rules, then scopes outer to inner) and, unless a check
//! blocked the stage, every matching processor.

pub mod catalog;
pub mod classify;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod output;
pub mod rules;
pub mod snapshot;
pub mod types;

// Re-export error types for convenient access
pub use error::{
    AssetGateError, ConfigError, HandlerError, ResolutionError, RuleError, SnapshotError,
};

// Re-export core domain types for convenient access
pub use catalog::{RuleCatalog, ScopeRef};
pub use engine::{AssetEvent, DispatchEngine, DispatchOutcome};
pub use index::ScopeIndex;
pub use types::{AssetType, PipelineStage, RuleId, ScopePath};
