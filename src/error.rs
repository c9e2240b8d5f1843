//! Error types for assetgate
//!
//! Errors are grouped by how the engine reacts to them:
//! - [`ConfigError`]: rejected at the mutation or load API, no state changes
//! - [`ResolutionError`]: the offending rule is skipped and the error reported
//! - [`HandlerError`]: a checker or processor failed while running
//! - [`SnapshotError`]: snapshot export or import failed as a whole

use std::path::PathBuf;

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A rule with the same identity already exists in the scope
    #[error("Rule '{id}' already exists in scope '{scope}'")]
    DuplicateRuleKind { id: String, scope: String },

    /// The rule has no handler to back it
    #[error("Rule '{0}' has no registered handler")]
    NullRule(String),

    /// An index did not address an existing entry
    #[error("Index {index} is out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// A blacklist already contains the path
    #[error("Blacklist of rule '{rule}' already contains '{path}'")]
    DuplicateBlacklistPath { rule: String, path: String },

    /// A local scope for the directory already exists
    #[error("A scope for directory '{0}' already exists")]
    DuplicateScope(String),

    /// No local scope is registered for the directory
    #[error("No scope registered for directory '{0}'")]
    ScopeNotFound(String),

    /// No rule with the identity exists in the scope
    #[error("Rule '{id}' not found in scope '{scope}'")]
    RuleNotFound { id: String, scope: String },

    /// Rule parameters could not be applied to the handler
    #[error("Invalid parameters for rule '{id}': {message}")]
    InvalidParams { id: String, message: String },

    /// Invalid configuration value
    #[error("Configuration validation failed: {0}")]
    Validation(String),

    /// TOML parse error
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("Failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while constructing a handler from its parameters
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// No constructor is registered for the identity
    #[error("Unknown rule type '{0}'")]
    UnknownType(String),

    /// A constructor is already registered for the identity
    #[error("Rule type '{0}' is already registered")]
    DuplicateType(String),

    /// Parameters did not deserialize onto the handler's fields
    #[error("Invalid parameters for '{id}': {message}")]
    InvalidParams { id: String, message: String },

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidRegex(String),
}

/// A rule that could not be turned into a live handler
///
/// These are collected and reported; resolution continues for every other rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// The identity is not present in the runtime's handler registry
    #[error("Unknown rule type '{id}' at {location}")]
    UnknownRuleType { id: String, location: String },

    /// The manifest references a location with no stored record
    #[error("Missing backing record for {location}")]
    MissingBackingFile { location: String },

    /// The stored field state did not fit the handler
    #[error("Invalid state for '{id}' at {location}: {message}")]
    InvalidParams {
        id: String,
        location: String,
        message: String,
    },
}

/// Failure reported by a checker or processor body
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The handler reported an internal failure
    #[error("{0}")]
    Failed(String),

    /// The processor needs import settings but the event carries none
    #[error("No import settings available for '{0}'")]
    MissingImportSettings(String),

    /// I/O error while inspecting the asset
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Snapshot export/import errors
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Two rule records would be written to the same backing location
    #[error("Duplicate export path: {0}")]
    DuplicateExportPath(String),

    /// The snapshot was written by an incompatible version
    #[error("Unsupported snapshot version '{0}'")]
    UnsupportedVersion(String),

    /// The snapshot contents violate catalog invariants
    #[error("Invalid snapshot contents: {0}")]
    Config(#[from] ConfigError),

    /// TOML parse error in a snapshot file
    #[error("Failed to parse {file}: {source}")]
    Parse {
        file: PathBuf,
        source: toml::de::Error,
    },

    /// TOML serialization error
    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error type for assetgate
#[derive(Debug, thiserror::Error)]
pub enum AssetGateError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Handler construction error
    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    /// Snapshot error
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
