#![forbid(unsafe_code)]

//! Parsing and validation for assetgate.toml configuration files

use crate::engine::EventFilter;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the project configuration
pub const CONFIG_FILE: &str = "assetgate.toml";

/// Configuration written by `assetgate init`
pub const DEFAULT_CONFIG: &str = r#"# Asset pipeline rule configuration
[project]
version = "1"

# Events outside this directory never reach a rule
resource_root = "Assets"

# Authored rule catalog
rules = "assetgate-rules.toml"

# Where `assetgate export` writes the runtime snapshot
snapshot_dir = ".assetgate"

# File names that are never dispatched
reserved = ["assetgate*.toml", "rules-*.toml"]

[diagnostics]
enabled = false

[output]
format = "human"
color = "auto"
"#;

/// Main configuration struct for assetgate.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Project metadata
    pub project: ProjectMeta,

    /// Dispatch diagnostics
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.project.version != "1" {
            return Err(ConfigError::Validation(format!(
                "Unsupported configuration version '{}'. Expected '1'",
                self.project.version
            )));
        }

        if self.project.rules.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "No rule catalog configured. Set project.rules in assetgate.toml.".to_string(),
            ));
        }

        for pattern in &self.project.reserved {
            globset::Glob::new(pattern).map_err(|e| {
                ConfigError::Validation(format!(
                    "Invalid reserved glob pattern '{}': {}",
                    pattern, e
                ))
            })?;
        }

        Ok(())
    }

    /// Builds the pre-dispatch filter for this project
    pub fn event_filter(&self) -> Result<EventFilter, ConfigError> {
        EventFilter::new(self.project.resource_root.as_str(), &self.project.reserved)
    }

    /// Catalog path resolved against the project root
    pub fn rules_path(&self, root: &Path) -> PathBuf {
        root.join(&self.project.rules)
    }

    /// Snapshot directory resolved against the project root
    pub fn snapshot_path(&self, root: &Path) -> PathBuf {
        root.join(&self.project.snapshot_dir)
    }
}

/// Project metadata section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMeta {
    /// Configuration version (must be "1")
    pub version: String,

    /// Directory prefix every dispatched path must start with
    #[serde(default = "default_resource_root")]
    pub resource_root: String,

    /// Authored rule catalog file
    #[serde(default = "default_rules")]
    pub rules: PathBuf,

    /// Snapshot directory
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    /// File-name globs that never dispatch
    #[serde(default = "default_reserved")]
    pub reserved: Vec<String>,
}

fn default_resource_root() -> String {
    "Assets".to_string()
}

fn default_rules() -> PathBuf {
    PathBuf::from("assetgate-rules.toml")
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from(".assetgate")
}

fn default_reserved() -> Vec<String> {
    vec!["assetgate*.toml".to_string(), "rules-*.toml".to_string()]
}

/// Diagnostics section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Emit every dispatch decision through the tracing sink
    #[serde(default)]
    pub enabled: bool,
}

/// Output configuration section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Color output setting
    #[serde(default)]
    pub color: ColorOption,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON Lines format
    Jsonl,
}

/// Color output options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorOption {
    /// Auto-detect based on terminal capabilities
    #[default]
    Auto,
    /// Always use color
    Always,
    /// Never use color
    Never,
}
