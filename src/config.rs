//! Configuration file parsing and validation

pub mod project_toml;

pub use project_toml::{
    CONFIG_FILE, ColorOption, Config, DEFAULT_CONFIG, DiagnosticsConfig, OutputConfig,
    OutputFormat, ProjectMeta,
};
