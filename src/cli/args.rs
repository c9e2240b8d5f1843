//! CLI argument parsing using clap

use crate::catalog::ScopeRef;
use crate::config;
use crate::types::{AssetType, PipelineStage};
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for assetgate commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON Lines format (one JSON object per line)
    Jsonl,
}

impl From<config::OutputFormat> for OutputFormat {
    fn from(format: config::OutputFormat) -> Self {
        match format {
            config::OutputFormat::Human => OutputFormat::Human,
            config::OutputFormat::Jsonl => OutputFormat::Jsonl,
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Automatically detect if terminal supports color
    Auto,
    /// Always use color
    Always,
    /// Never use color
    Never,
}

impl From<ColorChoice> for config::ColorOption {
    fn from(choice: ColorChoice) -> Self {
        match choice {
            ColorChoice::Auto => config::ColorOption::Auto,
            ColorChoice::Always => config::ColorOption::Always,
            ColorChoice::Never => config::ColorOption::Never,
        }
    }
}

/// assetgate CLI main entry point
#[derive(Parser, Debug)]
#[command(name = "assetgate")]
#[command(about = "Ordered, scoped rule dispatch for asset pipeline events")]
#[command(version)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Output coloring
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,
}

/// Available assetgate subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create assetgate.toml and an empty rule catalog
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Print the asset type of each path
    Classify {
        /// Paths to classify
        #[arg(required = true)]
        paths: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "human")]
        format: OutputFormat,
    },

    /// List every rule, per scope, in execution order
    List {
        /// Output format (defaults to the configured format)
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },

    /// Add or remove rules
    Rule {
        #[command(subcommand)]
        action: RuleAction,
    },

    /// Add or remove local scopes
    Scope {
        #[command(subcommand)]
        action: ScopeAction,
    },

    /// Add or remove per-rule blacklist paths
    Blacklist {
        #[command(subcommand)]
        action: BlacklistAction,
    },

    /// Write the runtime snapshot
    Export,

    /// Dispatch one event through the rule engine
    Run(RunArgs),
}

#[derive(Subcommand, Debug)]
pub enum RuleAction {
    /// Add a rule to a scope
    Add(RuleAddArgs),

    /// Remove the rule at a position of a scope's list (see `list`)
    Remove {
        /// `global` or a scope directory (`global/` for a directory named global)
        #[arg(long, default_value = "global")]
        scope: ScopeRef,

        /// Position within the scope
        index: usize,
    },
}

#[derive(Args, Debug)]
pub struct RuleAddArgs {
    /// Handler identity, e.g. check.file-size
    pub id: String,

    /// `global` or a scope directory (`global/` for a directory named global)
    #[arg(long, default_value = "global")]
    pub scope: ScopeRef,

    /// Pipeline stage the rule targets
    #[arg(long)]
    pub stage: PipelineStage,

    /// Asset types, comma separated (defaults to all)
    #[arg(long)]
    pub types: Option<AssetType>,

    /// Tie-break key, lower runs first
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub order: i32,

    /// Display name (defaults to the identity)
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Handler parameter as key=value; the value is read as TOML, falling back to a string
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, toml::Value)>,
}

#[derive(Subcommand, Debug)]
pub enum ScopeAction {
    /// Register a directory scope
    Add { dir: String },
    /// Remove a directory scope and its rules
    Remove { dir: String },
}

#[derive(Subcommand, Debug)]
pub enum BlacklistAction {
    /// Suppress a rule under a directory prefix
    Add {
        #[command(flatten)]
        target: BlacklistTarget,

        /// Directory prefix
        path: String,
    },
    /// Remove a blacklist entry by position
    Remove {
        #[command(flatten)]
        target: BlacklistTarget,

        /// Position within the rule's blacklist
        index: usize,
    },
}

/// The rule a blacklist command edits
#[derive(Args, Debug)]
pub struct BlacklistTarget {
    /// `global` or a scope directory (`global/` for a directory named global)
    #[arg(long, default_value = "global")]
    pub scope: ScopeRef,

    /// Rule identity
    #[arg(long)]
    pub rule: String,

    /// Stage, needed when the identity appears in several global stages
    #[arg(long)]
    pub stage: Option<PipelineStage>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Asset path relative to the project root
    pub path: String,

    /// Pipeline stage to dispatch
    #[arg(long)]
    pub stage: PipelineStage,

    /// Asset type (derived from the path when omitted or not a single type)
    #[arg(long = "type")]
    pub asset_type: Option<AssetType>,

    /// Build the engine from the exported snapshot instead of the catalog
    #[arg(long)]
    pub snapshot: bool,

    /// Print every dispatch decision
    #[arg(long)]
    pub explain: bool,

    /// Output format (defaults to the configured format)
    #[arg(short, long)]
    pub format: Option<OutputFormat>,
}

/// Parses `key=value`, reading the value as a TOML literal when possible
pub fn parse_param(s: &str) -> Result<(String, toml::Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{}'", s));
    }
    let value = toml::from_str::<toml::Table>(&format!("v = {}", raw.trim()))
        .ok()
        .and_then(|mut table| table.remove("v"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}
