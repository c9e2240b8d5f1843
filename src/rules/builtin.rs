#![forbid(unsafe_code)]

//! Built-in checkers and processors
//!
//! Each handler's fields are its serialized state; missing params keep the
//! defaults below and unknown params are rejected.

use crate::error::{HandlerError, RuleError};
use crate::rules::registry::{HandlerRegistry, overlay};
use crate::rules::{AssetContext, Checker, Handler, HandlerKind, ImportSettings, Processor};
use crate::types::RuleId;
use regex::Regex;
use serde::Deserialize;

pub const FILE_SIZE: &str = "check.file-size";
pub const NAME_PATTERN: &str = "check.name-pattern";
pub const DENY_EXTENSION: &str = "check.deny-extension";
pub const IMPORT_SETTING: &str = "process.import-setting";
pub const NOTIFY: &str = "process.notify";

const DEFAULT_MAX_BYTES: u64 = 8 * 1024 * 1024;

/// Fails assets larger than `max_bytes`. Unknown sizes pass.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSizeCheck {
    pub max_bytes: u64,
}

impl Default for FileSizeCheck {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl Checker for FileSizeCheck {
    fn check(&self, ctx: &AssetContext) -> Result<bool, HandlerError> {
        Ok(ctx.file_size.is_none_or(|size| size <= self.max_bytes))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NamePatternParams {
    pattern: String,
}

/// Fails assets whose file name does not match `pattern`
#[derive(Debug, Clone)]
pub struct NamePatternCheck {
    pattern: Regex,
}

impl NamePatternCheck {
    pub fn new(pattern: &str) -> Result<Self, RuleError> {
        let pattern = Regex::new(pattern).map_err(|e| RuleError::InvalidRegex(e.to_string()))?;
        Ok(Self { pattern })
    }
}

impl Checker for NamePatternCheck {
    fn check(&self, ctx: &AssetContext) -> Result<bool, HandlerError> {
        Ok(self.pattern.is_match(ctx.file_name()))
    }
}

/// Fails assets whose lowercased extension is listed
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DenyExtensionCheck {
    pub extensions: Vec<String>,
}

impl Checker for DenyExtensionCheck {
    fn check(&self, ctx: &AssetContext) -> Result<bool, HandlerError> {
        let name = ctx.file_name().to_lowercase();
        let Some((_, extension)) = name.rsplit_once('.') else {
            return Ok(true);
        };
        Ok(!self
            .extensions
            .iter()
            .any(|denied| denied.trim_start_matches('.').eq_ignore_ascii_case(extension)))
    }
}

/// Writes one import setting on the asset's importer
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportSettingProcessor {
    pub key: String,
    pub value: toml::Value,
}

impl Processor for ImportSettingProcessor {
    fn process(
        &self,
        ctx: &AssetContext,
        settings: Option<&mut ImportSettings>,
    ) -> Result<(), HandlerError> {
        let settings =
            settings.ok_or_else(|| HandlerError::MissingImportSettings(ctx.path.to_string()))?;
        settings.set(self.key.clone(), self.value.clone());
        Ok(())
    }
}

/// Logs a message for every asset it runs against
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotifyProcessor {
    pub message: String,
}

impl Processor for NotifyProcessor {
    fn process(
        &self,
        ctx: &AssetContext,
        _settings: Option<&mut ImportSettings>,
    ) -> Result<(), HandlerError> {
        tracing::info!(path = ctx.path, stage = %ctx.stage, "{}", self.message);
        Ok(())
    }
}

type BuiltinConstructor = fn(&RuleId, &toml::Table) -> Result<Handler, RuleError>;

/// Registers every built-in handler
pub(crate) fn register_builtins(registry: &mut HandlerRegistry) {
    let entries: [(&str, HandlerKind, &str, BuiltinConstructor); 5] = [
        (
            FILE_SIZE,
            HandlerKind::Checker,
            "Blocks files larger than max_bytes",
            |id, params| Ok(Handler::Checker(Box::new(overlay::<FileSizeCheck>(id, params)?))),
        ),
        (
            NAME_PATTERN,
            HandlerKind::Checker,
            "Blocks files whose name does not match pattern",
            |id, params| {
                let params: NamePatternParams = overlay(id, params)?;
                Ok(Handler::Checker(Box::new(NamePatternCheck::new(
                    &params.pattern,
                )?)))
            },
        ),
        (
            DENY_EXTENSION,
            HandlerKind::Checker,
            "Blocks files with a listed extension",
            |id, params| {
                Ok(Handler::Checker(Box::new(overlay::<DenyExtensionCheck>(
                    id, params,
                )?)))
            },
        ),
        (
            IMPORT_SETTING,
            HandlerKind::Processor,
            "Sets key to value in the import settings",
            |id, params| {
                Ok(Handler::Processor(Box::new(
                    overlay::<ImportSettingProcessor>(id, params)?,
                )))
            },
        ),
        (
            NOTIFY,
            HandlerKind::Processor,
            "Logs message for each asset",
            |id, params| {
                Ok(Handler::Processor(Box::new(overlay::<NotifyProcessor>(
                    id, params,
                )?)))
            },
        ),
    ];

    for (id, kind, summary, construct) in entries {
        let Some(id) = RuleId::new(id) else {
            continue;
        };
        if let Err(e) = registry.register(id, kind, summary, construct) {
            tracing::warn!(error = %e, "skipping built-in handler");
        }
    }
}
