#![forbid(unsafe_code)]

//! Pre-dispatch event filter
//!
//! Events outside the resource root, or naming one of the engine's own
//! storage files, never reach a handler.

use crate::error::ConfigError;
use crate::types::ScopePath;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use std::fmt;

/// Why an event was kept out of dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterReason {
    /// Path is not the resource root or inside it
    OutsideResourceRoot,
    /// File name matches a reserved configuration-file pattern
    ReservedFileName,
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterReason::OutsideResourceRoot => write!(f, "outside resource root"),
            FilterReason::ReservedFileName => write!(f, "reserved file name"),
        }
    }
}

/// Resource-root and reserved-name filter
#[derive(Debug, Clone)]
pub struct EventFilter {
    resource_root: ScopePath,
    reserved: GlobSet,
}

impl EventFilter {
    /// Builds a filter from a resource root and reserved file-name globs
    ///
    /// An empty resource root admits every path.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if a glob does not compile.
    pub fn new(resource_root: impl Into<ScopePath>, reserved: &[String]) -> Result<Self, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in reserved {
            let glob = Glob::new(pattern).map_err(|e| {
                ConfigError::Validation(format!("invalid reserved pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }
        let reserved = builder
            .build()
            .map_err(|e| ConfigError::Validation(format!("invalid reserved patterns: {}", e)))?;

        Ok(Self {
            resource_root: resource_root.into(),
            reserved,
        })
    }

    /// A filter that admits everything
    pub fn permissive() -> Self {
        Self {
            resource_root: ScopePath::new(""),
            reserved: GlobSet::empty(),
        }
    }

    pub fn resource_root(&self) -> &ScopePath {
        &self.resource_root
    }

    /// Returns the reason `path` must not be dispatched, or `None` to admit it
    ///
    /// `path` must already use forward slashes.
    pub fn rejection(&self, path: &str) -> Option<FilterReason> {
        if !self.resource_root.contains(path) {
            return Some(FilterReason::OutsideResourceRoot);
        }
        let file_name = path.rsplit('/').next().unwrap_or(path);
        if self.reserved.is_match(file_name) {
            return Some(FilterReason::ReservedFileName);
        }
        None
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::permissive()
    }
}
