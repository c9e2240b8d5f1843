#![forbid(unsafe_code)]

//! Toggleable diagnostics channel for dispatch decisions

use crate::engine::filter::FilterReason;
use crate::rules::HandlerKind;
use crate::types::PipelineStage;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Per-stage dispatch state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageState {
    NotStarted,
    GlobalRunning,
    LocalRunning,
    Done,
    Aborted,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageState::NotStarted => "not-started",
            StageState::GlobalRunning => "global-running",
            StageState::LocalRunning => "local-running",
            StageState::Done => "done",
            StageState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// One observable dispatch decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// The event never entered dispatch
    Filtered { path: String, reason: FilterReason },
    /// The stage moved to a new state
    StateChanged {
        stage: PipelineStage,
        state: StageState,
    },
    /// A rule's handler is about to run
    RuleMatched { location: String },
    /// A rule matched but its handler kind does not run in this phase
    RuleSkipped { location: String, kind: HandlerKind },
    /// A rule was suppressed by one of its blacklist prefixes
    RuleBlacklisted { location: String, prefix: String },
    /// A handler reported an internal failure
    HandlerFailed { location: String, error: String },
    /// A check failed and the rest of the stage was abandoned
    StageAborted {
        stage: PipelineStage,
        location: String,
    },
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Filtered { path, reason } => write!(f, "filtered {}: {}", path, reason),
            Decision::StateChanged { stage, state } => write!(f, "{} -> {}", stage, state),
            Decision::RuleMatched { location } => write!(f, "run {}", location),
            Decision::RuleSkipped { location, kind } => {
                write!(f, "skip {} ({} not run in this phase)", location, kind)
            }
            Decision::RuleBlacklisted { location, prefix } => {
                write!(f, "blacklisted {} under {}", location, prefix)
            }
            Decision::HandlerFailed { location, error } => {
                write!(f, "failed {}: {}", location, error)
            }
            Decision::StageAborted { stage, location } => {
                write!(f, "{} aborted by {}", stage, location)
            }
        }
    }
}

/// Receiver for dispatch decisions
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, decision: &Decision);
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn record(&self, _decision: &Decision) {}
}

/// Forwards decisions to `tracing` at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, decision: &Decision) {
        tracing::debug!(target: "assetgate::dispatch", "{}", decision);
    }
}

/// Keeps every decision in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    decisions: Mutex<Vec<Decision>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn decisions(&self) -> Vec<Decision> {
        self.decisions
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    /// Drains the recorded decisions
    pub fn take(&self) -> Vec<Decision> {
        self.decisions
            .lock()
            .map(|mut d| std::mem::take(&mut *d))
            .unwrap_or_default()
    }
}

impl DiagnosticSink for RecordingSink {
    fn record(&self, decision: &Decision) {
        if let Ok(mut decisions) = self.decisions.lock() {
            decisions.push(decision.clone());
        }
    }
}

/// A sink plus an on/off switch
///
/// Decisions are built lazily, so a disabled channel costs one branch.
#[derive(Clone)]
pub struct Diagnostics {
    enabled: bool,
    sink: Arc<dyn DiagnosticSink>,
}

impl Diagnostics {
    /// An enabled channel writing to `sink`
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            enabled: true,
            sink,
        }
    }

    /// A disabled channel
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            sink: Arc::new(NoopSink),
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn emit(&self, decision: impl FnOnce() -> Decision) {
        if self.enabled {
            self.sink.record(&decision());
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::disabled()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("enabled", &self.enabled)
            .finish()
    }
}
