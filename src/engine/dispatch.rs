#![forbid(unsafe_code)]

//! Dispatch engine
//!
//! For one event the engine:
//! - Filters paths outside the resource root or naming reserved files
//! - Derives the asset type from the path when the event does not carry one
//! - Runs the check stage: global rules, then local scopes outer to inner,
//!   stopping at the first failed check
//! - Runs the process stage only if every check passed, running every
//!   processor and reporting failures without stopping

use crate::classify::AssetTypeClassifier;
use crate::engine::batch::EventBatch;
use crate::engine::diagnostics::{Decision, Diagnostics, StageState};
use crate::engine::filter::{EventFilter, FilterReason};
use crate::index::{ResolvedRule, ScopeIndex};
use crate::rules::{AssetContext, Handler, HandlerKind, ImportSettings};
use crate::types::{AssetType, PipelineStage, canonical_path};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// An inbound file-change notification
#[derive(Debug, Clone, PartialEq)]
pub struct AssetEvent {
    /// Asset path relative to the project root
    pub path: String,
    pub stage: PipelineStage,
    /// Concrete type, derived from the path when absent
    pub asset_type: Option<AssetType>,
    pub is_dir: bool,
    /// Size in bytes, looked up under the project root when absent
    pub file_size: Option<u64>,
    /// Importer handle; only import stages hand it to processors
    pub settings: Option<ImportSettings>,
}

impl AssetEvent {
    pub fn new(path: impl Into<String>, stage: PipelineStage) -> Self {
        Self {
            path: path.into(),
            stage,
            asset_type: None,
            is_dir: false,
            file_size: None,
            settings: None,
        }
    }

    pub fn with_type(mut self, asset_type: AssetType) -> Self {
        self.asset_type = Some(asset_type);
        self
    }

    pub fn directory(mut self) -> Self {
        self.is_dir = true;
        self
    }

    pub fn with_file_size(mut self, size: u64) -> Self {
        self.file_size = Some(size);
        self
    }

    pub fn with_settings(mut self, settings: ImportSettings) -> Self {
        self.settings = Some(settings);
        self
    }
}

/// The check that blocked a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckFailure {
    pub location: String,
    pub id: String,
    /// Handler error, when the check failed by erroring rather than returning false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a check stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub state: StageState,
    pub checks_run: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<CheckFailure>,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.blocked_by.is_none()
    }
}

/// A processor that reported a failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessFailure {
    pub location: String,
    pub error: String,
}

/// Result of a process stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    pub processors_run: usize,
    pub failures: Vec<ProcessFailure>,
}

impl ProcessReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of dispatching one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Filtered {
        reason: FilterReason,
    },
    Blocked {
        asset_type: AssetType,
        check: CheckOutcome,
    },
    Completed {
        asset_type: AssetType,
        check: CheckOutcome,
        process: ProcessReport,
    },
}

impl DispatchOutcome {
    pub fn is_blocked(&self) -> bool {
        matches!(self, DispatchOutcome::Blocked { .. })
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, DispatchOutcome::Filtered { .. })
    }
}

enum Verdict {
    Pass,
    Skip,
    Block(CheckFailure),
}

/// Resolves and runs the rules that apply to an event
#[derive(Debug)]
pub struct DispatchEngine {
    index: ScopeIndex,
    filter: EventFilter,
    classifier: AssetTypeClassifier,
    diagnostics: Diagnostics,
    project_root: Option<PathBuf>,
}

impl DispatchEngine {
    /// Creates an engine with a permissive filter and diagnostics off
    pub fn new(index: ScopeIndex) -> Self {
        Self {
            index,
            filter: EventFilter::permissive(),
            classifier: AssetTypeClassifier::new(),
            diagnostics: Diagnostics::disabled(),
            project_root: None,
        }
    }

    pub fn with_filter(mut self, filter: EventFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Directory that event paths are relative to, used for file-size lookup
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    pub fn index(&self) -> &ScopeIndex {
        &self.index
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Swaps in a freshly built index
    ///
    /// Takes `&mut self`, so it cannot happen while a batch borrows the engine.
    pub fn rebuild(&mut self, index: ScopeIndex) {
        tracing::debug!(rules = index.rule_count(), "rebuilding dispatch index");
        self.index = index;
    }

    /// Opens a batch of events; the index stays fixed until the batch ends
    pub fn begin_batch(&self) -> EventBatch<'_> {
        EventBatch::new(self)
    }

    /// Runs the check stage for a path; `false` means the stage is blocked
    ///
    /// A mask that is not a single concrete type is replaced by the type
    /// derived from the path.
    pub fn run_check_stage(&self, path: &str, asset_type: AssetType, stage: PipelineStage) -> bool {
        let path = canonical_path(path);
        let ctx = AssetContext {
            path: &path,
            asset_type: self.concrete_type(&path, asset_type, None),
            stage,
            file_size: self.file_size(&path),
        };
        self.check_stage(&ctx).passed()
    }

    /// Runs every matching processor for a path
    ///
    /// Non-concrete masks are resolved the same way as in
    /// [`DispatchEngine::run_check_stage`].
    pub fn run_process_stage(
        &self,
        path: &str,
        asset_type: AssetType,
        stage: PipelineStage,
        settings: Option<&mut ImportSettings>,
    ) -> ProcessReport {
        let path = canonical_path(path);
        let ctx = AssetContext {
            path: &path,
            asset_type: self.concrete_type(&path, asset_type, None),
            stage,
            file_size: self.file_size(&path),
        };
        self.process_stage(&ctx, settings)
    }

    /// Filters, classifies, checks, then processes one event
    ///
    /// Processors may update `event.settings`.
    pub fn dispatch(&self, event: &mut AssetEvent) -> DispatchOutcome {
        let path = canonical_path(&event.path);

        if let Some(reason) = self.filter.rejection(&path) {
            self.diagnostics.emit(|| Decision::Filtered {
                path: path.clone(),
                reason: reason.clone(),
            });
            return DispatchOutcome::Filtered { reason };
        }

        // Move and delete have no importer, so the path alone decides the type
        let asset_type = match event.asset_type {
            Some(asset_type) if event.stage.is_import() => {
                self.concrete_type(&path, asset_type, Some(event.is_dir))
            }
            _ => self.classifier.classify(&path, event.is_dir),
        };

        let ctx = AssetContext {
            path: &path,
            asset_type,
            stage: event.stage,
            file_size: event.file_size.or_else(|| self.file_size(&path)),
        };

        let check = self.check_stage(&ctx);
        if !check.passed() {
            return DispatchOutcome::Blocked { asset_type, check };
        }

        let settings = if event.stage.is_import() {
            event.settings.as_mut()
        } else {
            None
        };
        let process = self.process_stage(&ctx, settings);

        DispatchOutcome::Completed {
            asset_type,
            check,
            process,
        }
    }

    /// Check stage state machine
    pub fn check_stage(&self, ctx: &AssetContext) -> CheckOutcome {
        let mut checks_run = 0;
        let mut state = StageState::NotStarted;

        self.transition(ctx.stage, &mut state, StageState::GlobalRunning);
        for rule in self.global_rules(ctx) {
            if let Some(outcome) = self.apply_check(rule, ctx, &mut state, &mut checks_run) {
                return outcome;
            }
        }

        self.transition(ctx.stage, &mut state, StageState::LocalRunning);
        for rule in self.local_rules(ctx) {
            if let Some(outcome) = self.apply_check(rule, ctx, &mut state, &mut checks_run) {
                return outcome;
            }
        }

        self.transition(ctx.stage, &mut state, StageState::Done);
        CheckOutcome {
            state,
            checks_run,
            blocked_by: None,
        }
    }

    /// Process stage; never stops early
    pub fn process_stage(
        &self,
        ctx: &AssetContext,
        mut settings: Option<&mut ImportSettings>,
    ) -> ProcessReport {
        let mut report = ProcessReport::default();
        let rules = self
            .global_rules(ctx)
            .into_iter()
            .chain(self.local_rules(ctx));

        for rule in rules {
            let Handler::Processor(processor) = &*rule.handler else {
                self.skip(rule, HandlerKind::Checker);
                continue;
            };
            self.diagnostics.emit(|| Decision::RuleMatched {
                location: rule.location.clone(),
            });
            report.processors_run += 1;

            if let Err(e) = processor.process(ctx, settings.as_deref_mut()) {
                tracing::warn!(location = %rule.location, error = %e, "processor failed");
                self.diagnostics.emit(|| Decision::HandlerFailed {
                    location: rule.location.clone(),
                    error: e.to_string(),
                });
                report.failures.push(ProcessFailure {
                    location: rule.location.clone(),
                    error: e.to_string(),
                });
            }
        }

        report
    }

    fn apply_check(
        &self,
        rule: &ResolvedRule,
        ctx: &AssetContext,
        state: &mut StageState,
        checks_run: &mut usize,
    ) -> Option<CheckOutcome> {
        let Verdict::Block(failure) = self.run_check(rule, ctx, checks_run) else {
            return None;
        };
        self.diagnostics.emit(|| Decision::StageAborted {
            stage: ctx.stage,
            location: failure.location.clone(),
        });
        self.transition(ctx.stage, state, StageState::Aborted);
        Some(CheckOutcome {
            state: *state,
            checks_run: *checks_run,
            blocked_by: Some(failure),
        })
    }

    fn run_check(&self, rule: &ResolvedRule, ctx: &AssetContext, checks_run: &mut usize) -> Verdict {
        let Handler::Checker(checker) = &*rule.handler else {
            self.skip(rule, HandlerKind::Processor);
            return Verdict::Skip;
        };
        self.diagnostics.emit(|| Decision::RuleMatched {
            location: rule.location.clone(),
        });
        *checks_run += 1;

        let failure = |error: Option<String>| CheckFailure {
            location: rule.location.clone(),
            id: rule.id().to_string(),
            error,
        };

        match checker.check(ctx) {
            Ok(true) => Verdict::Pass,
            Ok(false) => {
                tracing::debug!(location = %rule.location, path = ctx.path, "check failed");
                Verdict::Block(failure(None))
            }
            Err(e) => {
                tracing::warn!(location = %rule.location, error = %e, "checker failed");
                self.diagnostics.emit(|| Decision::HandlerFailed {
                    location: rule.location.clone(),
                    error: e.to_string(),
                });
                Verdict::Block(failure(Some(e.to_string())))
            }
        }
    }

    /// Global rules for the context, minus blacklisted ones
    fn global_rules(&self, ctx: &AssetContext) -> Vec<&ResolvedRule> {
        self.index
            .global_rules_for(ctx.stage, ctx.asset_type)
            .iter()
            .map(Arc::as_ref)
            .filter(|rule| !self.blacklisted(rule, ctx.path))
            .collect()
    }

    /// Local rules for the context, outer scopes first, minus blacklisted ones
    fn local_rules(&self, ctx: &AssetContext) -> Vec<&ResolvedRule> {
        self.index
            .local_scopes_for(ctx.path)
            .into_iter()
            .flat_map(|scope| scope.rules_for(ctx.stage, ctx.asset_type))
            .map(Arc::as_ref)
            .filter(|rule| !self.blacklisted(rule, ctx.path))
            .collect()
    }

    fn blacklisted(&self, rule: &ResolvedRule, path: &str) -> bool {
        let Some(prefix) = rule.spec.blacklisted_by(path) else {
            return false;
        };
        self.diagnostics.emit(|| Decision::RuleBlacklisted {
            location: rule.location.clone(),
            prefix: prefix.to_string(),
        });
        true
    }

    fn skip(&self, rule: &ResolvedRule, kind: HandlerKind) {
        self.diagnostics.emit(|| Decision::RuleSkipped {
            location: rule.location.clone(),
            kind,
        });
    }

    fn transition(&self, stage: PipelineStage, state: &mut StageState, next: StageState) {
        *state = next;
        self.diagnostics.emit(|| Decision::StateChanged { stage, state: next });
    }

    /// Both tiers resolve against a single type bit, so masks such as
    /// `ALL` fall back to the path. `is_dir` of `None` asks the file system.
    fn concrete_type(&self, path: &str, asset_type: AssetType, is_dir: Option<bool>) -> AssetType {
        if asset_type.is_concrete() {
            return asset_type;
        }
        let is_dir = is_dir.unwrap_or_else(|| self.is_dir(path));
        let derived = self.classifier.classify(path, is_dir);
        tracing::debug!(path, given = %asset_type, derived = %derived, "type is not concrete, classifying from path");
        derived
    }

    fn is_dir(&self, path: &str) -> bool {
        match &self.project_root {
            Some(root) => root.join(path).is_dir(),
            None => std::path::Path::new(path).is_dir(),
        }
    }

    fn file_size(&self, path: &str) -> Option<u64> {
        let root = self.project_root.as_ref()?;
        std::fs::metadata(root.join(path))
            .ok()
            .filter(|meta| meta.is_file())
            .map(|meta| meta.len())
    }
}
