#![forbid(unsafe_code)]

//! Event batches
//!
//! A batch holds a shared borrow of the engine from `begin_batch` to `end`,
//! so the index cannot be rebuilt while events of one filesystem transaction
//! are being dispatched.

use crate::engine::dispatch::{AssetEvent, DispatchEngine, DispatchOutcome};
use serde::Serialize;

/// Tallies for one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub events: usize,
    pub filtered: usize,
    pub blocked: usize,
    pub completed: usize,
    pub processor_failures: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: &DispatchOutcome) {
        self.events += 1;
        match outcome {
            DispatchOutcome::Filtered { .. } => self.filtered += 1,
            DispatchOutcome::Blocked { .. } => self.blocked += 1,
            DispatchOutcome::Completed { process, .. } => {
                self.completed += 1;
                self.processor_failures += process.failures.len();
            }
        }
    }
}

/// An open batch of events
#[derive(Debug)]
pub struct EventBatch<'a> {
    engine: &'a DispatchEngine,
    report: BatchReport,
}

impl<'a> EventBatch<'a> {
    pub(crate) fn new(engine: &'a DispatchEngine) -> Self {
        tracing::debug!("batch started");
        Self {
            engine,
            report: BatchReport::default(),
        }
    }

    /// Dispatches one event of the batch
    pub fn dispatch(&mut self, event: &mut AssetEvent) -> DispatchOutcome {
        let outcome = self.engine.dispatch(event);
        self.report.record(&outcome);
        outcome
    }

    /// Running tallies
    pub fn report(&self) -> &BatchReport {
        &self.report
    }

    /// Closes the batch, releasing the engine
    pub fn end(self) -> BatchReport {
        tracing::debug!(
            events = self.report.events,
            blocked = self.report.blocked,
            "batch ended"
        );
        self.report
    }
}
