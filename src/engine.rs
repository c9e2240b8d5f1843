//! Event filtering, rule dispatch, batching and diagnostics

pub mod batch;
pub mod diagnostics;
pub mod dispatch;
pub mod filter;

pub use batch::{BatchReport, EventBatch};
pub use diagnostics::{
    Decision, DiagnosticSink, Diagnostics, NoopSink, RecordingSink, StageState, TracingSink,
};
pub use dispatch::{
    AssetEvent, CheckFailure, CheckOutcome, DispatchEngine, DispatchOutcome, ProcessFailure,
    ProcessReport,
};
pub use filter::{EventFilter, FilterReason};
