#![forbid(unsafe_code)]

//! Rule data model, handler traits, and the handler registry

pub mod builtin;
pub mod registry;
mod rule;

// Re-export core types
pub use registry::{HandlerConstructor, HandlerRegistry, overlay};
pub use rule::{
    AssetContext, Checker, Handler, HandlerKind, ImportSettings, Processor, RuleSpec,
};
