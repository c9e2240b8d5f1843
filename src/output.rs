//! Output formatters (human and JSONL)

pub mod human;
pub mod jsonl;

pub use human::{HumanFormatter, color_choice};
pub use jsonl::JsonlFormatter;

use crate::catalog::{RuleCatalog, ScopeRef};
use crate::classify::Classification;
use crate::engine::{Decision, DispatchOutcome};
use crate::error::ResolutionError;
use crate::index::rule_location;
use crate::rules::{ImportSettings, RuleSpec};
use crate::types::PipelineStage;
use serde::Serialize;

/// A classified path, as printed by `assetgate classify`
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedPath {
    pub path: String,
    #[serde(flatten)]
    pub classification: Classification,
}

/// One scope of a catalog listing
#[derive(Debug, Clone, Serialize)]
pub struct ScopeListing<'a> {
    pub scope: String,
    pub rules: Vec<RuleRow<'a>>,
}

/// One rule of a catalog listing
#[derive(Debug, Clone, Serialize)]
pub struct RuleRow<'a> {
    /// Position within the scope's sorted list, as taken by `rule remove`
    pub index: usize,
    pub location: String,
    #[serde(flatten)]
    pub spec: &'a RuleSpec,
}

/// Global tier first, then every local scope in path order
pub fn catalog_listing(catalog: &RuleCatalog) -> Vec<ScopeListing<'_>> {
    let mut listing = Vec::with_capacity(catalog.scopes().len() + 1);
    listing.push(scope_listing(&ScopeRef::Global, catalog.global().rules()));
    for scope in catalog.scopes() {
        listing.push(scope_listing(
            &ScopeRef::Local(scope.path().clone()),
            scope.rules(),
        ));
    }
    listing
}

fn scope_listing<'a>(scope: &ScopeRef, rules: &'a [RuleSpec]) -> ScopeListing<'a> {
    ScopeListing {
        scope: scope.to_string(),
        rules: rules
            .iter()
            .enumerate()
            .map(|(index, spec)| RuleRow {
                index,
                location: rule_location(scope, spec),
                spec,
            })
            .collect(),
    }
}

/// Everything `assetgate run` reports for one event
#[derive(Debug, Clone)]
pub struct RunReport<'a> {
    pub path: &'a str,
    pub stage: PipelineStage,
    pub outcome: &'a DispatchOutcome,
    /// Recorded decisions, empty unless `--explain` was given
    pub decisions: &'a [Decision],
    /// Rules that could not be resolved when the engine was built
    pub resolution_errors: &'a [ResolutionError],
    /// Import settings after processors ran, for import stages
    pub settings: Option<&'a ImportSettings>,
}
