#![forbid(unsafe_code)]

//! JSONL output formatter for machine-readable output
//!
//! Every line is one JSON object carrying a `type` field. Record order
//! follows the order of the input, which is already deterministic.

use crate::output::{ClassifiedPath, RunReport, ScopeListing};
use serde::Serialize;
use serde_json::Value;

/// JSONL output formatter
pub struct JsonlFormatter;

impl JsonlFormatter {
    /// Creates a new JsonlFormatter
    pub fn new() -> Self {
        JsonlFormatter
    }

    /// One `classification` record per path
    pub fn format_classifications(&self, paths: &[ClassifiedPath]) -> String {
        let mut output = String::new();
        for path in paths {
            push_record(&mut output, "classification", path);
        }
        output
    }

    /// Per scope: one `scope` record followed by its `rule` records
    pub fn format_listing(&self, listing: &[ScopeListing]) -> String {
        let mut output = String::new();
        for scope in listing {
            push_record(
                &mut output,
                "scope",
                &ScopeRecord {
                    scope: &scope.scope,
                    rules: scope.rules.len(),
                },
            );
            for row in &scope.rules {
                let mut record = to_object(row);
                if let Value::Object(map) = &mut record {
                    map.insert("scope".to_string(), Value::from(scope.scope.as_str()));
                }
                push_record(&mut output, "rule", &record);
            }
        }
        output
    }

    /// Resolution errors, then decisions, then one `outcome` record
    pub fn format_run(&self, report: &RunReport) -> String {
        let mut output = String::new();

        for error in report.resolution_errors {
            push_record(
                &mut output,
                "resolution_error",
                &MessageRecord {
                    message: error.to_string(),
                },
            );
        }

        for decision in report.decisions {
            push_record(&mut output, "decision", decision);
        }

        let mut outcome = to_object(report.outcome);
        if let Value::Object(map) = &mut outcome {
            map.insert("path".to_string(), Value::from(report.path));
            map.insert("stage".to_string(), Value::from(report.stage.as_str()));
            if let Some(settings) = report.settings {
                map.insert("settings".to_string(), to_object(settings));
            }
        }
        push_record(&mut output, "outcome", &outcome);

        output
    }
}

impl Default for JsonlFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
struct ScopeRecord<'a> {
    scope: &'a str,
    rules: usize,
}

#[derive(Debug, Serialize)]
struct MessageRecord {
    message: String,
}

fn to_object<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Appends `value` as one line, tagged with `type`
fn push_record<T: Serialize + ?Sized>(output: &mut String, record_type: &str, value: &T) {
    let mut record = to_object(value);
    let Value::Object(map) = &mut record else {
        return;
    };
    map.insert("type".to_string(), Value::from(record_type));
    if let Ok(json) = serde_json::to_string(&record) {
        output.push_str(&json);
        output.push('\n');
    }
}
