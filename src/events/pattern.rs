//! # Event Patterns
//!
//! The subset of bus pattern matching the choreography relies on: objects recurse
//! field by field, arrays list the allowed values, and every pattern field must be
//! present in the event.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventPattern(Value);

impl EventPattern {
    pub fn new(pattern: Value) -> Self {
        Self(pattern)
    }

    /// Successful completion of `workflow_name` for `job_name`.
    ///
    /// Filtering on `WorkflowOutput.JobName` keeps chains of different jobs that share
    /// a bus and workflow names from triggering each other.
    pub fn workflow_succeeded(source: &str, workflow_name: &str, job_name: &str) -> Self {
        Self(json!({
            "source": [source],
            "detail": {
                "WorkflowName": [workflow_name],
                "WorkflowStatus": ["SUCCEEDED"],
                "WorkflowOutput": {
                    "JobName": [job_name]
                }
            }
        }))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn to_json_string(&self) -> String {
        self.0.to_string()
    }

    pub fn matches(&self, document: &Value) -> bool {
        matches_value(&self.0, document)
    }
}

fn matches_value(pattern: &Value, document: &Value) -> bool {
    match pattern {
        Value::Object(fields) => {
            let Value::Object(document_fields) = document else {
                return false;
            };
            fields.iter().all(|(key, field_pattern)| {
                document_fields
                    .get(key)
                    .is_some_and(|field| matches_value(field_pattern, field))
            })
        }
        Value::Array(allowed) => match document {
            Value::Array(items) => items.iter().any(|item| allowed.contains(item)),
            scalar => allowed.contains(scalar),
        },
        exact => exact == document,
    }
}
