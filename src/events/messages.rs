//! # Event Messages
//!
//! The only medium of inter-step communication. A trigger message starts a step; a
//! finish message is what a step publishes when it succeeds, and its
//! `WorkflowOutput` becomes the next step's trigger message verbatim.

use crate::config::JobRegistry;
use crate::error::{FlowError, FlowResult};
use crate::models::JobConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Input that starts a workflow step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TriggerMessage {
    pub job_name: String,
    pub instance_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_config: Option<JobConfig>,
    /// Anything a previous step added (e.g. `TaskDetails`), carried along untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TriggerMessage {
    /// Fixed payload of a schedule-triggered step
    pub fn new(job_name: impl Into<String>, instance_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            instance_name: instance_name.into(),
            job_config: None,
            extra: Map::new(),
        }
    }

    pub fn with_job_config(mut self, job_config: JobConfig) -> Self {
        self.job_config = Some(job_config);
        self
    }

    pub fn from_value(value: Value) -> FlowResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| FlowError::invalid_input(format!("Malformed trigger message: {e}")))
    }

    /// Job definition carried in the message, or looked up by name when a
    /// schedule or an earlier step did not include it.
    pub fn resolve_job_config(&self, registry: &JobRegistry) -> FlowResult<JobConfig> {
        match &self.job_config {
            Some(job_config) => Ok(job_config.clone()),
            None => registry.job(&self.job_name).cloned(),
        }
    }

    pub fn to_value(&self) -> FlowResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Terminal status of a workflow execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Succeeded,
    Failed,
    TimedOut,
    Aborted,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::TimedOut => "TIMED_OUT",
            Self::Aborted => "ABORTED",
        }
    }
}

/// Payload a workflow publishes on completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FinishMessage {
    pub workflow_name: String,
    pub workflow_status: WorkflowStatus,
    pub workflow_output: Value,
}

impl FinishMessage {
    pub fn succeeded(workflow_name: impl Into<String>, workflow_output: Value) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            workflow_status: WorkflowStatus::Succeeded,
            workflow_output,
        }
    }

    /// Routing key: chains only react to finish events of their own job
    pub fn job_name(&self) -> Option<&str> {
        self.workflow_output.get("JobName").and_then(Value::as_str)
    }
}

/// Envelope of everything put on the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    pub id: Uuid,
    pub source: String,
    pub detail_type: String,
    pub event_bus_name: String,
    pub time: DateTime<Utc>,
    pub detail: Value,
}

impl BusEvent {
    pub fn new(
        event_bus_name: impl Into<String>,
        source: impl Into<String>,
        detail_type: impl Into<String>,
        detail: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            detail_type: detail_type.into(),
            event_bus_name: event_bus_name.into(),
            time: Utc::now(),
            detail,
        }
    }

    /// Document rule patterns and target event paths are evaluated against
    pub fn as_document(&self) -> Value {
        json!({
            "id": self.id.to_string(),
            "source": self.source,
            "detail-type": self.detail_type,
            "time": self.time.to_rfc3339(),
            "detail": self.detail,
        })
    }
}
