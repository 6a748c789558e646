use crate::error::{FlowError, FlowResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Longest subject the notification topic accepts
const MAX_SUBJECT_CHARS: usize = 100;

/// What operators are told when a workflow step fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FailureNotification {
    pub workflow_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    pub error_kind: String,
    pub message: String,
}

impl FailureNotification {
    pub fn new(workflow_name: &str, job_name: Option<&str>, error: &FlowError) -> Self {
        Self {
            workflow_name: workflow_name.to_string(),
            job_name: job_name.map(str::to_string),
            error_kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }

    pub fn subject(&self) -> String {
        let subject = match &self.job_name {
            Some(job_name) => format!("Replication job {job_name} failed in {}", self.workflow_name),
            None => format!("Replication workflow {} failed", self.workflow_name),
        };
        subject.chars().take(MAX_SUBJECT_CHARS).collect()
    }
}

/// Delivers failure notifications to operators
#[async_trait]
pub trait FailureNotifier: Send + Sync {
    async fn notify(&self, notification: &FailureNotification) -> FlowResult<()>;
}

/// Keeps every notification it is handed
#[derive(Debug, Default)]
pub struct InMemoryFailureNotifier {
    sent: Mutex<Vec<FailureNotification>>,
}

impl InMemoryFailureNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<FailureNotification> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl FailureNotifier for InMemoryFailureNotifier {
    async fn notify(&self, notification: &FailureNotification) -> FlowResult<()> {
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}
