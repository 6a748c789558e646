use super::step_handler::StepHandler;
use crate::error::FlowError;
use crate::events::FinishEventPublisher;
use crate::logging::{log_error, log_step_operation};
use crate::services::{FailureNotification, FailureNotifier};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Succeeded { output: Value, finish_event_id: Uuid },
    Failed { kind: String, message: String },
}

/// One workflow run as the runner would report it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRecord {
    pub workflow_name: String,
    pub job_name: Option<String>,
    pub input: Value,
    pub outcome: ExecutionOutcome,
}

impl ExecutionRecord {
    pub fn failed(workflow_name: &str, input: Value, error: &FlowError) -> Self {
        Self {
            workflow_name: workflow_name.to_string(),
            job_name: job_name_of(&input),
            input,
            outcome: ExecutionOutcome::Failed {
                kind: error.kind().to_string(),
                message: error.to_string(),
            },
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, ExecutionOutcome::Succeeded { .. })
    }

    pub fn output(&self) -> Option<&Value> {
        match &self.outcome {
            ExecutionOutcome::Succeeded { output, .. } => Some(output),
            ExecutionOutcome::Failed { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<&str> {
        match &self.outcome {
            ExecutionOutcome::Failed { kind, .. } => Some(kind),
            ExecutionOutcome::Succeeded { .. } => None,
        }
    }
}

fn job_name_of(input: &Value) -> Option<String> {
    input.get("JobName").and_then(Value::as_str).map(str::to_string)
}

/// Runs a step handler and, only when it succeeds, publishes its finish event.
///
/// A failed run publishes nothing, so the chain halts at the failed step. It is
/// reported to the failure notifier instead, when one is attached.
#[derive(Clone)]
pub struct WorkflowExecutor {
    handler: Arc<dyn StepHandler>,
    publisher: FinishEventPublisher,
    notifier: Option<Arc<dyn FailureNotifier>>,
}

impl WorkflowExecutor {
    pub fn new(handler: Arc<dyn StepHandler>, publisher: FinishEventPublisher) -> Self {
        Self {
            handler,
            publisher,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn FailureNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn workflow_name(&self) -> &str {
        self.handler.name()
    }

    #[instrument(skip(self, input), fields(workflow_name = %self.handler.name()))]
    pub async fn execute(&self, input: Value) -> ExecutionRecord {
        let workflow_name = self.handler.name().to_string();
        let job_name = job_name_of(&input);
        log_step_operation("execute", &workflow_name, job_name.as_deref(), "started", None);

        let result = match self.handler.handle(input.clone()).await {
            Ok(output) => self
                .publisher
                .publish_succeeded(&workflow_name, output.clone())
                .await
                .map(|event| (output, event.id)),
            Err(error) => Err(error),
        };

        match result {
            Ok((output, finish_event_id)) => {
                log_step_operation("execute", &workflow_name, job_name.as_deref(), "succeeded", None);
                ExecutionRecord {
                    workflow_name,
                    job_name,
                    input,
                    outcome: ExecutionOutcome::Succeeded {
                        output,
                        finish_event_id,
                    },
                }
            }
            Err(error) => {
                log_error(
                    "workflow_executor",
                    &workflow_name,
                    &error.to_string(),
                    Some(error.kind()),
                );
                self.notify_failure(&workflow_name, job_name.as_deref(), &error)
                    .await;
                ExecutionRecord::failed(&workflow_name, input, &error)
            }
        }
    }

    /// A notification that cannot be delivered is logged; the step failure stands
    async fn notify_failure(&self, workflow_name: &str, job_name: Option<&str>, error: &FlowError) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let notification = FailureNotification::new(workflow_name, job_name, error);
        if let Err(notify_error) = notifier.notify(&notification).await {
            log_error(
                "failure_notifier",
                workflow_name,
                &notify_error.to_string(),
                Some(notify_error.kind()),
            );
        }
    }
}

impl std::fmt::Debug for WorkflowExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowExecutor")
            .field("workflow_name", &self.handler.name())
            .field("publisher", &self.publisher)
            .field("notifies", &self.notifier.is_some())
            .finish()
    }
}
