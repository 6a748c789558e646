//! Polling of long-running replication service operations.
//!
//! The workflow runner owns waiting in a deployed system; these pollers are what
//! the in-process step implementations use instead.

use crate::config::TaskConfig;
use crate::constants::instance_status;
use crate::error::{FlowError, FlowResult};
use crate::models::{ReplicationInstance, ReplicationTask};
use crate::services::ReplicationService;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionPoller {
    interval: Duration,
    max_polls: u32,
}

impl CompletionPoller {
    pub fn new(interval: Duration, max_polls: u32) -> Self {
        Self {
            interval,
            max_polls: max_polls.max(1),
        }
    }

    pub fn from_config(config: &TaskConfig) -> Self {
        Self::new(config.completion_poll_interval(), config.completion_max_polls)
    }

    /// Wait until the task stops. A task that fails, or is still running after the
    /// last poll, is an `ExternalService` error.
    pub async fn wait_for_task_stop(
        &self,
        replication: &dyn ReplicationService,
        task_arn: &str,
    ) -> FlowResult<ReplicationTask> {
        for attempt in 1..=self.max_polls {
            let task = replication.require_task_by_arn(task_arn).await?;
            if task.is_failed() {
                return Err(FlowError::external(
                    "replication service",
                    "wait_for_task",
                    format!(
                        "Task {task_arn} failed: {}",
                        task.stop_reason.as_deref().unwrap_or("no stop reason")
                    ),
                ));
            }
            if task.is_stopped() {
                return Ok(task);
            }

            debug!(task_arn = %task_arn, status = %task.status, attempt, "Task still running");
            self.pause(attempt).await;
        }

        Err(self.exhausted("wait_for_task", task_arn))
    }

    /// Wait until the instance reports `available`
    pub async fn wait_for_instance_available(
        &self,
        replication: &dyn ReplicationService,
        instance_identifier: &str,
    ) -> FlowResult<ReplicationInstance> {
        for attempt in 1..=self.max_polls {
            let instance = replication.require_instance(instance_identifier).await?;
            if instance.replication_instance_status.as_deref() == Some(instance_status::AVAILABLE) {
                return Ok(instance);
            }

            debug!(
                instance = %instance_identifier,
                status = ?instance.replication_instance_status,
                attempt,
                "Instance not available yet"
            );
            self.pause(attempt).await;
        }

        Err(self.exhausted("wait_for_instance", instance_identifier))
    }

    /// Wait until the task is no longer described
    pub async fn wait_for_task_deleted(
        &self,
        replication: &dyn ReplicationService,
        task_arn: &str,
    ) -> FlowResult<()> {
        for attempt in 1..=self.max_polls {
            let Some(task) = replication.describe_task_by_arn(task_arn).await? else {
                return Ok(());
            };

            debug!(task_arn = %task_arn, status = %task.status, attempt, "Task not deleted yet");
            self.pause(attempt).await;
        }

        Err(self.exhausted("wait_for_task_deleted", task_arn))
    }

    /// Wait until no instance carries the identifier any more
    pub async fn wait_for_instance_deleted(
        &self,
        replication: &dyn ReplicationService,
        instance_identifier: &str,
    ) -> FlowResult<()> {
        for attempt in 1..=self.max_polls {
            let Some(instance) = replication.describe_instance(instance_identifier).await? else {
                return Ok(());
            };

            debug!(
                instance = %instance_identifier,
                status = ?instance.replication_instance_status,
                attempt,
                "Instance not deleted yet"
            );
            self.pause(attempt).await;
        }

        Err(self.exhausted("wait_for_instance_deleted", instance_identifier))
    }

    async fn pause(&self, attempt: u32) {
        if attempt < self.max_polls && !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
    }

    fn exhausted(&self, operation: &str, identifier: &str) -> FlowError {
        FlowError::external(
            "replication service",
            operation,
            format!("{identifier} did not settle after {} polls", self.max_polls),
        )
    }
}
