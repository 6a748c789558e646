use super::completion::CompletionPoller;
use crate::error::FlowResult;
use crate::models::{ReplicationInstance, ReplicationTask};
use crate::services::ReplicationService;
use std::sync::Arc;
use tracing::{info, instrument};

/// Final steps of a chain: the task goes first, then the instance it ran on.
///
/// The replication service deletes asynchronously; each delete returns only once
/// the resource is no longer described.
pub struct Teardown {
    replication: Arc<dyn ReplicationService>,
    poller: CompletionPoller,
}

impl Teardown {
    pub fn new(replication: Arc<dyn ReplicationService>, poller: CompletionPoller) -> Self {
        Self {
            replication,
            poller,
        }
    }

    /// Delete the task whose identifier is the job name
    #[instrument(skip(self))]
    pub async fn delete_task(&self, job_name: &str) -> FlowResult<ReplicationTask> {
        let task = self.replication.require_task_by_identifier(job_name).await?;
        let deleted = self
            .replication
            .delete_task(&task.replication_task_arn)
            .await?;
        self.poller
            .wait_for_task_deleted(self.replication.as_ref(), &task.replication_task_arn)
            .await?;
        info!(task_arn = %deleted.replication_task_arn, status = %deleted.status, "Replication task deleted");
        Ok(deleted)
    }

    #[instrument(skip(self))]
    pub async fn delete_instance(&self, instance_name: &str) -> FlowResult<ReplicationInstance> {
        let instance = self.replication.require_instance(instance_name).await?;
        let deleted = self
            .replication
            .delete_instance(&instance.replication_instance_arn)
            .await?;
        self.poller
            .wait_for_instance_deleted(self.replication.as_ref(), instance_name)
            .await?;
        info!(instance_arn = %deleted.replication_instance_arn, "Replication instance deleted");
        Ok(deleted)
    }
}

impl std::fmt::Debug for Teardown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Teardown")
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}
