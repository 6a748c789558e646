//! # Replication Service Boundary
//!
//! The external replication service is a black box: it creates, starts, describes
//! and deletes tasks and instances. Lookups return `None` when nothing matches;
//! the `require_*` helpers turn a miss into [`FlowError::NotFound`].

use crate::error::{FlowError, FlowResult};
use crate::models::{
    CreateTaskRequest, Endpoint, InstanceConfig, ReplicationInstance, ReplicationTask,
    StartReplicationTaskType,
};
use async_trait::async_trait;

#[async_trait]
pub trait ReplicationService: Send + Sync {
    /// First instance whose identifier equals `instance_identifier`
    async fn describe_instance(
        &self,
        instance_identifier: &str,
    ) -> FlowResult<Option<ReplicationInstance>>;

    /// First endpoint whose identifier equals `endpoint_identifier`
    async fn describe_endpoint(&self, endpoint_identifier: &str) -> FlowResult<Option<Endpoint>>;

    /// Fails if a task with the same identifier already exists
    async fn create_task(&self, request: &CreateTaskRequest) -> FlowResult<ReplicationTask>;

    async fn start_task(
        &self,
        task_arn: &str,
        start_type: StartReplicationTaskType,
    ) -> FlowResult<ReplicationTask>;

    async fn describe_task_by_arn(&self, task_arn: &str) -> FlowResult<Option<ReplicationTask>>;

    async fn describe_task_by_identifier(
        &self,
        task_identifier: &str,
    ) -> FlowResult<Option<ReplicationTask>>;

    async fn delete_task(&self, task_arn: &str) -> FlowResult<ReplicationTask>;

    async fn create_instance(&self, instance: &InstanceConfig) -> FlowResult<ReplicationInstance>;

    async fn delete_instance(&self, instance_arn: &str) -> FlowResult<ReplicationInstance>;

    async fn require_instance(&self, instance_identifier: &str) -> FlowResult<ReplicationInstance> {
        self.describe_instance(instance_identifier)
            .await?
            .ok_or_else(|| FlowError::not_found("replication instance", instance_identifier))
    }

    async fn require_endpoint(&self, endpoint_identifier: &str) -> FlowResult<Endpoint> {
        self.describe_endpoint(endpoint_identifier)
            .await?
            .ok_or_else(|| FlowError::not_found("endpoint", endpoint_identifier))
    }

    async fn require_task_by_arn(&self, task_arn: &str) -> FlowResult<ReplicationTask> {
        self.describe_task_by_arn(task_arn)
            .await?
            .ok_or_else(|| FlowError::not_found("replication task", task_arn))
    }

    async fn require_task_by_identifier(&self, task_identifier: &str) -> FlowResult<ReplicationTask> {
        self.describe_task_by_identifier(task_identifier)
            .await?
            .ok_or_else(|| FlowError::not_found("replication task", task_identifier))
    }
}
