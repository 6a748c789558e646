//! # Workflow Steps
//!
//! Each step of a job chain is a workflow the runner starts by name with a trigger
//! message and whose output becomes the `WorkflowOutput` of its finish event. Steps
//! never call each other: the output of one is the input of the next only because
//! the bus routes it there.
//!
//! Every output carries `JobName`, `InstanceName` and `JobConfig` so that any step
//! can follow any other without a lookup.

use super::completion::CompletionPoller;
use super::instance_provisioner::InstanceProvisioner;
use super::slot_duplicator::SlotDuplicator;
use super::task_lifecycle::TaskLifecycleManager;
use super::task_output_persister::TaskOutputPersister;
use super::teardown::Teardown;
use crate::config::JobRegistry;
use crate::constants::workflows;
use crate::error::{FlowError, FlowResult};
use crate::events::TriggerMessage;
use crate::models::{CreatedTask, JobConfig};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// A workflow the runner can start by name
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// Workflow name finish events are published under
    fn name(&self) -> &str;

    async fn handle(&self, input: Value) -> FlowResult<Value>;
}

/// Trigger extended with the resolved job and one step-specific field
fn step_output(
    trigger: &TriggerMessage,
    job: &JobConfig,
    field: Option<(&str, Value)>,
) -> FlowResult<Value> {
    let mut output = trigger.clone().with_job_config(job.clone());
    if let Some((key, value)) = field {
        output.extra.insert(key.to_string(), value);
    }
    output.to_value()
}

fn task_details(trigger: &TriggerMessage) -> FlowResult<&Value> {
    trigger
        .extra
        .get("TaskDetails")
        .ok_or_else(|| FlowError::invalid_input("Trigger message has no TaskDetails"))
}

/// Creates (or reuses) the chain's instance and waits until it is available
pub struct CreateInstanceStep {
    name: String,
    registry: Arc<JobRegistry>,
    provisioner: InstanceProvisioner,
}

impl CreateInstanceStep {
    pub fn new(registry: Arc<JobRegistry>, provisioner: InstanceProvisioner) -> Self {
        Self {
            name: workflows::CREATE_INSTANCE.to_string(),
            registry,
            provisioner,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl StepHandler for CreateInstanceStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, input: Value) -> FlowResult<Value> {
        let trigger = TriggerMessage::from_value(input)?;
        let instance = self.registry.instance(&trigger.instance_name)?;
        self.provisioner.provision(instance).await?;
        trigger.to_value()
    }
}

/// Creates the job's replication task; output carries the task under `TaskDetails`
pub struct CreateTaskStep {
    name: String,
    registry: Arc<JobRegistry>,
    lifecycle: Arc<TaskLifecycleManager>,
}

impl CreateTaskStep {
    pub fn new(registry: Arc<JobRegistry>, lifecycle: Arc<TaskLifecycleManager>) -> Self {
        Self {
            name: "create_task".to_string(),
            registry,
            lifecycle,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl StepHandler for CreateTaskStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, input: Value) -> FlowResult<Value> {
        let trigger = TriggerMessage::from_value(input)?;
        let job = trigger.resolve_job_config(&self.registry)?;
        let created = self
            .lifecycle
            .create_task(&trigger.instance_name, &job)
            .await?;
        step_output(&trigger, &job, Some(("TaskDetails", created.to_step_output()?)))
    }
}

/// Records checkpoint and metrics of the task in `TaskDetails`
pub struct PersistTaskOutputsStep {
    name: String,
    registry: Arc<JobRegistry>,
    persister: Arc<TaskOutputPersister>,
}

impl PersistTaskOutputsStep {
    pub fn new(registry: Arc<JobRegistry>, persister: Arc<TaskOutputPersister>) -> Self {
        Self {
            name: "persist_task_outputs".to_string(),
            registry,
            persister,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl StepHandler for PersistTaskOutputsStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, input: Value) -> FlowResult<Value> {
        let trigger = TriggerMessage::from_value(input)?;
        let job = trigger.resolve_job_config(&self.registry)?;
        let details = self
            .persister
            .persist(&trigger.job_name, &job, task_details(&trigger)?)
            .await?;
        step_output(&trigger, &job, Some(("TaskDetails", details)))
    }
}

/// PostgreSQL post-processing; output carries the copy under `ReplicationSlot`
pub struct DuplicateSlotStep {
    name: String,
    registry: Arc<JobRegistry>,
    duplicator: Arc<SlotDuplicator>,
}

impl DuplicateSlotStep {
    pub fn new(registry: Arc<JobRegistry>, duplicator: Arc<SlotDuplicator>) -> Self {
        Self {
            name: workflows::POST_FULL_TASK_POSTGRES.to_string(),
            registry,
            duplicator,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl StepHandler for DuplicateSlotStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, input: Value) -> FlowResult<Value> {
        let trigger = TriggerMessage::from_value(input)?;
        let job = trigger.resolve_job_config(&self.registry)?;
        let slot = self.duplicator.duplicate_slot(&trigger.job_name, &job).await?;
        step_output(
            &trigger,
            &job,
            Some(("ReplicationSlot", serde_json::to_value(slot)?)),
        )
    }
}

/// Create, start, wait for, and persist a job's task in one workflow
pub struct ExecuteTaskWorkflow {
    name: String,
    registry: Arc<JobRegistry>,
    lifecycle: Arc<TaskLifecycleManager>,
    persister: Arc<TaskOutputPersister>,
    poller: CompletionPoller,
}

impl ExecuteTaskWorkflow {
    pub fn new(
        registry: Arc<JobRegistry>,
        lifecycle: Arc<TaskLifecycleManager>,
        persister: Arc<TaskOutputPersister>,
        poller: CompletionPoller,
    ) -> Self {
        Self {
            name: workflows::EXECUTE_JOB.to_string(),
            registry,
            lifecycle,
            persister,
            poller,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl StepHandler for ExecuteTaskWorkflow {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, input: Value) -> FlowResult<Value> {
        let trigger = TriggerMessage::from_value(input)?;
        let job = trigger.resolve_job_config(&self.registry)?;

        let created = self
            .lifecycle
            .create_task(&trigger.instance_name, &job)
            .await?;
        let replication = self.lifecycle.replication_service();
        let task_arn = created.task.replication_task_arn.clone();

        replication
            .start_task(&task_arn, created.start_replication_task_type)
            .await?;
        info!(
            task_arn = %task_arn,
            start_type = %created.start_replication_task_type,
            "Replication task started"
        );

        let stopped = self
            .poller
            .wait_for_task_stop(replication.as_ref(), &task_arn)
            .await?;
        info!(
            task_arn = %task_arn,
            stop_reason = stopped.stop_reason.as_deref().unwrap_or(""),
            "Replication task stopped"
        );

        // The snapshot handed on is the stopped task, not the one captured at creation
        let stopped = CreatedTask {
            task: stopped,
            start_replication_task_type: created.start_replication_task_type,
        };
        let details = self
            .persister
            .persist(&trigger.job_name, &job, &stopped.to_step_output()?)
            .await?;
        step_output(&trigger, &job, Some(("TaskDetails", details)))
    }
}

/// Deletes the task named after the job
pub struct DeleteTaskStep {
    name: String,
    teardown: Arc<Teardown>,
}

impl DeleteTaskStep {
    pub fn new(teardown: Arc<Teardown>) -> Self {
        Self {
            name: workflows::DELETE_TASK.to_string(),
            teardown,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl StepHandler for DeleteTaskStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, input: Value) -> FlowResult<Value> {
        let trigger = TriggerMessage::from_value(input)?;
        self.teardown.delete_task(&trigger.job_name).await?;
        trigger.to_value()
    }
}

/// Deletes the chain's instance
pub struct DeleteInstanceStep {
    name: String,
    teardown: Arc<Teardown>,
}

impl DeleteInstanceStep {
    pub fn new(teardown: Arc<Teardown>) -> Self {
        Self {
            name: workflows::DELETE_INSTANCE.to_string(),
            teardown,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl StepHandler for DeleteInstanceStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, input: Value) -> FlowResult<Value> {
        let trigger = TriggerMessage::from_value(input)?;
        self.teardown.delete_instance(&trigger.instance_name).await?;
        trigger.to_value()
    }
}
