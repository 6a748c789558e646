//! # Task Output Persister
//!
//! The only place checkpoints advance. After a task completes, its canonical state
//! is re-fetched by ARN (the caller's snapshot is stale by then), the recovery
//! checkpoint is written twice (under the run's start date and under `latest`),
//! and the statistics are written once as a metrics record with snake_case names.
//!
//! Re-running with the same final task state rewrites the same records, so a crash
//! between this step and the next is safe to retry.

use crate::checkpoint::CheckpointStore;
use crate::error::{FlowError, FlowResult};
use crate::logging::log_checkpoint_operation;
use crate::models::{CheckpointRecord, JobConfig, MetricsRecord, ReplicationTask};
use crate::services::ReplicationService;
use crate::utils::naming::camel_to_snake;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, instrument};

/// Task descriptor fields carried into the step output
pub const RETAINED_TASK_FIELDS: [&str; 13] = [
    "ReplicationTaskIdentifier",
    "SourceEndpointArn",
    "TargetEndpointArn",
    "ReplicationInstanceArn",
    "MigrationType",
    "Status",
    "StopReason",
    "ReplicationTaskCreationDate",
    "ReplicationTaskStartDate",
    "CdcStopPosition",
    "RecoveryCheckpoint",
    "ReplicationTaskArn",
    "ReplicationTaskStats",
];

/// Fields the service may omit but downstream steps always read
fn output_defaults() -> [(&'static str, Value); 1] {
    [("CdcStopPosition", Value::String(String::new()))]
}

pub struct TaskOutputPersister {
    replication: Arc<dyn ReplicationService>,
    checkpoints: Arc<dyn CheckpointStore>,
}

impl TaskOutputPersister {
    pub fn new(
        replication: Arc<dyn ReplicationService>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            replication,
            checkpoints,
        }
    }

    /// Persist checkpoint and metrics records for the task named in `task_details`
    /// and return the merged descriptor.
    #[instrument(skip(self, job, task_details), fields(job_name = %job_name))]
    pub async fn persist(
        &self,
        job_name: &str,
        job: &JobConfig,
        task_details: &Value,
    ) -> FlowResult<Value> {
        let snapshot = task_details.as_object().ok_or_else(|| {
            FlowError::invalid_input("TaskDetails must be an object describing the task")
        })?;
        let task_arn = snapshot
            .get("ReplicationTaskArn")
            .and_then(Value::as_str)
            .ok_or_else(|| FlowError::invalid_input("TaskDetails has no ReplicationTaskArn"))?;

        let task = self.replication.require_task_by_arn(task_arn).await?;

        let job_start = task.replication_task_start_date.as_deref().ok_or_else(|| {
            FlowError::invalid_input(format!(
                "Task {task_arn} has no start date; it has not run"
            ))
        })?;
        let checkpoint = task.recovery_checkpoint.as_deref().ok_or_else(|| {
            FlowError::invalid_input(format!("Task {task_arn} has no recovery checkpoint"))
        })?;

        let records =
            CheckpointRecord::pair(&job.job_checkpoint_name, job_start, job_name, checkpoint);
        self.checkpoints.put_checkpoints(&records).await?;
        log_checkpoint_operation(
            "advance",
            &job.job_checkpoint_name,
            Some(job_start),
            "persisted",
            Some(checkpoint),
        );

        let metrics = MetricsRecord {
            job_checkpoint_name: job.job_checkpoint_name.clone(),
            job_start: job_start.to_string(),
            job_name: job_name.to_string(),
            metrics: normalise_statistics(&task),
        };
        self.checkpoints.put_metrics(&metrics).await?;

        info!(
            job_checkpoint_name = %job.job_checkpoint_name,
            job_start = %job_start,
            statistics = metrics.metrics.len(),
            "Task outputs persisted"
        );

        merge_task_details(&task, snapshot)
    }
}

impl std::fmt::Debug for TaskOutputPersister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskOutputPersister")
            .field("replication", &"<ReplicationService>")
            .field("checkpoints", &"<CheckpointStore>")
            .finish()
    }
}

fn normalise_statistics(task: &ReplicationTask) -> Map<String, Value> {
    task.replication_task_stats
        .iter()
        .flatten()
        .map(|(name, value)| (camel_to_snake(name), value.clone()))
        .collect()
}

/// Retained fresh fields, overlaid with the caller's snapshot, then defaults
fn merge_task_details(task: &ReplicationTask, snapshot: &Map<String, Value>) -> FlowResult<Value> {
    let Value::Object(fresh) = serde_json::to_value(task)? else {
        return Err(FlowError::Serialization(
            "Task descriptor did not serialise to an object".to_string(),
        ));
    };

    let mut merged: Map<String, Value> = fresh
        .into_iter()
        .filter(|(key, _)| RETAINED_TASK_FIELDS.contains(&key.as_str()))
        .collect();
    for (key, value) in snapshot {
        merged.insert(key.clone(), value.clone());
    }
    for (key, default) in output_defaults() {
        merged.entry(key).or_insert(default);
    }

    Ok(Value::Object(merged))
}
