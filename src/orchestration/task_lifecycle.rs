//! # Task Lifecycle Manager
//!
//! Creates the replication task of a job on the instance its chain created.
//!
//! ## Resolution order
//!
//! 1. Instance, source endpoint and target endpoint are looked up by identifier
//!    (`NotFound` on a miss).
//! 2. Task settings and table mappings are read from
//!    `{jobs_config_prefix}/{job_name}/{settings,mappings}.json` (`ConfigNotFound`
//!    when absent).
//! 3. CDC jobs read the `latest` checkpoint of their `job_checkpoint_name`
//!    (`CheckpointMissing` when absent), extract the start position with the
//!    source engine's strategy and bound the run with a `commit_time:` stop
//!    position a few minutes in the future.
//!
//! The task identifier is the job name, so a second create for the same job fails
//! at the replication service while the first task still exists.

use super::position::PositionParserRegistry;
use crate::checkpoint::CheckpointStore;
use crate::config::{FlowConfig, StoresConfig, TaskConfig};
use crate::error::{FlowError, FlowResult};
use crate::logging::log_checkpoint_operation;
use crate::models::{CreateTaskRequest, CreatedTask, Endpoint, JobConfig, MigrationType};
use crate::services::{ObjectStore, ReplicationService};
use crate::utils::time::cdc_stop_position;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Start and stop positions of a CDC task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdcWindow {
    pub start_position: String,
    pub stop_position: String,
}

pub struct TaskLifecycleManager {
    replication: Arc<dyn ReplicationService>,
    objects: Arc<dyn ObjectStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    positions: PositionParserRegistry,
    stores: StoresConfig,
    task: TaskConfig,
}

impl TaskLifecycleManager {
    pub fn new(
        replication: Arc<dyn ReplicationService>,
        objects: Arc<dyn ObjectStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        config: &FlowConfig,
    ) -> FlowResult<Self> {
        Ok(Self {
            replication,
            objects,
            checkpoints,
            positions: PositionParserRegistry::from_config(&config.task)?,
            stores: config.stores.clone(),
            task: config.task.clone(),
        })
    }

    /// Replace the engine strategy table
    pub fn with_position_parsers(mut self, positions: PositionParserRegistry) -> Self {
        self.positions = positions;
        self
    }

    pub fn replication_service(&self) -> &Arc<dyn ReplicationService> {
        &self.replication
    }

    #[instrument(skip(self, job), fields(job_name = %job.job_name, migration_type = %job.migration_type))]
    pub async fn create_task(&self, instance_name: &str, job: &JobConfig) -> FlowResult<CreatedTask> {
        self.create_task_at(instance_name, job, Utc::now()).await
    }

    /// [`create_task`](Self::create_task) with an explicit clock for the CDC stop position
    pub async fn create_task_at(
        &self,
        instance_name: &str,
        job: &JobConfig,
        now: DateTime<Utc>,
    ) -> FlowResult<CreatedTask> {
        let instance = self.replication.require_instance(instance_name).await?;
        let source = self
            .replication
            .require_endpoint(&job.source_endpoint_id)
            .await?;
        let target = self
            .replication
            .require_endpoint(&job.target_endpoint_id)
            .await?;

        let replication_task_settings = self
            .load_artifact(&self.stores.task_settings_key(&job.job_name))
            .await?;
        let table_mappings = self
            .load_artifact(&self.stores.table_mappings_key(&job.job_name))
            .await?;

        let cdc_window = match job.migration_type {
            MigrationType::Cdc => Some(self.resolve_cdc_window(job, &source, now).await?),
            MigrationType::FullLoadAndCdc => None,
        };

        let request = CreateTaskRequest {
            replication_task_identifier: job.job_name.clone(),
            source_endpoint_arn: source.endpoint_arn,
            target_endpoint_arn: target.endpoint_arn,
            replication_instance_arn: instance.replication_instance_arn,
            migration_type: job.migration_type,
            replication_task_settings,
            table_mappings,
            cdc_start_position: cdc_window.as_ref().map(|w| w.start_position.clone()),
            cdc_stop_position: cdc_window.map(|w| w.stop_position),
        };

        let task = self.replication.create_task(&request).await?;
        let start_replication_task_type = job.migration_type.start_operation();

        info!(
            task_arn = %task.replication_task_arn,
            status = %task.status,
            start_type = %start_replication_task_type,
            "Replication task created"
        );

        Ok(CreatedTask {
            task,
            start_replication_task_type,
        })
    }

    /// Start position from the `latest` checkpoint, stop position `now + window`
    pub async fn resolve_cdc_window(
        &self,
        job: &JobConfig,
        source: &Endpoint,
        now: DateTime<Utc>,
    ) -> FlowResult<CdcWindow> {
        let latest = self
            .checkpoints
            .latest_checkpoint(&job.job_checkpoint_name)
            .await?
            .ok_or_else(|| FlowError::checkpoint_missing(&job.job_checkpoint_name))?;

        log_checkpoint_operation(
            "read_latest",
            &job.job_checkpoint_name,
            Some(latest.job_start.as_str()),
            "found",
            Some(&format!("written by {}", latest.job_name)),
        );

        let start_position = self
            .positions
            .extract(&source.engine_name, &latest.checkpoint)?;
        let window = self.task.cdc_stop_window().ok_or_else(|| {
            FlowError::Configuration(format!(
                "task.cdc_stop_window_minutes {} is out of range",
                self.task.cdc_stop_window_minutes
            ))
        })?;
        let stop_position = cdc_stop_position(now, window)?;

        debug!(
            engine = %source.engine_name,
            start_position = %start_position,
            stop_position = %stop_position,
            "Resolved CDC window"
        );

        Ok(CdcWindow {
            start_position,
            stop_position,
        })
    }

    /// Fetch a JSON artifact and re-serialise it compactly
    async fn load_artifact(&self, key: &str) -> FlowResult<String> {
        let bucket = &self.stores.artifact_bucket;
        let body = self
            .objects
            .get_object(bucket, key)
            .await?
            .ok_or_else(|| FlowError::config_not_found(format!("{bucket}/{key}")))?;

        let document: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
            FlowError::Configuration(format!("{bucket}/{key} is not valid JSON: {e}"))
        })?;
        Ok(document.to_string())
    }
}

impl std::fmt::Debug for TaskLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskLifecycleManager")
            .field("replication", &"<ReplicationService>")
            .field("positions", &self.positions.engines())
            .field("artifact_bucket", &self.stores.artifact_bucket)
            .finish()
    }
}
