//! # Replication Slot Duplicator
//!
//! PostgreSQL post-processing after a full load. Deleting the full-load task drops
//! its logical replication slot, and with it the source-side position the next
//! CDC job needs. The slot sitting at the task's recovery checkpoint is therefore
//! copied under the job's checkpoint name before the task is deleted.
//!
//! The returned `{slot_name, checkpoint}` is informational only; the checkpoint
//! store remains the authority for where the CDC job starts.

use crate::database::{DuplicatedSlot, ReplicationSlotSession, SourceDatabaseConnector};
use crate::error::{FlowError, FlowResult};
use crate::models::JobConfig;
use crate::services::{ReplicationService, SecretResolver};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{info, instrument};

fn lsn_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[A-Z0-9]+/[A-Z0-9]+").expect("literal pattern is valid"))
}

/// LSN embedded in a recovery checkpoint
pub fn extract_lsn(checkpoint: &str) -> FlowResult<String> {
    lsn_pattern()
        .find(checkpoint)
        .map(|found| found.as_str().to_string())
        .ok_or_else(|| FlowError::position_parse("postgresql", checkpoint, "no LSN in checkpoint"))
}

/// Slot names cannot contain `-`
pub fn duplicate_slot_name(job_checkpoint_name: &str) -> String {
    job_checkpoint_name.replace('-', "_")
}

pub struct SlotDuplicator {
    replication: Arc<dyn ReplicationService>,
    secrets: Arc<dyn SecretResolver>,
    connector: Arc<dyn SourceDatabaseConnector>,
}

impl SlotDuplicator {
    pub fn new(
        replication: Arc<dyn ReplicationService>,
        secrets: Arc<dyn SecretResolver>,
        connector: Arc<dyn SourceDatabaseConnector>,
    ) -> Self {
        Self {
            replication,
            secrets,
            connector,
        }
    }

    #[instrument(skip(self, job), fields(job_name = %job_name, job_checkpoint_name = %job.job_checkpoint_name))]
    pub async fn duplicate_slot(&self, job_name: &str, job: &JobConfig) -> FlowResult<DuplicatedSlot> {
        let task = self.replication.require_task_by_identifier(job_name).await?;
        let checkpoint = task.recovery_checkpoint.as_deref().ok_or_else(|| {
            FlowError::invalid_input(format!(
                "Task {} has no recovery checkpoint to locate the slot",
                task.replication_task_arn
            ))
        })?;
        let lsn = extract_lsn(checkpoint)?;

        let endpoint = self
            .replication
            .require_endpoint(&job.source_endpoint_id)
            .await?;
        let secret_id = endpoint.secrets_manager_secret_id.as_deref().ok_or_else(|| {
            FlowError::Configuration(format!(
                "Source endpoint {} has no secret reference for its credentials",
                endpoint.endpoint_identifier
            ))
        })?;
        let credentials = self.secrets.source_credentials(secret_id).await?;
        let database = endpoint
            .database_name
            .clone()
            .or_else(|| credentials.database.clone())
            .ok_or_else(|| {
                FlowError::Configuration(format!(
                    "No database name for source endpoint {}",
                    endpoint.endpoint_identifier
                ))
            })?;

        let target_slot = duplicate_slot_name(&job.job_checkpoint_name);
        let mut session = self.connector.connect(&credentials, &database).await?;
        let copied = copy_slot_at(session.as_mut(), &lsn, &target_slot).await;
        let closed = session.close().await;
        let duplicated = copied?;
        closed?;

        info!(
            slot_name = %duplicated.slot_name,
            checkpoint = %duplicated.checkpoint,
            "Replication slot duplicated"
        );
        Ok(duplicated)
    }
}

async fn copy_slot_at(
    session: &mut dyn ReplicationSlotSession,
    lsn: &str,
    target_slot: &str,
) -> FlowResult<DuplicatedSlot> {
    let source_slot = session
        .find_slot_by_restart_lsn(lsn)
        .await?
        .ok_or_else(|| FlowError::not_found("replication slot at restart_lsn", lsn))?;
    session.copy_logical_slot(&source_slot, target_slot).await
}

impl std::fmt::Debug for SlotDuplicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotDuplicator").finish_non_exhaustive()
    }
}
