use crate::error::FlowResult;
use crate::models::{CheckpointKey, CheckpointRecord, MetricsRecord};
use async_trait::async_trait;

/// Key-value store of replication positions keyed by
/// `(job_checkpoint_name, job_start)`.
///
/// Writes are last-write-wins: there is no optimistic concurrency check, so two
/// chains sharing a checkpoint name must never run their task steps concurrently.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get_checkpoint(&self, key: &CheckpointKey) -> FlowResult<Option<CheckpointRecord>>;

    /// Write records in one batch, overwriting existing keys
    async fn put_checkpoints(&self, records: &[CheckpointRecord]) -> FlowResult<()>;

    /// Write a metrics record, overwriting an existing one under the same key
    async fn put_metrics(&self, record: &MetricsRecord) -> FlowResult<()>;

    /// Record under the `latest` sentinel of a checkpoint name
    async fn latest_checkpoint(
        &self,
        job_checkpoint_name: &str,
    ) -> FlowResult<Option<CheckpointRecord>> {
        self.get_checkpoint(&CheckpointKey::latest(job_checkpoint_name))
            .await
    }
}
