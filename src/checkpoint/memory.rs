use super::store::CheckpointStore;
use crate::error::FlowResult;
use crate::logging::log_checkpoint_operation;
use crate::models::{CheckpointKey, CheckpointRecord, MetricsRecord};
use async_trait::async_trait;
use dashmap::DashMap;

/// Process-local checkpoint and metrics tables
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    checkpoints: DashMap<CheckpointKey, CheckpointRecord>,
    metrics: DashMap<CheckpointKey, MetricsRecord>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn metrics_count(&self) -> usize {
        self.metrics.len()
    }

    pub fn metrics(&self, key: &CheckpointKey) -> Option<MetricsRecord> {
        self.metrics.get(key).map(|entry| entry.value().clone())
    }

    /// Every checkpoint recorded under a name, `latest` included, ordered by `job_start`
    pub fn history(&self, job_checkpoint_name: &str) -> Vec<CheckpointRecord> {
        let mut records: Vec<CheckpointRecord> = self
            .checkpoints
            .iter()
            .filter(|entry| entry.key().job_checkpoint_name == job_checkpoint_name)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.job_start.as_str().cmp(b.job_start.as_str()));
        records
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn get_checkpoint(&self, key: &CheckpointKey) -> FlowResult<Option<CheckpointRecord>> {
        Ok(self.checkpoints.get(key).map(|entry| entry.value().clone()))
    }

    async fn put_checkpoints(&self, records: &[CheckpointRecord]) -> FlowResult<()> {
        for record in records {
            self.checkpoints.insert(record.key(), record.clone());
            log_checkpoint_operation(
                "put_checkpoint",
                &record.job_checkpoint_name,
                Some(record.job_start.as_str()),
                "written",
                None,
            );
        }
        Ok(())
    }

    async fn put_metrics(&self, record: &MetricsRecord) -> FlowResult<()> {
        self.metrics.insert(record.key(), record.clone());
        Ok(())
    }
}
