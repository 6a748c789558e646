use super::sdk_error;
use crate::checkpoint::CheckpointStore;
use crate::error::{FlowError, FlowResult};
use crate::models::{CheckpointKey, CheckpointRecord, JobStart, MetricsRecord};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::types::{AttributeValue, PutRequest, WriteRequest};
use aws_sdk_dynamodb::Client;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument};

const SERVICE: &str = "dynamodb";

type Item = HashMap<String, AttributeValue>;

/// Checkpoints and metrics in two tables keyed by
/// `(job_checkpoint_name, job_start)`
pub struct DynamoCheckpointStore {
    client: Client,
    checkpoints_table: String,
    metrics_table: String,
}

impl DynamoCheckpointStore {
    pub fn new(
        sdk_config: &SdkConfig,
        checkpoints_table: impl Into<String>,
        metrics_table: impl Into<String>,
    ) -> Self {
        Self::with_client(Client::new(sdk_config), checkpoints_table, metrics_table)
    }

    pub fn with_client(
        client: Client,
        checkpoints_table: impl Into<String>,
        metrics_table: impl Into<String>,
    ) -> Self {
        Self {
            client,
            checkpoints_table: checkpoints_table.into(),
            metrics_table: metrics_table.into(),
        }
    }
}

fn key_item(job_checkpoint_name: &str, job_start: &str) -> Item {
    HashMap::from([
        (
            "job_checkpoint_name".to_string(),
            AttributeValue::S(job_checkpoint_name.to_string()),
        ),
        ("job_start".to_string(), AttributeValue::S(job_start.to_string())),
    ])
}

fn checkpoint_item(record: &CheckpointRecord) -> Item {
    let mut item = key_item(&record.job_checkpoint_name, record.job_start.as_str());
    item.insert("job_name".to_string(), AttributeValue::S(record.job_name.clone()));
    item.insert(
        "checkpoint".to_string(),
        AttributeValue::S(record.checkpoint.clone()),
    );
    item
}

/// Numbers stay numeric; anything structured is stored as its JSON text
fn metric_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(flag) => AttributeValue::Bool(*flag),
        Value::Number(number) => AttributeValue::N(number.to_string()),
        Value::String(text) => AttributeValue::S(text.clone()),
        other => AttributeValue::S(other.to_string()),
    }
}

fn string_attribute(item: &Item, name: &str) -> FlowResult<String> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .cloned()
        .ok_or_else(|| {
            FlowError::external(
                SERVICE,
                "GetItem",
                format!("checkpoint item has no string attribute '{name}'"),
            )
        })
}

#[async_trait]
impl CheckpointStore for DynamoCheckpointStore {
    #[instrument(skip(self), fields(table = %self.checkpoints_table))]
    async fn get_checkpoint(&self, key: &CheckpointKey) -> FlowResult<Option<CheckpointRecord>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.checkpoints_table)
            .set_key(Some(key_item(&key.job_checkpoint_name, key.job_start.as_str())))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "GetItem", e))?;

        let Some(item) = output.item else {
            return Ok(None);
        };

        Ok(Some(CheckpointRecord {
            job_checkpoint_name: string_attribute(&item, "job_checkpoint_name")?,
            job_start: JobStart::from(string_attribute(&item, "job_start")?.as_str()),
            job_name: string_attribute(&item, "job_name")?,
            checkpoint: string_attribute(&item, "checkpoint")?,
        }))
    }

    #[instrument(skip(self, records), fields(table = %self.checkpoints_table, count = records.len()))]
    async fn put_checkpoints(&self, records: &[CheckpointRecord]) -> FlowResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let requests = records
            .iter()
            .map(|record| {
                PutRequest::builder()
                    .set_item(Some(checkpoint_item(record)))
                    .build()
                    .map(|put| WriteRequest::builder().put_request(put).build())
                    .map_err(|e| sdk_error(SERVICE, "BatchWriteItem", e))
            })
            .collect::<FlowResult<Vec<_>>>()?;

        let output = self
            .client
            .batch_write_item()
            .request_items(&self.checkpoints_table, requests)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "BatchWriteItem", e))?;

        let unprocessed = output
            .unprocessed_items
            .map(|items| items.values().map(Vec::len).sum::<usize>())
            .unwrap_or(0);
        if unprocessed > 0 {
            return Err(FlowError::external(
                SERVICE,
                "BatchWriteItem",
                format!("{unprocessed} checkpoint records were not written"),
            ));
        }

        debug!(count = records.len(), "Checkpoint batch written");
        Ok(())
    }

    #[instrument(skip(self, record), fields(table = %self.metrics_table))]
    async fn put_metrics(&self, record: &MetricsRecord) -> FlowResult<()> {
        let mut item = key_item(&record.job_checkpoint_name, &record.job_start);
        item.insert("job_name".to_string(), AttributeValue::S(record.job_name.clone()));
        for (name, value) in &record.metrics {
            item.insert(name.clone(), metric_attribute(value));
        }

        self.client
            .put_item()
            .table_name(&self.metrics_table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "PutItem", e))?;
        Ok(())
    }
}

impl std::fmt::Debug for DynamoCheckpointStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoCheckpointStore")
            .field("checkpoints_table", &self.checkpoints_table)
            .field("metrics_table", &self.metrics_table)
            .finish()
    }
}
