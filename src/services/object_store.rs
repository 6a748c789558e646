use crate::error::FlowResult;
use async_trait::async_trait;
use dashmap::DashMap;

/// Read-only access to the bucket holding task settings and table mappings
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// `None` when the object does not exist
    async fn get_object(&self, bucket: &str, key: &str) -> FlowResult<Option<Vec<u8>>>;
}

#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: DashMap<(String, String), Vec<u8>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_object(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.objects
            .insert((bucket.to_string(), key.to_string()), body.into());
    }

    pub fn put_json(&self, bucket: &str, key: &str, document: &serde_json::Value) {
        self.put_object(bucket, key, document.to_string());
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> FlowResult<Option<Vec<u8>>> {
        Ok(self
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|entry| entry.value().clone()))
    }
}
