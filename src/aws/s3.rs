use super::sdk_error;
use crate::error::FlowResult;
use crate::services::ObjectStore;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::Client;
use tracing::{debug, instrument};

const SERVICE: &str = "s3";

/// Task artifact reads from S3
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self))]
    async fn get_object(&self, bucket: &str, key: &str) -> FlowResult<Option<Vec<u8>>> {
        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(e) => {
                if e.as_service_error().is_some_and(|service| service.is_no_such_key()) {
                    debug!("Object does not exist");
                    return Ok(None);
                }
                return Err(sdk_error(SERVICE, "GetObject", e));
            }
        };

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| sdk_error(SERVICE, "GetObject", e))?;
        Ok(Some(body.into_bytes().to_vec()))
    }
}
