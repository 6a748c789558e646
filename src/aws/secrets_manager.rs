use super::sdk_error;
use crate::error::{FlowError, FlowResult};
use crate::services::SecretResolver;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_secretsmanager::Client;
use tracing::instrument;

const SERVICE: &str = "secretsmanager";

#[derive(Debug, Clone)]
pub struct SecretsManagerResolver {
    client: Client,
}

impl SecretsManagerResolver {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl SecretResolver for SecretsManagerResolver {
    #[instrument(skip(self))]
    async fn resolve_secret(&self, secret_id: &str) -> FlowResult<String> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "GetSecretValue", e))?;

        output
            .secret_string()
            .map(str::to_string)
            .ok_or_else(|| {
                FlowError::Configuration(format!("Secret {secret_id} has no string value"))
            })
    }
}
