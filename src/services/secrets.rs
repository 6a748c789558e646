use crate::error::{FlowError, FlowResult};
use crate::utils::serde::deserialize_port;
use async_trait::async_trait;
use serde::Deserialize;

/// Source database credentials stored behind a secret reference
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct SourceCredentials {
    pub username: String,
    pub password: String,
    pub host: String,
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,
    /// Database to connect to; the endpoint's database name is used when absent
    #[serde(default, alias = "dbname")]
    pub database: Option<String>,
}

impl std::fmt::Debug for SourceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceCredentials")
            .field("username", &self.username)
            .field("password", &"[MASKED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// Raw secret string stored under `secret_id`
    async fn resolve_secret(&self, secret_id: &str) -> FlowResult<String>;

    async fn source_credentials(&self, secret_id: &str) -> FlowResult<SourceCredentials> {
        let raw = self.resolve_secret(secret_id).await?;
        serde_json::from_str(&raw).map_err(|e| {
            FlowError::Configuration(format!(
                "Secret {secret_id} is not a valid credentials document: {e}"
            ))
        })
    }
}
