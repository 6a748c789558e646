use super::{DuplicatedSlot, ReplicationSlotSession, SourceDatabaseConnector};
use crate::error::{FlowError, FlowResult};
use crate::services::SourceCredentials;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tracing::debug;

fn database_error(operation: &str, error: sqlx::Error) -> FlowError {
    FlowError::external("postgresql", operation, error.to_string())
}

/// Connects to the source database with credentials from the secret store
#[derive(Debug, Clone, Default)]
pub struct PgSlotConnector;

impl PgSlotConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceDatabaseConnector for PgSlotConnector {
    async fn connect(
        &self,
        credentials: &SourceCredentials,
        database: &str,
    ) -> FlowResult<Box<dyn ReplicationSlotSession>> {
        let options = PgConnectOptions::new()
            .host(&credentials.host)
            .port(credentials.port)
            .username(&credentials.username)
            .password(&credentials.password)
            .database(database);

        let connection = PgConnection::connect_with(&options)
            .await
            .map_err(|e| database_error("connect", e))?;

        debug!(host = %credentials.host, database = %database, "Connected to source database");
        Ok(Box::new(PgSlotSession { connection }))
    }
}

pub struct PgSlotSession {
    connection: PgConnection,
}

#[async_trait]
impl ReplicationSlotSession for PgSlotSession {
    async fn find_slot_by_restart_lsn(&mut self, lsn: &str) -> FlowResult<Option<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT slot_name::text FROM pg_replication_slots WHERE restart_lsn = $1::pg_lsn LIMIT 1",
        )
        .bind(lsn)
        .fetch_optional(&mut self.connection)
        .await
        .map_err(|e| database_error("find_replication_slot", e))
    }

    async fn copy_logical_slot(
        &mut self,
        source_slot: &str,
        target_slot: &str,
    ) -> FlowResult<DuplicatedSlot> {
        let (slot_name, checkpoint) = sqlx::query_as::<_, (String, String)>(
            "SELECT slot_name::text, lsn::text FROM pg_copy_logical_replication_slot($1, $2)",
        )
        .bind(source_slot)
        .bind(target_slot)
        .fetch_one(&mut self.connection)
        .await
        .map_err(|e| database_error("pg_copy_logical_replication_slot", e))?;

        Ok(DuplicatedSlot {
            slot_name,
            checkpoint,
        })
    }

    async fn close(self: Box<Self>) -> FlowResult<()> {
        self.connection
            .close()
            .await
            .map_err(|e| database_error("close", e))
    }
}

impl std::fmt::Debug for PgSlotSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgSlotSession").finish_non_exhaustive()
    }
}
