//! # Source Database Access
//!
//! The slot duplicator needs exactly two statements against the source database:
//! find the logical replication slot sitting at a given LSN and copy it under a new
//! name. They are expressed as a session trait so the duplicator can be exercised
//! without a live PostgreSQL server; the sqlx implementation lives in
//! [`connection`] behind the `postgres` feature.

#[cfg(feature = "postgres")]
pub mod connection;

use crate::error::FlowResult;
use crate::services::SourceCredentials;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(feature = "postgres")]
pub use connection::{PgSlotConnector, PgSlotSession};

/// A copied replication slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicatedSlot {
    pub slot_name: String,
    /// LSN the copy starts from
    pub checkpoint: String,
}

/// Opens sessions on the source database
#[async_trait]
pub trait SourceDatabaseConnector: Send + Sync {
    async fn connect(
        &self,
        credentials: &SourceCredentials,
        database: &str,
    ) -> FlowResult<Box<dyn ReplicationSlotSession>>;
}

#[async_trait]
pub trait ReplicationSlotSession: Send {
    /// Name of the slot whose `restart_lsn` equals `lsn`
    async fn find_slot_by_restart_lsn(&mut self, lsn: &str) -> FlowResult<Option<String>>;

    /// Copy a logical slot, keeping its position
    async fn copy_logical_slot(
        &mut self,
        source_slot: &str,
        target_slot: &str,
    ) -> FlowResult<DuplicatedSlot>;

    async fn close(self: Box<Self>) -> FlowResult<()>;
}
