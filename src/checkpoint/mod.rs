//! # Checkpoint Store
//!
//! Persistence of replication positions and task metrics. The only writer is the
//! task output persister; the task lifecycle manager reads `latest` back when a
//! CDC job starts.
//!
//! Every advance writes the timestamped record and the `latest` record together:
//!
//! ```rust
//! use replication_flow::checkpoint::{CheckpointStore, InMemoryCheckpointStore};
//! use replication_flow::models::CheckpointRecord;
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryCheckpointStore::new();
//! let records = CheckpointRecord::pair("orders_stream", "2024-03-01T02:00:00", "orders-full-load", "AAA/1A2B3C");
//! store.put_checkpoints(&records).await.unwrap();
//!
//! let latest = store.latest_checkpoint("orders_stream").await.unwrap().unwrap();
//! assert_eq!(latest.checkpoint, "AAA/1A2B3C");
//! # });
//! ```

pub mod memory;
pub mod store;

pub use memory::InMemoryCheckpointStore;
pub use store::CheckpointStore;
