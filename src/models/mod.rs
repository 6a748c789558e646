//! # Data Model
//!
//! Jobs and instances come from deployment configuration; tasks, endpoints and
//! replication instances are descriptors returned by the replication service;
//! checkpoint and metrics records are what the checkpoint store persists.

pub mod checkpoint;
pub mod instance;
pub mod job;
pub mod task;

pub use checkpoint::{CheckpointKey, CheckpointRecord, JobStart, MetricsRecord};
pub use instance::{Endpoint, InstanceConfig, ReplicationInstance};
pub use job::{JobConfig, MigrationType, StartReplicationTaskType};
pub use task::{CreateTaskRequest, CreatedTask, ReplicationTask};
