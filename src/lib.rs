#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, DynamoDB in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Replication Flow
//!
//! Event-choreographed, checkpoint-driven lifecycle for transient database
//! replication jobs.
//!
//! ## Overview
//!
//! A replication job (full load, or incremental CDC) runs as a chain of
//! independently executed workflow steps: create an instance, create and run a
//! task, persist its outputs, delete the task, delete the instance. No step calls
//! another. Each one publishes a finish event on success, and event-bus rules start
//! the next step with that event's output. The only state carried between runs is
//! the replication position, kept in a checkpoint store keyed by a checkpoint name
//! that full-load and CDC variants of the same stream share.
//!
//! ## Module Organization
//!
//! - [`choreography`] - Rules and targets that chain steps, plus a local bus and driver
//! - [`orchestration`] - Task lifecycle, output persistence, slot duplication, step handlers
//! - [`checkpoint`] - Checkpoint store boundary and in-memory implementation
//! - [`services`] - Replication service, object store, secret store and failure notifier boundaries
//! - [`database`] - Source PostgreSQL access for replication slot duplication
//! - [`events`] - Trigger and finish messages, event patterns, finish publishing
//! - [`models`] - Jobs, instances, tasks, endpoints, checkpoint and metrics records
//! - [`config`] - Layered configuration and the job registry
//! - [`error`] - Structured error handling
//! - `aws` - AWS adapters for every boundary (feature `aws`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use replication_flow::choreography::JobFlowBuilder;
//! use replication_flow::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let builder = JobFlowBuilder::new(manager.config().event_bus.clone());
//!
//! for flow in manager.registry().flows() {
//!     let plan = builder.build(flow)?;
//!     println!("{}: {} rules, {} targets", plan.job_name, plan.rules.len(), plan.target_count());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod checkpoint;
pub mod choreography;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod services;
pub mod utils;

#[cfg(feature = "aws")]
pub mod aws;

pub use checkpoint::{CheckpointStore, InMemoryCheckpointStore};
pub use choreography::{
    EventBus, InMemoryEventBus, JobFlowBuilder, JobFlowDefinition, JobFlowDeployer, JobFlowPlan,
    LocalFlowDriver,
};
pub use config::{ConfigManager, FlowConfig, JobRegistry};
pub use error::{FlowError, FlowResult};
pub use events::{BusEvent, FinishMessage, TriggerMessage};
pub use models::{
    CheckpointRecord, CreatedTask, JobConfig, MetricsRecord, MigrationType, ReplicationTask,
    StartReplicationTaskType,
};
pub use orchestration::{
    SlotDuplicator, StepHandler, TaskLifecycleManager, TaskOutputPersister, WorkflowExecutor,
};
pub use services::{FailureNotifier, ObjectStore, ReplicationService, SecretResolver};
