//! # Orchestration
//!
//! The work each workflow step performs once the bus has started it.
//!
//! ## Core Components
//!
//! - **TaskLifecycleManager**: creates the job's replication task, resolving the CDC
//!   window from the latest checkpoint
//! - **TaskOutputPersister**: advances the checkpoint and writes metrics after a run
//! - **SlotDuplicator**: copies the PostgreSQL replication slot a full load leaves behind
//! - **InstanceProvisioner** / **Teardown**: the instance and task lifecycle around a chain
//! - **StepHandler**: the workflow boundary each component is exposed through
//! - **WorkflowExecutor**: runs a step and publishes its finish event on success
//!
//! Components never call each other across steps. Everything a later step needs
//! travels in the finish event or lives in the checkpoint store.

pub mod completion;
pub mod instance_provisioner;
pub mod position;
pub mod slot_duplicator;
pub mod step_handler;
pub mod task_lifecycle;
pub mod task_output_persister;
pub mod teardown;
pub mod workflow_executor;

pub use completion::CompletionPoller;
pub use instance_provisioner::InstanceProvisioner;
pub use position::{PositionExtractor, PositionParserRegistry, RegexPositionExtractor};
pub use slot_duplicator::SlotDuplicator;
pub use step_handler::{
    CreateInstanceStep, CreateTaskStep, DeleteInstanceStep, DeleteTaskStep, DuplicateSlotStep,
    ExecuteTaskWorkflow, PersistTaskOutputsStep, StepHandler,
};
pub use task_lifecycle::{CdcWindow, TaskLifecycleManager};
pub use task_output_persister::TaskOutputPersister;
pub use teardown::Teardown;
pub use workflow_executor::{ExecutionOutcome, ExecutionRecord, WorkflowExecutor};
