//! # Choreography
//!
//! Event-bus rules and targets that chain independently executed workflow steps,
//! plus a local bus and driver for running whole flows in-process.

pub mod bus;
pub mod driver;
pub mod job_flow;
pub mod memory_bus;
pub mod rules;
pub mod schedule;

pub use bus::EventBus;
pub use driver::LocalFlowDriver;
pub use job_flow::{
    JobFlowBuilder, JobFlowDefinition, JobFlowDeployer, JobFlowPlan, WorkflowStepConfig,
};
pub use memory_bus::{InMemoryEventBus, TargetInvocation};
pub use rules::{RuleDefinition, RuleKind, RuleTarget, RuleTrigger, TargetInput};
pub use schedule::CronSchedule;
