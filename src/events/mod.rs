pub mod messages;
pub mod pattern;
pub mod publisher;

// Re-export key types for convenience
pub use messages::{BusEvent, FinishMessage, TriggerMessage, WorkflowStatus};
pub use pattern::EventPattern;
pub use publisher::FinishEventPublisher;
