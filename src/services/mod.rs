//! # External Service Boundaries
//!
//! Traits for the collaborators the core talks to but does not own: the
//! replication service, the artifact object store, the secret store and the
//! operators' failure notifications.

pub mod notifier;
pub mod object_store;
pub mod replication;
pub mod secrets;

pub use notifier::{FailureNotification, FailureNotifier, InMemoryFailureNotifier};
pub use object_store::{InMemoryObjectStore, ObjectStore};
pub use replication::ReplicationService;
pub use secrets::{SecretResolver, SourceCredentials};
