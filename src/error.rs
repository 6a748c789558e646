//! # Error Types
//!
//! Every component aborts the current workflow step by returning a [`FlowError`].
//! Nothing in this crate retries locally: recovery and backoff belong to the external
//! workflow runner, and a failed step never publishes a finish event.

use crate::config::ConfigurationError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlowError {
    /// An instance, endpoint, task, job, or slot lookup returned nothing
    #[error("{resource} not found: {identifier}")]
    NotFound {
        resource: String,
        identifier: String,
    },

    /// Task settings or table mappings are missing from the object store
    #[error("Task configuration not found at {location}")]
    ConfigNotFound { location: String },

    /// A CDC job started without a prior full-load checkpoint
    #[error("No latest checkpoint recorded for {job_checkpoint_name}; a CDC job cannot start before its full load")]
    CheckpointMissing { job_checkpoint_name: String },

    /// The stored checkpoint does not contain a position for the source engine
    #[error("Cannot extract {engine} position from checkpoint '{checkpoint}': {reason}")]
    PositionParseFailure {
        engine: String,
        checkpoint: String,
        reason: String,
    },

    /// The replication service, object store, secret store or bus rejected a call
    #[error("{service} {operation} failed: {message}")]
    ExternalService {
        service: String,
        operation: String,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Event bus error: {0}")]
    EventBus(String),
}

impl FlowError {
    pub fn not_found(resource: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            identifier: identifier.into(),
        }
    }

    pub fn config_not_found(location: impl Into<String>) -> Self {
        Self::ConfigNotFound {
            location: location.into(),
        }
    }

    pub fn checkpoint_missing(job_checkpoint_name: impl Into<String>) -> Self {
        Self::CheckpointMissing {
            job_checkpoint_name: job_checkpoint_name.into(),
        }
    }

    pub fn position_parse(
        engine: impl Into<String>,
        checkpoint: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::PositionParseFailure {
            engine: engine.into(),
            checkpoint: checkpoint.into(),
            reason: reason.into(),
        }
    }

    pub fn external(
        service: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ExternalService {
            service: service.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Stable tag used in logs and as the workflow failure cause
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::ConfigNotFound { .. } => "config_not_found",
            Self::CheckpointMissing { .. } => "checkpoint_missing",
            Self::PositionParseFailure { .. } => "position_parse_failure",
            Self::ExternalService { .. } => "external_service_error",
            Self::Configuration(_) => "configuration_error",
            Self::InvalidInput(_) => "invalid_input",
            Self::Serialization(_) => "serialization_error",
            Self::EventBus(_) => "event_bus_error",
        }
    }

    /// All failures abort the step; the workflow runner decides whether to re-run it.
    pub fn is_fatal(&self) -> bool {
        true
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(error: serde_json::Error) -> Self {
        FlowError::Serialization(format!("JSON serialization error: {error}"))
    }
}

impl From<ConfigurationError> for FlowError {
    fn from(error: ConfigurationError) -> Self {
        FlowError::Configuration(error.to_string())
    }
}

pub type FlowResult<T> = std::result::Result<T, FlowError>;
