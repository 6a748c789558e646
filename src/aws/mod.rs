//! # AWS Adapters
//!
//! Production implementations of the service boundaries, built on the AWS SDK:
//!
//! | Boundary | Service |
//! |---|---|
//! | [`CheckpointStore`](crate::checkpoint::CheckpointStore) | DynamoDB |
//! | [`ObjectStore`](crate::services::ObjectStore) | S3 |
//! | [`ReplicationService`](crate::services::ReplicationService) | Database Migration Service |
//! | [`EventBus`](crate::choreography::EventBus) | EventBridge |
//! | [`SecretResolver`](crate::services::SecretResolver) | Secrets Manager |
//! | [`FailureNotifier`](crate::services::FailureNotifier) | SNS |
//!
//! All clients share one SDK configuration loaded from the default provider chain.

pub mod dms;
pub mod dynamodb;
pub mod eventbridge;
pub mod s3;
pub mod secrets_manager;
pub mod sns;

pub use dms::DmsReplicationService;
pub use dynamodb::DynamoCheckpointStore;
pub use eventbridge::EventBridgeBus;
pub use s3::S3ObjectStore;
pub use secrets_manager::SecretsManagerResolver;
pub use sns::SnsFailureNotifier;

use crate::error::FlowError;
use aws_config::{BehaviorVersion, SdkConfig};
use tracing::info;

/// SDK configuration from the environment, profile, or instance role
pub async fn load_sdk_config() -> SdkConfig {
    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    info!(region = ?config.region(), "AWS SDK configuration loaded");
    config
}

/// Wrap an SDK failure with the service and operation that produced it
pub(crate) fn sdk_error(
    service: &str,
    operation: &str,
    error: impl std::fmt::Display,
) -> FlowError {
    FlowError::external(service, operation, error.to_string())
}
