use serde::{Deserialize, Serialize};

/// Sizing and placement of the ephemeral compute instance a job chain runs on.
///
/// The instance is created and destroyed once per chain run; `instance_name` is
/// the stable handle reused across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub instance_name: String,
    pub instance_type: String,
    #[serde(default)]
    pub publicly_accessible: bool,
    pub subnet_group: String,
    #[serde(default)]
    pub security_group: Option<String>,
    #[serde(default)]
    pub availability_zone: Option<String>,
}

/// Replication instance as described by the replication service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicationInstance {
    pub replication_instance_identifier: String,
    pub replication_instance_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_instance_status: Option<String>,
}

impl ReplicationInstance {
    pub fn is_deleting(&self) -> bool {
        self.replication_instance_status.as_deref() == Some(crate::constants::instance_status::DELETING)
    }
}

/// Source or target endpoint as described by the replication service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Endpoint {
    pub endpoint_identifier: String,
    pub endpoint_arn: String,
    /// Engine family, e.g. `postgresql`, `aurora-postgresql`, `mysql`, `aurora`
    pub engine_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    /// Secret holding the source credentials (PostgreSQL endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets_manager_secret_id: Option<String>,
}
