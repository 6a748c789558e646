use super::job::{MigrationType, StartReplicationTaskType};
use crate::error::FlowResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Replication task descriptor returned by the replication service.
///
/// Field names follow the service's wire names so the descriptor can be handed
/// to the next workflow step untouched. Dates are already rendered as
/// `%Y-%m-%dT%H:%M:%S`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicationTask {
    pub replication_task_identifier: String,
    pub replication_task_arn: String,
    pub source_endpoint_arn: String,
    pub target_endpoint_arn: String,
    pub replication_instance_arn: String,
    pub migration_type: MigrationType,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_task_creation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_task_start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdc_start_position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdc_stop_position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_checkpoint: Option<String>,
    /// Statistics block, kept as the service's flat name → value mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_task_stats: Option<Map<String, Value>>,
}

impl ReplicationTask {
    pub fn is_stopped(&self) -> bool {
        self.status == crate::constants::task_status::STOPPED
    }

    pub fn is_failed(&self) -> bool {
        self.status == crate::constants::task_status::FAILED
    }
}

/// Parameters of a `createTask` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTaskRequest {
    /// Always the job name, so at most one task exists per job at a time
    pub replication_task_identifier: String,
    pub source_endpoint_arn: String,
    pub target_endpoint_arn: String,
    pub replication_instance_arn: String,
    pub migration_type: MigrationType,
    /// JSON document, passed verbatim
    pub replication_task_settings: String,
    /// JSON document, passed verbatim
    pub table_mappings: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdc_start_position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdc_stop_position: Option<String>,
}

/// Result of task creation: the created descriptor plus the start operation the
/// next step must use.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedTask {
    pub task: ReplicationTask,
    pub start_replication_task_type: StartReplicationTaskType,
}

impl CreatedTask {
    /// Step output consumed by the start/wait states: `Status` is wrapped as
    /// `{"LatestStatus": ...}` and `StartReplicationTaskType` is added.
    pub fn to_step_output(&self) -> FlowResult<Value> {
        let mut output = serde_json::to_value(&self.task)?;
        if let Value::Object(fields) = &mut output {
            fields.insert(
                "Status".to_string(),
                json!({ "LatestStatus": self.task.status }),
            );
            fields.insert(
                "StartReplicationTaskType".to_string(),
                Value::String(self.start_replication_task_type.as_str().to_string()),
            );
        }
        Ok(output)
    }
}
