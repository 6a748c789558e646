//! # System Constants
//!
//! Wire-level names shared by every component that publishes to or matches on the
//! replication event bus, plus the fixed values of the checkpoint tables.

/// Event source stamped on every finish event
pub const EVENT_SOURCE: &str = "custom.replication";

/// Detail type of a workflow finish event
pub const FINISH_EVENT_DETAIL_TYPE: &str = "Replication Workflow Finished";

/// Event path of the finish payload a chained target receives
pub const WORKFLOW_OUTPUT_PATH: &str = "$.detail.WorkflowOutput";

/// `job_start` value of the checkpoint record that always holds the newest position
pub const LATEST_CHECKPOINT_JOB_START: &str = "latest";

/// Timestamp layout for task dates, checkpoint keys and CDC stop positions
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Prefix of a CDC stop position expressed as a commit time
pub const COMMIT_TIME_PREFIX: &str = "commit_time:";

/// Default bound on how long a CDC task runs past its creation
pub const DEFAULT_CDC_STOP_WINDOW_MINUTES: i64 = 5;

/// One week
pub const MAX_CDC_STOP_WINDOW_MINUTES: i64 = 7 * 24 * 60;

/// Object names below `{prefix}/{job_name}/`
pub mod artifacts {
    pub const TASK_SETTINGS: &str = "settings.json";
    pub const TABLE_MAPPINGS: &str = "mappings.json";
}

/// Replication task statuses reported by the replication service
pub mod task_status {
    pub const READY: &str = "ready";
    pub const RUNNING: &str = "running";
    pub const STOPPED: &str = "stopped";
    pub const FAILED: &str = "failed";
    pub const DELETING: &str = "deleting";
}

/// Checkpoint and metrics table attribute names
pub mod attributes {
    pub const JOB_CHECKPOINT_NAME: &str = "job_checkpoint_name";
    pub const JOB_START: &str = "job_start";
    pub const JOB_NAME: &str = "job_name";
    pub const CHECKPOINT: &str = "checkpoint";
}

/// Replication instance statuses reported by the replication service
pub mod instance_status {
    pub const CREATING: &str = "creating";
    pub const AVAILABLE: &str = "available";
    pub const DELETING: &str = "deleting";
}

/// Default names of the step workflows a job flow chains together
pub mod workflows {
    pub const CREATE_INSTANCE: &str = "create_instance_workflow";
    pub const EXECUTE_JOB: &str = "execute_job_workflow";
    pub const POST_FULL_TASK_POSTGRES: &str = "post_full_task_postgres";
    pub const DELETE_TASK: &str = "delete_task_workflow";
    pub const DELETE_INSTANCE: &str = "delete_instance_workflow";
}
