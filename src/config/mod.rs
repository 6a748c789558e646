//! # Replication Flow Configuration
//!
//! Deployment configuration resolved once at startup and passed explicitly into
//! every component's constructor. Nothing in the crate reads configuration from
//! ambient or global state.
//!
//! ## Sources
//!
//! Layered with the `config` crate, later sources winning:
//!
//! 1. `{dir}/base.{toml,yaml,yml,json}`
//! 2. `{dir}/{environment}.{toml,yaml,yml,json}` (optional)
//! 3. Environment variables `REPLICATION_FLOW__SECTION__KEY`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use replication_flow::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let registry = manager.registry();
//! let job = registry.job("orders-full-load")?;
//! println!("{} uses checkpoint {}", job.job_name, job.job_checkpoint_name);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;
pub mod registry;

use crate::choreography::JobFlowDefinition;
use crate::constants::{
    artifacts, DEFAULT_CDC_STOP_WINDOW_MINUTES, EVENT_SOURCE, FINISH_EVENT_DETAIL_TYPE,
    MAX_CDC_STOP_WINDOW_MINUTES,
};
use crate::models::{InstanceConfig, JobConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;
pub use registry::JobRegistry;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FlowConfig {
    /// Checkpoint/metrics tables and the task artifact bucket
    #[serde(default)]
    pub stores: StoresConfig,

    /// Shared event bus finish events are published on
    #[serde(default)]
    pub event_bus: EventBusConfig,

    /// Task creation and completion settings
    #[serde(default)]
    pub task: TaskConfig,

    /// Where operators are told about failed workflow runs
    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub instances: Vec<InstanceConfig>,

    #[serde(default)]
    pub jobs: Vec<JobConfig>,

    #[serde(default)]
    pub job_flows: Vec<JobFlowDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoresConfig {
    pub checkpoints_table: String,
    pub metrics_table: String,
    pub artifact_bucket: String,
    pub jobs_config_prefix: String,
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            checkpoints_table: "replication_checkpoints".to_string(),
            metrics_table: "replication_metrics".to_string(),
            artifact_bucket: "replication-artifacts".to_string(),
            jobs_config_prefix: "replication_jobs".to_string(),
        }
    }
}

impl StoresConfig {
    /// `{prefix}/{job_name}/settings.json`
    pub fn task_settings_key(&self, job_name: &str) -> String {
        self.artifact_key(job_name, artifacts::TASK_SETTINGS)
    }

    /// `{prefix}/{job_name}/mappings.json`
    pub fn table_mappings_key(&self, job_name: &str) -> String {
        self.artifact_key(job_name, artifacts::TABLE_MAPPINGS)
    }

    fn artifact_key(&self, job_name: &str, artifact: &str) -> String {
        let prefix = self.jobs_config_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            format!("{job_name}/{artifact}")
        } else {
            format!("{prefix}/{job_name}/{artifact}")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EventBusConfig {
    pub name: String,
    pub source: String,
    pub finish_detail_type: String,
    /// Role the bus assumes to start target workflows
    pub target_role_arn: Option<String>,
    /// Prefix turning a workflow name into the ARN the bus targets
    pub state_machine_arn_prefix: Option<String>,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            name: "replication-event-bus".to_string(),
            source: EVENT_SOURCE.to_string(),
            finish_detail_type: FINISH_EVENT_DETAIL_TYPE.to_string(),
            target_role_arn: None,
            state_machine_arn_prefix: None,
        }
    }
}

impl EventBusConfig {
    pub fn state_machine_arn(&self, state_machine_name: &str) -> String {
        match &self.state_machine_arn_prefix {
            Some(prefix) => format!("{prefix}{state_machine_name}"),
            None => state_machine_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// SNS topic failure notifications are published to; none disables them
    pub topic_arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TaskConfig {
    /// How far past task creation a CDC task may run
    pub cdc_stop_window_minutes: i64,
    /// Engine name to position regex, merged over the built-in table
    pub position_patterns: HashMap<String, String>,
    pub completion_poll_seconds: u64,
    pub completion_max_polls: u32,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            cdc_stop_window_minutes: DEFAULT_CDC_STOP_WINDOW_MINUTES,
            position_patterns: HashMap::new(),
            completion_poll_seconds: 30,
            completion_max_polls: 240,
        }
    }
}

impl TaskConfig {
    /// `None` outside `1..=MAX_CDC_STOP_WINDOW_MINUTES`
    pub fn cdc_stop_window(&self) -> Option<chrono::Duration> {
        (1..=MAX_CDC_STOP_WINDOW_MINUTES)
            .contains(&self.cdc_stop_window_minutes)
            .then(|| chrono::Duration::try_minutes(self.cdc_stop_window_minutes))
            .flatten()
    }

    pub fn completion_poll_interval(&self) -> Duration {
        Duration::from_secs(self.completion_poll_seconds)
    }
}

impl FlowConfig {
    /// Check cross-references and values that deserialization alone cannot
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("stores.checkpoints_table", &self.stores.checkpoints_table),
            ("stores.metrics_table", &self.stores.metrics_table),
            ("stores.artifact_bucket", &self.stores.artifact_bucket),
            ("event_bus.name", &self.event_bus.name),
            ("event_bus.source", &self.event_bus.source),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    field,
                    "replication flow configuration",
                ));
            }
        }

        if self.task.cdc_stop_window().is_none() {
            return Err(ConfigurationError::invalid_value(
                "task.cdc_stop_window_minutes",
                self.task.cdc_stop_window_minutes.to_string(),
                format!("must be between 1 and {MAX_CDC_STOP_WINDOW_MINUTES} minutes"),
            ));
        }
        if let Some(topic_arn) = &self.notifications.topic_arn {
            if !topic_arn.starts_with("arn:") || !topic_arn.contains(":sns:") {
                return Err(ConfigurationError::invalid_value(
                    "notifications.topic_arn",
                    topic_arn.clone(),
                    "must be an SNS topic ARN",
                ));
            }
        }
        if self.task.completion_max_polls == 0 {
            return Err(ConfigurationError::invalid_value(
                "task.completion_max_polls",
                "0",
                "at least one poll is required",
            ));
        }

        for (engine, pattern) in &self.task.position_patterns {
            Regex::new(pattern).map_err(|e| {
                ConfigurationError::invalid_value(
                    format!("task.position_patterns.{engine}"),
                    pattern.clone(),
                    e.to_string(),
                )
            })?;
        }

        let mut instance_names = HashSet::new();
        for instance in &self.instances {
            if !instance_names.insert(instance.instance_name.as_str()) {
                return Err(ConfigurationError::duplicate_name(
                    "instance",
                    &instance.instance_name,
                ));
            }
        }

        let mut job_names = HashSet::new();
        for job in &self.jobs {
            if !job_names.insert(job.job_name.as_str()) {
                return Err(ConfigurationError::duplicate_name("job", &job.job_name));
            }
        }

        let mut flow_names = HashSet::new();
        for flow in &self.job_flows {
            if !flow_names.insert(flow.job_name.as_str()) {
                return Err(ConfigurationError::duplicate_name("job flow", &flow.job_name));
            }
            if !job_names.contains(flow.job_name.as_str()) {
                return Err(ConfigurationError::unknown_reference(
                    &flow.job_name,
                    "job",
                    &flow.job_name,
                ));
            }
            if !instance_names.contains(flow.instance_name.as_str()) {
                return Err(ConfigurationError::unknown_reference(
                    &flow.job_name,
                    "instance",
                    &flow.instance_name,
                ));
            }
            if flow.steps.is_empty() {
                return Err(ConfigurationError::validation_error(format!(
                    "Job flow '{}' has no steps",
                    flow.job_name
                )));
            }
            for (index, step) in flow.steps.iter().enumerate() {
                if let Some(cron) = &step.cron {
                    cron.validate().map_err(|reason| {
                        ConfigurationError::invalid_value(
                            format!("job_flows.{}.steps[{index}].cron", flow.job_name),
                            cron.expression(),
                            reason,
                        )
                    })?;
                }
            }
        }

        Ok(())
    }
}
