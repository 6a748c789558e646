//! Proptest strategies for job flows and checkpoint strings.

use proptest::collection::vec;
use proptest::prelude::*;
use replication_flow::choreography::{CronSchedule, JobFlowDefinition, WorkflowStepConfig};

pub fn job_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{2,24}"
}

pub fn state_machine_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{3,30}_workflow"
}

pub fn step_strategy() -> impl Strategy<Value = WorkflowStepConfig> {
    (state_machine_name_strategy(), any::<bool>(), prop::option::of(0u8..60)).prop_map(
        |(name, enabled, minute)| WorkflowStepConfig {
            state_machine_name: name,
            enabled,
            cron: minute.map(|minute| CronSchedule {
                minute: Some(minute.to_string()),
                ..Default::default()
            }),
        },
    )
}

/// Flows of 1 to 8 steps; any step may be disabled or scheduled
pub fn job_flow_strategy() -> impl Strategy<Value = JobFlowDefinition> {
    (job_name_strategy(), vec(step_strategy(), 1..8)).prop_map(|(job_name, steps)| {
        JobFlowDefinition {
            job_name,
            instance_name: "replication-instance-01".to_string(),
            steps,
        }
    })
}

/// Flows of enabled, unscheduled steps only
pub fn linear_flow_strategy() -> impl Strategy<Value = JobFlowDefinition> {
    (job_name_strategy(), vec(state_machine_name_strategy(), 1..8)).prop_map(
        |(job_name, names)| JobFlowDefinition {
            job_name,
            instance_name: "replication-instance-01".to_string(),
            steps: names.into_iter().map(WorkflowStepConfig::new).collect(),
        },
    )
}

/// PostgreSQL-style LSN: hex high word, slash, hex low word
pub fn lsn_strategy() -> impl Strategy<Value = String> {
    ("[0-9A-F]{1,8}", "[0-9A-F]{1,8}").prop_map(|(high, low)| format!("{high}/{low}"))
}
