//! Configuration and fixture builders shared by the integration tests.

use chrono::{DateTime, TimeZone, Utc};
use replication_flow::choreography::{CronSchedule, JobFlowDefinition, WorkflowStepConfig};
use replication_flow::config::{FlowConfig, TaskConfig};
use replication_flow::constants::workflows;
use replication_flow::models::{Endpoint, InstanceConfig, JobConfig, MigrationType};
use replication_flow::services::InMemoryObjectStore;
use serde_json::json;

pub const INSTANCE_NAME: &str = "replication-instance-01";
pub const FULL_LOAD_JOB: &str = "orders-full-load";
pub const CDC_JOB: &str = "orders-cdc";
pub const CHECKPOINT_NAME: &str = "orders_stream";
pub const SOURCE_ENDPOINT: &str = "orders-source-postgres";
pub const TARGET_ENDPOINT: &str = "orders-target-s3";
pub const SOURCE_SECRET: &str = "replication/orders-source";

pub fn job(job_name: &str, migration_type: MigrationType) -> JobConfig {
    JobConfig {
        job_name: job_name.to_string(),
        job_checkpoint_name: CHECKPOINT_NAME.to_string(),
        migration_type,
        source_endpoint_id: SOURCE_ENDPOINT.to_string(),
        target_endpoint_id: TARGET_ENDPOINT.to_string(),
    }
}

pub fn full_load_job() -> JobConfig {
    job(FULL_LOAD_JOB, MigrationType::FullLoadAndCdc)
}

pub fn cdc_job() -> JobConfig {
    job(CDC_JOB, MigrationType::Cdc)
}

pub fn instance_config() -> InstanceConfig {
    InstanceConfig {
        instance_name: INSTANCE_NAME.to_string(),
        instance_type: "dms.t3.medium".to_string(),
        publicly_accessible: false,
        subnet_group: "replication-subnet-group".to_string(),
        security_group: None,
        availability_zone: None,
    }
}

pub fn endpoint(identifier: &str, engine_name: &str) -> Endpoint {
    Endpoint {
        endpoint_identifier: identifier.to_string(),
        endpoint_arn: format!("arn:aws:dms:endpoint:{identifier}"),
        engine_name: engine_name.to_string(),
        database_name: Some("orders".to_string()),
        secrets_manager_secret_id: Some(SOURCE_SECRET.to_string()),
    }
}

pub fn nightly_cron() -> CronSchedule {
    CronSchedule {
        minute: Some("0".to_string()),
        hour: Some("2".to_string()),
        ..Default::default()
    }
}

/// create instance (cron) → execute → post full load → delete task → delete instance
pub fn full_load_flow() -> JobFlowDefinition {
    JobFlowDefinition {
        job_name: FULL_LOAD_JOB.to_string(),
        instance_name: INSTANCE_NAME.to_string(),
        steps: vec![
            WorkflowStepConfig::new(workflows::CREATE_INSTANCE).with_cron(nightly_cron()),
            WorkflowStepConfig::new(workflows::EXECUTE_JOB),
            WorkflowStepConfig::new(workflows::POST_FULL_TASK_POSTGRES),
            WorkflowStepConfig::new(workflows::DELETE_TASK),
            WorkflowStepConfig::new(workflows::DELETE_INSTANCE),
        ],
    }
}

pub fn cdc_flow() -> JobFlowDefinition {
    JobFlowDefinition {
        job_name: CDC_JOB.to_string(),
        instance_name: INSTANCE_NAME.to_string(),
        steps: vec![
            WorkflowStepConfig::new(workflows::CREATE_INSTANCE).with_cron(nightly_cron()),
            WorkflowStepConfig::new(workflows::EXECUTE_JOB),
            WorkflowStepConfig::new(workflows::DELETE_TASK),
            WorkflowStepConfig::new(workflows::DELETE_INSTANCE),
        ],
    }
}

/// Configuration that polls without sleeping
pub fn test_config() -> FlowConfig {
    FlowConfig {
        task: TaskConfig {
            completion_poll_seconds: 0,
            completion_max_polls: 3,
            ..Default::default()
        },
        instances: vec![instance_config()],
        jobs: vec![full_load_job(), cdc_job()],
        job_flows: vec![full_load_flow(), cdc_flow()],
        ..Default::default()
    }
}

/// Object store holding settings and mappings for every job in `config`
pub fn artifact_store(config: &FlowConfig) -> InMemoryObjectStore {
    let store = InMemoryObjectStore::new();
    for job in &config.jobs {
        store.put_json(
            &config.stores.artifact_bucket,
            &config.stores.task_settings_key(&job.job_name),
            &json!({"TargetMetadata": {"SupportLobs": true}, "Logging": {"EnableLogging": true}}),
        );
        store.put_json(
            &config.stores.artifact_bucket,
            &config.stores.table_mappings_key(&job.job_name),
            &json!({"rules": [{"rule-type": "selection", "rule-id": "1", "object-locator": {"schema-name": "public", "table-name": "%"}, "rule-action": "include"}]}),
        );
    }
    store
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).single().unwrap()
}
