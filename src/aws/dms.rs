//! Database Migration Service rendition of [`ReplicationService`].
//!
//! Describe calls filter by identifier or ARN and map DMS's
//! `ResourceNotFoundFault` to `None`, leaving the not-found policy to the caller.

use super::sdk_error;
use crate::error::{FlowError, FlowResult};
use crate::models::{
    CreateTaskRequest, Endpoint, InstanceConfig, MigrationType, ReplicationInstance,
    ReplicationTask, StartReplicationTaskType,
};
use crate::services::ReplicationService;
use crate::utils::time::format_timestamp;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_databasemigration::primitives::DateTime as SdkDateTime;
use aws_sdk_databasemigration::types::{
    self as dms, Filter, MigrationTypeValue, StartReplicationTaskTypeValue,
};
use aws_sdk_databasemigration::Client;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{info, instrument};

const SERVICE: &str = "dms";

#[derive(Debug, Clone)]
pub struct DmsReplicationService {
    client: Client,
}

impl DmsReplicationService {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }

    async fn describe_tasks(&self, filter_name: &str, value: &str) -> FlowResult<Option<ReplicationTask>> {
        let result = self
            .client
            .describe_replication_tasks()
            .filters(filter(filter_name, value)?)
            .send()
            .await;

        match result {
            Ok(output) => output.replication_tasks().first().map(convert_task).transpose(),
            Err(e) if e
                .as_service_error()
                .is_some_and(|service| service.is_resource_not_found_fault()) =>
            {
                Ok(None)
            }
            Err(e) => Err(sdk_error(SERVICE, "DescribeReplicationTasks", e)),
        }
    }
}

fn filter(name: &str, value: &str) -> FlowResult<Filter> {
    Filter::builder()
        .name(name)
        .values(value)
        .build()
        .map_err(|e| sdk_error(SERVICE, "Filter", e))
}

fn format_sdk_date(date: &SdkDateTime) -> Option<String> {
    DateTime::<Utc>::from_timestamp(date.secs(), date.subsec_nanos()).map(format_timestamp)
}

fn task_statistics(stats: &dms::ReplicationTaskStats) -> Map<String, Value> {
    let mut metrics = Map::new();
    metrics.insert(
        "FullLoadProgressPercent".to_string(),
        Value::from(stats.full_load_progress_percent()),
    );
    metrics.insert(
        "ElapsedTimeMillis".to_string(),
        Value::from(stats.elapsed_time_millis()),
    );
    metrics.insert("TablesLoaded".to_string(), Value::from(stats.tables_loaded()));
    metrics.insert("TablesLoading".to_string(), Value::from(stats.tables_loading()));
    metrics.insert("TablesQueued".to_string(), Value::from(stats.tables_queued()));
    metrics.insert("TablesErrored".to_string(), Value::from(stats.tables_errored()));

    let dates = [
        ("FreshStartDate", stats.fresh_start_date()),
        ("StartDate", stats.start_date()),
        ("StopDate", stats.stop_date()),
        ("FullLoadStartDate", stats.full_load_start_date()),
        ("FullLoadFinishDate", stats.full_load_finish_date()),
    ];
    for (name, date) in dates {
        if let Some(formatted) = date.and_then(format_sdk_date) {
            metrics.insert(name.to_string(), Value::String(formatted));
        }
    }
    metrics
}

fn convert_task(task: &dms::ReplicationTask) -> FlowResult<ReplicationTask> {
    let migration_type = task
        .migration_type()
        .map(|value| value.as_str())
        .unwrap_or_default()
        .parse::<MigrationType>()
        .map_err(|e| FlowError::external(SERVICE, "DescribeReplicationTasks", e))?;

    Ok(ReplicationTask {
        replication_task_identifier: task.replication_task_identifier().unwrap_or_default().to_string(),
        replication_task_arn: task.replication_task_arn().unwrap_or_default().to_string(),
        source_endpoint_arn: task.source_endpoint_arn().unwrap_or_default().to_string(),
        target_endpoint_arn: task.target_endpoint_arn().unwrap_or_default().to_string(),
        replication_instance_arn: task.replication_instance_arn().unwrap_or_default().to_string(),
        migration_type,
        status: task.status().unwrap_or_default().to_string(),
        stop_reason: task.stop_reason().map(str::to_string),
        replication_task_creation_date: task.replication_task_creation_date().and_then(format_sdk_date),
        replication_task_start_date: task.replication_task_start_date().and_then(format_sdk_date),
        cdc_start_position: task.cdc_start_position().map(str::to_string),
        cdc_stop_position: task.cdc_stop_position().map(str::to_string),
        recovery_checkpoint: task.recovery_checkpoint().map(str::to_string),
        replication_task_stats: task.replication_task_stats().map(task_statistics),
    })
}

fn convert_instance(instance: &dms::ReplicationInstance) -> ReplicationInstance {
    ReplicationInstance {
        replication_instance_identifier: instance
            .replication_instance_identifier()
            .unwrap_or_default()
            .to_string(),
        replication_instance_arn: instance.replication_instance_arn().unwrap_or_default().to_string(),
        replication_instance_status: instance.replication_instance_status().map(str::to_string),
    }
}

fn convert_endpoint(endpoint: &dms::Endpoint) -> Endpoint {
    Endpoint {
        endpoint_identifier: endpoint.endpoint_identifier().unwrap_or_default().to_string(),
        endpoint_arn: endpoint.endpoint_arn().unwrap_or_default().to_string(),
        engine_name: endpoint.engine_name().unwrap_or_default().to_string(),
        database_name: endpoint.database_name().map(str::to_string),
        secrets_manager_secret_id: endpoint
            .postgre_sql_settings()
            .and_then(|settings| settings.secrets_manager_secret_id())
            .map(str::to_string),
    }
}

fn missing(operation: &str, what: &str) -> FlowError {
    FlowError::external(SERVICE, operation, format!("response carried no {what}"))
}

#[async_trait]
impl ReplicationService for DmsReplicationService {
    #[instrument(skip(self))]
    async fn describe_instance(
        &self,
        instance_identifier: &str,
    ) -> FlowResult<Option<ReplicationInstance>> {
        let result = self
            .client
            .describe_replication_instances()
            .filters(filter("replication-instance-id", instance_identifier)?)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output.replication_instances().first().map(convert_instance)),
            Err(e) if e
                .as_service_error()
                .is_some_and(|service| service.is_resource_not_found_fault()) =>
            {
                Ok(None)
            }
            Err(e) => Err(sdk_error(SERVICE, "DescribeReplicationInstances", e)),
        }
    }

    #[instrument(skip(self))]
    async fn describe_endpoint(&self, endpoint_identifier: &str) -> FlowResult<Option<Endpoint>> {
        let result = self
            .client
            .describe_endpoints()
            .filters(filter("endpoint-id", endpoint_identifier)?)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output.endpoints().first().map(convert_endpoint)),
            Err(e) if e
                .as_service_error()
                .is_some_and(|service| service.is_resource_not_found_fault()) =>
            {
                Ok(None)
            }
            Err(e) => Err(sdk_error(SERVICE, "DescribeEndpoints", e)),
        }
    }

    #[instrument(skip(self, request), fields(task_identifier = %request.replication_task_identifier))]
    async fn create_task(&self, request: &CreateTaskRequest) -> FlowResult<ReplicationTask> {
        let output = self
            .client
            .create_replication_task()
            .replication_task_identifier(&request.replication_task_identifier)
            .source_endpoint_arn(&request.source_endpoint_arn)
            .target_endpoint_arn(&request.target_endpoint_arn)
            .replication_instance_arn(&request.replication_instance_arn)
            .migration_type(MigrationTypeValue::from(request.migration_type.as_str()))
            .table_mappings(&request.table_mappings)
            .replication_task_settings(&request.replication_task_settings)
            .set_cdc_start_position(request.cdc_start_position.clone())
            .set_cdc_stop_position(request.cdc_stop_position.clone())
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "CreateReplicationTask", e))?;

        output
            .replication_task()
            .ok_or_else(|| missing("CreateReplicationTask", "replication task"))
            .and_then(convert_task)
    }

    #[instrument(skip(self))]
    async fn start_task(
        &self,
        task_arn: &str,
        start_type: StartReplicationTaskType,
    ) -> FlowResult<ReplicationTask> {
        let output = self
            .client
            .start_replication_task()
            .replication_task_arn(task_arn)
            .start_replication_task_type(StartReplicationTaskTypeValue::from(start_type.as_str()))
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "StartReplicationTask", e))?;

        output
            .replication_task()
            .ok_or_else(|| missing("StartReplicationTask", "replication task"))
            .and_then(convert_task)
    }

    async fn describe_task_by_arn(&self, task_arn: &str) -> FlowResult<Option<ReplicationTask>> {
        self.describe_tasks("replication-task-arn", task_arn).await
    }

    async fn describe_task_by_identifier(
        &self,
        task_identifier: &str,
    ) -> FlowResult<Option<ReplicationTask>> {
        self.describe_tasks("replication-task-id", task_identifier).await
    }

    #[instrument(skip(self))]
    async fn delete_task(&self, task_arn: &str) -> FlowResult<ReplicationTask> {
        let output = self
            .client
            .delete_replication_task()
            .replication_task_arn(task_arn)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "DeleteReplicationTask", e))?;

        output
            .replication_task()
            .ok_or_else(|| missing("DeleteReplicationTask", "replication task"))
            .and_then(convert_task)
    }

    #[instrument(skip(self, instance), fields(instance_name = %instance.instance_name))]
    async fn create_instance(&self, instance: &InstanceConfig) -> FlowResult<ReplicationInstance> {
        let output = self
            .client
            .create_replication_instance()
            .replication_instance_identifier(&instance.instance_name)
            .replication_instance_class(&instance.instance_type)
            .publicly_accessible(instance.publicly_accessible)
            .replication_subnet_group_identifier(&instance.subnet_group)
            .set_vpc_security_group_ids(instance.security_group.clone().map(|group| vec![group]))
            .set_availability_zone(instance.availability_zone.clone())
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "CreateReplicationInstance", e))?;

        let created = output
            .replication_instance()
            .map(convert_instance)
            .ok_or_else(|| missing("CreateReplicationInstance", "replication instance"))?;
        info!(instance_arn = %created.replication_instance_arn, "Replication instance requested");
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn delete_instance(&self, instance_arn: &str) -> FlowResult<ReplicationInstance> {
        let output = self
            .client
            .delete_replication_instance()
            .replication_instance_arn(instance_arn)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "DeleteReplicationInstance", e))?;

        output
            .replication_instance()
            .map(convert_instance)
            .ok_or_else(|| missing("DeleteReplicationInstance", "replication instance"))
    }
}
