//! In-process stand-ins for the replication service, the secret store and the
//! source database.

use super::builders::{FULL_LOAD_JOB, INSTANCE_NAME, SOURCE_ENDPOINT, TARGET_ENDPOINT};
use async_trait::async_trait;
use parking_lot::Mutex;
use replication_flow::constants::{instance_status, task_status};
use replication_flow::database::{DuplicatedSlot, ReplicationSlotSession, SourceDatabaseConnector};
use replication_flow::error::{FlowError, FlowResult};
use replication_flow::models::{
    CreateTaskRequest, Endpoint, InstanceConfig, MigrationType, ReplicationInstance,
    ReplicationTask, StartReplicationTaskType,
};
use replication_flow::services::{ReplicationService, SecretResolver, SourceCredentials};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// What the next started task reports once it stops
#[derive(Debug, Clone)]
pub struct RunResult {
    pub start_date: String,
    pub recovery_checkpoint: String,
    pub status: String,
    pub stop_reason: String,
    pub stats: Map<String, Value>,
}

impl RunResult {
    pub fn stopped(start_date: &str, recovery_checkpoint: &str) -> Self {
        let stats = json!({
            "FullLoadProgressPercent": 100,
            "ElapsedTimeMillis": 5231,
            "TablesLoaded": 3,
            "TablesErrored": 0
        });
        Self {
            start_date: start_date.to_string(),
            recovery_checkpoint: recovery_checkpoint.to_string(),
            status: task_status::STOPPED.to_string(),
            stop_reason: "Stop Reason FULL_LOAD_ONLY_FINISHED".to_string(),
            stats: stats.as_object().cloned().unwrap_or_default(),
        }
    }

    pub fn failed(start_date: &str) -> Self {
        Self {
            status: task_status::FAILED.to_string(),
            stop_reason: "Last Error Table error".to_string(),
            ..Self::stopped(start_date, "")
        }
    }
}

#[derive(Debug, Default)]
struct ReplicationState {
    instances: HashMap<String, ReplicationInstance>,
    endpoints: HashMap<String, Endpoint>,
    tasks: Vec<ReplicationTask>,
    created_requests: Vec<CreateTaskRequest>,
    started: Vec<(String, StartReplicationTaskType)>,
    deleted_tasks: Vec<String>,
    deleted_instances: Vec<String>,
    created_instances: Vec<String>,
    run_results: Vec<RunResult>,
    /// How many describes a deleted resource still answers as `deleting`
    deletion_polls: u32,
    /// task ARN → describes left before it disappears
    deleting_tasks: HashMap<String, u32>,
    /// instance name → describes left before it disappears
    deleting_instances: HashMap<String, u32>,
}

impl ReplicationState {
    fn describe_task_where(
        &mut self,
        matches: impl Fn(&ReplicationTask) -> bool,
    ) -> Option<ReplicationTask> {
        let position = self.tasks.iter().position(|task| matches(task))?;
        let arn = self.tasks[position].replication_task_arn.clone();
        match self.deleting_tasks.get(&arn).copied() {
            Some(0) => {
                self.deleting_tasks.remove(&arn);
                self.tasks.remove(position);
                None
            }
            Some(remaining) => {
                self.deleting_tasks.insert(arn, remaining - 1);
                Some(self.tasks[position].clone())
            }
            None => Some(self.tasks[position].clone()),
        }
    }
}

/// Replication service whose tasks stop as soon as they start
#[derive(Debug, Default)]
pub struct FakeReplicationService {
    state: Mutex<ReplicationState>,
}

impl FakeReplicationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_available_instance(self, name: &str) -> Self {
        self.state.lock().instances.insert(
            name.to_string(),
            ReplicationInstance {
                replication_instance_identifier: name.to_string(),
                replication_instance_arn: format!("arn:aws:dms:rep:{name}"),
                replication_instance_status: Some(instance_status::AVAILABLE.to_string()),
            },
        );
        self
    }

    pub fn with_endpoint(self, endpoint: Endpoint) -> Self {
        self.state
            .lock()
            .endpoints
            .insert(endpoint.endpoint_identifier.clone(), endpoint);
        self
    }

    pub fn with_task(self, task: ReplicationTask) -> Self {
        self.state.lock().tasks.push(task);
        self
    }

    /// Deleted tasks and instances stay `deleting` for `polls` describes
    pub fn with_deletion_polls(self, polls: u32) -> Self {
        self.state.lock().deletion_polls = polls;
        self
    }

    /// Queue the outcome of the next `start_task`; runs without one stop at `0/0`
    pub fn push_run_result(&self, result: RunResult) {
        self.state.lock().run_results.push(result);
    }

    pub fn created_requests(&self) -> Vec<CreateTaskRequest> {
        self.state.lock().created_requests.clone()
    }

    pub fn started(&self) -> Vec<(String, StartReplicationTaskType)> {
        self.state.lock().started.clone()
    }

    pub fn task(&self, identifier: &str) -> Option<ReplicationTask> {
        self.state
            .lock()
            .tasks
            .iter()
            .find(|task| task.replication_task_identifier == identifier)
            .cloned()
    }

    pub fn task_count(&self) -> usize {
        self.state.lock().tasks.len()
    }

    pub fn deleted_tasks(&self) -> Vec<String> {
        self.state.lock().deleted_tasks.clone()
    }

    pub fn deleted_instances(&self) -> Vec<String> {
        self.state.lock().deleted_instances.clone()
    }

    pub fn created_instances(&self) -> Vec<String> {
        self.state.lock().created_instances.clone()
    }

    pub fn instance_exists(&self, name: &str) -> bool {
        self.state.lock().instances.contains_key(name)
    }
}

pub fn task_arn(identifier: &str) -> String {
    format!("arn:aws:dms:task:{identifier}")
}

/// The full-load task as it looks once its run has stopped
pub fn stopped_full_load(recovery_checkpoint: Option<&str>) -> ReplicationTask {
    ReplicationTask {
        replication_task_identifier: FULL_LOAD_JOB.to_string(),
        replication_task_arn: task_arn(FULL_LOAD_JOB),
        source_endpoint_arn: format!("arn:aws:dms:endpoint:{SOURCE_ENDPOINT}"),
        target_endpoint_arn: format!("arn:aws:dms:endpoint:{TARGET_ENDPOINT}"),
        replication_instance_arn: format!("arn:aws:dms:rep:{INSTANCE_NAME}"),
        migration_type: MigrationType::FullLoadAndCdc,
        status: "stopped".to_string(),
        stop_reason: Some("Stop Reason FULL_LOAD_ONLY_FINISHED".to_string()),
        replication_task_creation_date: Some("2024-03-01T09:58:00".to_string()),
        replication_task_start_date: Some("2024-03-01T10:00:00".to_string()),
        cdc_start_position: None,
        cdc_stop_position: None,
        recovery_checkpoint: recovery_checkpoint.map(str::to_string),
        replication_task_stats: None,
    }
}

#[async_trait]
impl ReplicationService for FakeReplicationService {
    async fn describe_instance(
        &self,
        instance_identifier: &str,
    ) -> FlowResult<Option<ReplicationInstance>> {
        let mut state = self.state.lock();
        match state.deleting_instances.get(instance_identifier).copied() {
            Some(0) => {
                state.deleting_instances.remove(instance_identifier);
                state.instances.remove(instance_identifier);
                return Ok(None);
            }
            Some(remaining) => {
                state
                    .deleting_instances
                    .insert(instance_identifier.to_string(), remaining - 1);
            }
            None => {}
        }
        let Some(instance) = state.instances.get_mut(instance_identifier) else {
            return Ok(None);
        };
        let described = instance.clone();
        // Creation completes between two polls
        if described.replication_instance_status.as_deref() == Some(instance_status::CREATING) {
            instance.replication_instance_status = Some(instance_status::AVAILABLE.to_string());
        }
        Ok(Some(described))
    }

    async fn describe_endpoint(&self, endpoint_identifier: &str) -> FlowResult<Option<Endpoint>> {
        Ok(self.state.lock().endpoints.get(endpoint_identifier).cloned())
    }

    async fn create_task(&self, request: &CreateTaskRequest) -> FlowResult<ReplicationTask> {
        let mut state = self.state.lock();
        if state
            .tasks
            .iter()
            .any(|task| task.replication_task_identifier == request.replication_task_identifier)
        {
            return Err(FlowError::external(
                "dms",
                "CreateReplicationTask",
                format!("task {} already exists", request.replication_task_identifier),
            ));
        }

        let task = ReplicationTask {
            replication_task_identifier: request.replication_task_identifier.clone(),
            replication_task_arn: task_arn(&request.replication_task_identifier),
            source_endpoint_arn: request.source_endpoint_arn.clone(),
            target_endpoint_arn: request.target_endpoint_arn.clone(),
            replication_instance_arn: request.replication_instance_arn.clone(),
            migration_type: request.migration_type,
            status: task_status::READY.to_string(),
            stop_reason: None,
            replication_task_creation_date: Some("2024-03-01T09:58:00".to_string()),
            replication_task_start_date: None,
            cdc_start_position: request.cdc_start_position.clone(),
            cdc_stop_position: request.cdc_stop_position.clone(),
            recovery_checkpoint: None,
            replication_task_stats: None,
        };
        state.created_requests.push(request.clone());
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn start_task(
        &self,
        task_arn: &str,
        start_type: StartReplicationTaskType,
    ) -> FlowResult<ReplicationTask> {
        let mut state = self.state.lock();
        let result = if state.run_results.is_empty() {
            RunResult::stopped("2024-03-01T10:00:00", "0/0")
        } else {
            state.run_results.remove(0)
        };
        state.started.push((task_arn.to_string(), start_type));

        let task = state
            .tasks
            .iter_mut()
            .find(|task| task.replication_task_arn == task_arn)
            .ok_or_else(|| FlowError::not_found("replication task", task_arn))?;
        task.status = result.status;
        task.stop_reason = Some(result.stop_reason);
        task.replication_task_start_date = Some(result.start_date);
        task.recovery_checkpoint =
            Some(result.recovery_checkpoint).filter(|checkpoint| !checkpoint.is_empty());
        task.replication_task_stats = Some(result.stats);
        Ok(task.clone())
    }

    async fn describe_task_by_arn(&self, task_arn: &str) -> FlowResult<Option<ReplicationTask>> {
        Ok(self
            .state
            .lock()
            .describe_task_where(|task| task.replication_task_arn == task_arn))
    }

    async fn describe_task_by_identifier(
        &self,
        task_identifier: &str,
    ) -> FlowResult<Option<ReplicationTask>> {
        Ok(self
            .state
            .lock()
            .describe_task_where(|task| task.replication_task_identifier == task_identifier))
    }

    async fn delete_task(&self, task_arn: &str) -> FlowResult<ReplicationTask> {
        let mut state = self.state.lock();
        let position = state
            .tasks
            .iter()
            .position(|task| task.replication_task_arn == task_arn)
            .ok_or_else(|| FlowError::not_found("replication task", task_arn))?;
        state.deleted_tasks.push(task_arn.to_string());
        if state.deletion_polls == 0 {
            let mut task = state.tasks.remove(position);
            task.status = task_status::DELETING.to_string();
            return Ok(task);
        }

        let polls = state.deletion_polls;
        state.deleting_tasks.insert(task_arn.to_string(), polls);
        let task = &mut state.tasks[position];
        task.status = task_status::DELETING.to_string();
        Ok(task.clone())
    }

    async fn create_instance(&self, instance: &InstanceConfig) -> FlowResult<ReplicationInstance> {
        let mut state = self.state.lock();
        if state.instances.contains_key(&instance.instance_name) {
            return Err(FlowError::external(
                "dms",
                "CreateReplicationInstance",
                format!("ResourceAlreadyExistsFault: {}", instance.instance_name),
            ));
        }
        let created = ReplicationInstance {
            replication_instance_identifier: instance.instance_name.clone(),
            replication_instance_arn: format!("arn:aws:dms:rep:{}", instance.instance_name),
            replication_instance_status: Some(instance_status::CREATING.to_string()),
        };
        state
            .instances
            .insert(instance.instance_name.clone(), created.clone());
        state.created_instances.push(instance.instance_name.clone());
        Ok(created)
    }

    async fn delete_instance(&self, instance_arn: &str) -> FlowResult<ReplicationInstance> {
        let mut state = self.state.lock();
        let name = state
            .instances
            .iter()
            .find(|(_, instance)| instance.replication_instance_arn == instance_arn)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| FlowError::not_found("replication instance", instance_arn))?;
        if state
            .tasks
            .iter()
            .any(|task| task.replication_instance_arn == instance_arn)
        {
            return Err(FlowError::external(
                "dms",
                "DeleteReplicationInstance",
                format!("InvalidResourceStateFault: {name} still has replication tasks"),
            ));
        }

        state.deleted_instances.push(instance_arn.to_string());
        if state.deletion_polls == 0 {
            let mut instance = state
                .instances
                .remove(&name)
                .ok_or_else(|| FlowError::not_found("replication instance", instance_arn))?;
            instance.replication_instance_status = Some(instance_status::DELETING.to_string());
            return Ok(instance);
        }

        let polls = state.deletion_polls;
        state.deleting_instances.insert(name.clone(), polls);
        let instance = state
            .instances
            .get_mut(&name)
            .ok_or_else(|| FlowError::not_found("replication instance", instance_arn))?;
        instance.replication_instance_status = Some(instance_status::DELETING.to_string());
        Ok(instance.clone())
    }
}

#[derive(Debug, Default)]
pub struct FakeSecretResolver {
    secrets: HashMap<String, String>,
}

impl FakeSecretResolver {
    pub fn with_secret(mut self, secret_id: &str, value: Value) -> Self {
        self.secrets.insert(secret_id.to_string(), value.to_string());
        self
    }

    pub fn with_raw_secret(mut self, secret_id: &str, value: &str) -> Self {
        self.secrets.insert(secret_id.to_string(), value.to_string());
        self
    }
}

pub fn source_credentials_secret() -> Value {
    json!({
        "username": "replicator",
        "password": "s3cr3t",
        "host": "orders-db.internal",
        "port": 5432,
        "dbname": "orders"
    })
}

#[async_trait]
impl SecretResolver for FakeSecretResolver {
    async fn resolve_secret(&self, secret_id: &str) -> FlowResult<String> {
        self.secrets
            .get(secret_id)
            .cloned()
            .ok_or_else(|| FlowError::not_found("secret", secret_id))
    }
}

#[derive(Debug, Default)]
struct SlotState {
    /// slot name → restart LSN
    slots: Vec<(String, String)>,
    copies: Vec<(String, String)>,
    connections: Vec<(String, String)>,
    closed: usize,
}

/// Source database holding logical replication slots
#[derive(Debug, Clone, Default)]
pub struct FakeSlotConnector {
    state: Arc<Mutex<SlotState>>,
}

impl FakeSlotConnector {
    pub fn with_slot(self, slot_name: &str, restart_lsn: &str) -> Self {
        self.state
            .lock()
            .slots
            .push((slot_name.to_string(), restart_lsn.to_string()));
        self
    }

    pub fn copies(&self) -> Vec<(String, String)> {
        self.state.lock().copies.clone()
    }

    /// `(host, database)` of every session opened
    pub fn connections(&self) -> Vec<(String, String)> {
        self.state.lock().connections.clone()
    }

    pub fn closed_sessions(&self) -> usize {
        self.state.lock().closed
    }

    pub fn slot_names(&self) -> Vec<String> {
        self.state.lock().slots.iter().map(|(name, _)| name.clone()).collect()
    }
}

#[async_trait]
impl SourceDatabaseConnector for FakeSlotConnector {
    async fn connect(
        &self,
        credentials: &SourceCredentials,
        database: &str,
    ) -> FlowResult<Box<dyn ReplicationSlotSession>> {
        self.state
            .lock()
            .connections
            .push((credentials.host.clone(), database.to_string()));
        Ok(Box::new(FakeSlotSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSlotSession {
    state: Arc<Mutex<SlotState>>,
}

#[async_trait]
impl ReplicationSlotSession for FakeSlotSession {
    async fn find_slot_by_restart_lsn(&mut self, lsn: &str) -> FlowResult<Option<String>> {
        Ok(self
            .state
            .lock()
            .slots
            .iter()
            .find(|(_, restart_lsn)| restart_lsn == lsn)
            .map(|(name, _)| name.clone()))
    }

    async fn copy_logical_slot(
        &mut self,
        source_slot: &str,
        target_slot: &str,
    ) -> FlowResult<DuplicatedSlot> {
        let mut state = self.state.lock();
        let lsn = state
            .slots
            .iter()
            .find(|(name, _)| name == source_slot)
            .map(|(_, lsn)| lsn.clone())
            .ok_or_else(|| FlowError::not_found("replication slot", source_slot))?;
        if state.slots.iter().any(|(name, _)| name == target_slot) {
            return Err(FlowError::external(
                "postgresql",
                "copy_logical_replication_slot",
                format!("replication slot \"{target_slot}\" already exists"),
            ));
        }
        state.slots.push((target_slot.to_string(), lsn.clone()));
        state
            .copies
            .push((source_slot.to_string(), target_slot.to_string()));
        Ok(DuplicatedSlot {
            slot_name: target_slot.to_string(),
            checkpoint: lsn,
        })
    }

    async fn close(self: Box<Self>) -> FlowResult<()> {
        self.state.lock().closed += 1;
        Ok(())
    }
}
