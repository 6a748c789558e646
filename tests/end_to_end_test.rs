//! Whole job chains run through the local bus with every real step handler.

mod common;

use common::*;
use replication_flow::checkpoint::{CheckpointStore, InMemoryCheckpointStore};
use replication_flow::choreography::job_flow::cron_rule_name;
use replication_flow::choreography::{InMemoryEventBus, JobFlowBuilder, JobFlowDeployer, LocalFlowDriver};
use replication_flow::config::{FlowConfig, JobRegistry};
use replication_flow::constants::workflows;
use replication_flow::models::StartReplicationTaskType;
use replication_flow::orchestration::{
    CompletionPoller, CreateInstanceStep, DeleteInstanceStep, DeleteTaskStep, DuplicateSlotStep,
    ExecuteTaskWorkflow, InstanceProvisioner, SlotDuplicator, TaskLifecycleManager,
    TaskOutputPersister, Teardown,
};
use replication_flow::services::{InMemoryFailureNotifier, ReplicationService};
use serde_json::json;
use std::sync::Arc;

struct Harness {
    replication: Arc<FakeReplicationService>,
    checkpoints: Arc<InMemoryCheckpointStore>,
    connector: FakeSlotConnector,
    notifier: Arc<InMemoryFailureNotifier>,
    driver: LocalFlowDriver,
}

async fn harness(config: FlowConfig) -> Harness {
    harness_with_deletion_polls(config, 0).await
}

async fn harness_with_deletion_polls(config: FlowConfig, deletion_polls: u32) -> Harness {
    let replication = Arc::new(
        FakeReplicationService::new()
            .with_deletion_polls(deletion_polls)
            .with_endpoint(endpoint(SOURCE_ENDPOINT, "postgresql"))
            .with_endpoint(endpoint(TARGET_ENDPOINT, "s3")),
    );
    let checkpoints = Arc::new(InMemoryCheckpointStore::new());
    let connector = FakeSlotConnector::default().with_slot("dms_full_load_slot", "AAA/1A2B3C");
    let registry = Arc::new(JobRegistry::from_config(&config));
    let poller = CompletionPoller::from_config(&config.task);

    let lifecycle = Arc::new(
        TaskLifecycleManager::new(
            replication.clone(),
            Arc::new(artifact_store(&config)),
            checkpoints.clone(),
            &config,
        )
        .unwrap(),
    );
    let persister = Arc::new(TaskOutputPersister::new(replication.clone(), checkpoints.clone()));
    let duplicator = Arc::new(SlotDuplicator::new(
        replication.clone(),
        Arc::new(FakeSecretResolver::default().with_secret(SOURCE_SECRET, source_credentials_secret())),
        Arc::new(connector.clone()),
    ));
    let teardown = Arc::new(Teardown::new(replication.clone(), poller));

    let bus = Arc::new(InMemoryEventBus::new());
    let deployer = JobFlowDeployer::new(bus.clone());
    let builder = JobFlowBuilder::new(config.event_bus.clone());
    for flow in registry.flows() {
        deployer.deploy(&builder.build(flow).unwrap()).await.unwrap();
    }

    let notifier = Arc::new(InMemoryFailureNotifier::new());
    let mut driver = LocalFlowDriver::new(bus, &config.event_bus).with_notifier(notifier.clone());
    driver
        .register(Arc::new(CreateInstanceStep::new(
            registry.clone(),
            InstanceProvisioner::new(replication.clone(), poller),
        )))
        .register(Arc::new(ExecuteTaskWorkflow::new(
            registry.clone(),
            lifecycle,
            persister,
            poller,
        )))
        .register(Arc::new(DuplicateSlotStep::new(registry.clone(), duplicator)))
        .register(Arc::new(DeleteTaskStep::new(teardown.clone())))
        .register(Arc::new(DeleteInstanceStep::new(teardown)));

    Harness {
        replication,
        checkpoints,
        connector,
        notifier,
        driver,
    }
}

#[tokio::test]
async fn test_full_load_chain_then_cdc_chain() {
    let h = harness(test_config()).await;
    h.replication
        .push_run_result(RunResult::stopped("2024-03-01T02:00:00", "AAA/1A2B3C"));

    let records = h
        .driver
        .trigger_schedule(&cron_rule_name(FULL_LOAD_JOB, 0))
        .await
        .unwrap();

    let order: Vec<_> = records.iter().map(|r| r.workflow_name.as_str()).collect();
    assert_eq!(
        order,
        vec![
            workflows::CREATE_INSTANCE,
            workflows::EXECUTE_JOB,
            workflows::POST_FULL_TASK_POSTGRES,
            workflows::DELETE_TASK,
            workflows::DELETE_INSTANCE,
        ]
    );
    assert!(records.iter().all(|r| r.succeeded()), "{records:#?}");

    let execute_output = records[1].output().unwrap();
    assert_eq!(execute_output["TaskDetails"]["Status"], json!({"LatestStatus": "stopped"}));
    assert_eq!(
        execute_output["TaskDetails"]["StopReason"],
        "Stop Reason FULL_LOAD_ONLY_FINISHED"
    );
    assert_eq!(execute_output["TaskDetails"]["StartReplicationTaskType"], "reload-target");

    let slot_output = records[2].output().unwrap();
    assert_eq!(slot_output["ReplicationSlot"]["slot_name"], CHECKPOINT_NAME);
    assert_eq!(slot_output["ReplicationSlot"]["checkpoint"], "AAA/1A2B3C");
    assert_eq!(slot_output["TaskDetails"]["RecoveryCheckpoint"], "AAA/1A2B3C");
    assert_eq!(h.connector.copies().len(), 1);

    let latest = h.checkpoints.latest_checkpoint(CHECKPOINT_NAME).await.unwrap().unwrap();
    assert_eq!(latest.checkpoint, "AAA/1A2B3C");
    assert_eq!(h.replication.task_count(), 0);
    assert!(!h.replication.instance_exists(INSTANCE_NAME));

    // The incremental job picks up where the full load stopped
    h.replication
        .push_run_result(RunResult::stopped("2024-03-01T10:00:00", "AAB/00FF10"));
    let records = h
        .driver
        .trigger_schedule(&cron_rule_name(CDC_JOB, 0))
        .await
        .unwrap();

    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.succeeded()), "{records:#?}");

    let requests = h.replication.created_requests();
    assert_eq!(requests[1].replication_task_identifier, CDC_JOB);
    assert_eq!(requests[1].cdc_start_position.as_deref(), Some("AAA/1A2B3C"));
    assert!(requests[1]
        .cdc_stop_position
        .as_deref()
        .is_some_and(|stop| stop.starts_with("commit_time:")));
    assert_eq!(
        h.replication.started()[1].1,
        StartReplicationTaskType::StartReplication
    );

    let latest = h.checkpoints.latest_checkpoint(CHECKPOINT_NAME).await.unwrap().unwrap();
    assert_eq!(latest.checkpoint, "AAB/00FF10");
    assert_eq!(latest.job_name, CDC_JOB);
    assert_eq!(h.replication.created_instances().len(), 2);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_cdc_before_full_load_halts_after_instance_creation() {
    let h = harness(test_config()).await;

    let records = h
        .driver
        .trigger_schedule(&cron_rule_name(CDC_JOB, 0))
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert!(records[0].succeeded());
    assert_eq!(records[1].error_kind(), Some("checkpoint_missing"));
    // Nothing downstream ran, so the instance is left for an operator
    assert!(h.replication.instance_exists(INSTANCE_NAME));
    assert!(h.replication.deleted_tasks().is_empty());
    assert_eq!(h.checkpoints.checkpoint_count(), 0);

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].workflow_name, workflows::EXECUTE_JOB);
    assert_eq!(sent[0].job_name.as_deref(), Some(CDC_JOB));
    assert_eq!(sent[0].error_kind, "checkpoint_missing");
}

#[tokio::test]
async fn test_failed_task_run_does_not_advance_checkpoint() {
    let h = harness(test_config()).await;
    h.replication
        .push_run_result(RunResult::failed("2024-03-01T02:00:00"));

    let records = h
        .driver
        .trigger_schedule(&cron_rule_name(FULL_LOAD_JOB, 0))
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[1].error_kind(), Some("external_service_error"));
    assert_eq!(h.checkpoints.checkpoint_count(), 0);
    assert_eq!(h.notifier.sent().len(), 1);
    assert_eq!(h.replication.task_count(), 1);
}

#[tokio::test]
async fn test_disabled_delete_task_step_keeps_instance() {
    let mut config = test_config();
    config.job_flows[0].steps[3].enabled = false;
    let h = harness(config).await;
    h.replication
        .push_run_result(RunResult::stopped("2024-03-01T02:00:00", "AAA/1A2B3C"));

    let records = h
        .driver
        .trigger_schedule(&cron_rule_name(FULL_LOAD_JOB, 0))
        .await
        .unwrap();

    assert_eq!(records.len(), 4);
    assert_eq!(records[3].workflow_name, workflows::DELETE_TASK);
    assert!(h.replication.instance_exists(INSTANCE_NAME));
    assert!(h.replication.deleted_instances().is_empty());
}

#[tokio::test]
async fn test_teardown_waits_for_asynchronous_deletes() {
    let h = harness_with_deletion_polls(test_config(), 2).await;
    h.replication
        .push_run_result(RunResult::stopped("2024-03-01T02:00:00", "AAA/1A2B3C"));

    let records = h
        .driver
        .trigger_schedule(&cron_rule_name(FULL_LOAD_JOB, 0))
        .await
        .unwrap();

    // The instance delete is refused while a task is still attached
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.succeeded()), "{records:#?}");
    assert_eq!(h.replication.task_count(), 0);
    assert!(!h.replication.instance_exists(INSTANCE_NAME));

    h.replication
        .push_run_result(RunResult::stopped("2024-03-01T10:00:00", "AAB/00FF10"));
    let records = h
        .driver
        .trigger_schedule(&cron_rule_name(CDC_JOB, 0))
        .await
        .unwrap();

    assert!(records.iter().all(|r| r.succeeded()), "{records:#?}");
    assert_eq!(h.replication.created_instances().len(), 2);
}

#[tokio::test]
async fn test_instance_delete_rejected_while_task_attached() {
    let replication = Arc::new(
        FakeReplicationService::new()
            .with_available_instance(INSTANCE_NAME)
            .with_task(stopped_full_load(Some("AAA/1A2B3C"))),
    );
    let teardown = Teardown::new(replication.clone(), CompletionPoller::from_config(&test_config().task));

    let err = teardown.delete_instance(INSTANCE_NAME).await.unwrap_err();
    assert_eq!(err.kind(), "external_service_error");

    teardown.delete_task(FULL_LOAD_JOB).await.unwrap();
    teardown.delete_instance(INSTANCE_NAME).await.unwrap();
    assert!(!replication.instance_exists(INSTANCE_NAME));
}

#[tokio::test]
async fn test_provisioning_waits_out_an_instance_being_deleted() {
    let replication = Arc::new(
        FakeReplicationService::new()
            .with_deletion_polls(1)
            .with_available_instance(INSTANCE_NAME),
    );
    replication
        .delete_instance(&format!("arn:aws:dms:rep:{INSTANCE_NAME}"))
        .await
        .unwrap();
    let provisioner = InstanceProvisioner::new(
        replication.clone(),
        CompletionPoller::from_config(&test_config().task),
    );

    let instance = provisioner.provision(&instance_config()).await.unwrap();

    assert_eq!(instance.replication_instance_status.as_deref(), Some("available"));
    assert_eq!(replication.created_instances(), vec![INSTANCE_NAME.to_string()]);
}
