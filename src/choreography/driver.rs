//! # Local Flow Driver
//!
//! In-process stand-in for the external workflow runner. Step handlers are
//! registered under their workflow names; invocations queued by the
//! [`InMemoryEventBus`] are executed one at a time until the bus is idle, and each
//! successful execution publishes its finish event back onto the bus.

use super::memory_bus::InMemoryEventBus;
use crate::config::EventBusConfig;
use crate::error::{FlowError, FlowResult};
use crate::events::FinishEventPublisher;
use crate::orchestration::step_handler::StepHandler;
use crate::orchestration::workflow_executor::{ExecutionRecord, WorkflowExecutor};
use crate::services::FailureNotifier;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Guard against flows whose finish rules feed each other in a cycle
pub const DEFAULT_MAX_EXECUTIONS: usize = 1_000;

pub struct LocalFlowDriver {
    bus: Arc<InMemoryEventBus>,
    publisher: FinishEventPublisher,
    executors: HashMap<String, WorkflowExecutor>,
    notifier: Option<Arc<dyn FailureNotifier>>,
    max_executions: usize,
}

impl LocalFlowDriver {
    pub fn new(bus: Arc<InMemoryEventBus>, event_bus: &EventBusConfig) -> Self {
        let publisher = FinishEventPublisher::new(bus.clone(), event_bus);
        Self {
            bus,
            publisher,
            executors: HashMap::new(),
            notifier: None,
            max_executions: DEFAULT_MAX_EXECUTIONS,
        }
    }

    pub fn with_max_executions(mut self, max_executions: usize) -> Self {
        self.max_executions = max_executions;
        self
    }

    /// Report failed executions of every registered workflow to `notifier`
    pub fn with_notifier(mut self, notifier: Arc<dyn FailureNotifier>) -> Self {
        self.executors = self
            .executors
            .into_iter()
            .map(|(name, executor)| (name, executor.with_notifier(notifier.clone())))
            .collect();
        self.notifier = Some(notifier);
        self
    }

    /// Register a handler under its workflow name, replacing any previous one
    pub fn register(&mut self, handler: Arc<dyn StepHandler>) -> &mut Self {
        let name = handler.name().to_string();
        let mut executor = WorkflowExecutor::new(handler, self.publisher.clone());
        if let Some(notifier) = &self.notifier {
            executor = executor.with_notifier(notifier.clone());
        }
        self.executors.insert(name, executor);
        self
    }

    pub fn registered_workflows(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.executors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    /// Start a workflow directly, the way an operator starts the first step of a
    /// flow that has no schedule, then follow the chain.
    pub async fn start(&self, workflow_name: &str, input: Value) -> FlowResult<Vec<ExecutionRecord>> {
        let first = self.execute(workflow_name, input).await;
        let mut records = vec![first];
        records.extend(self.run_until_idle().await?);
        Ok(records)
    }

    /// Fire a schedule rule, then follow the chain
    pub async fn trigger_schedule(&self, rule_name: &str) -> FlowResult<Vec<ExecutionRecord>> {
        let queued = self.bus.fire_schedule(rule_name)?;
        info!(rule_name = %rule_name, queued, "Schedule rule fired");
        self.run_until_idle().await
    }

    /// Execute queued invocations, including the ones their finish events queue,
    /// until nothing is left.
    pub async fn run_until_idle(&self) -> FlowResult<Vec<ExecutionRecord>> {
        let mut records = Vec::new();
        while let Some(invocation) = self.bus.next_invocation() {
            if records.len() >= self.max_executions {
                return Err(FlowError::EventBus(format!(
                    "Flow did not settle after {} executions; check for cyclic step chains",
                    self.max_executions
                )));
            }
            records.push(
                self.execute(&invocation.state_machine_name, invocation.input)
                    .await,
            );
        }
        Ok(records)
    }

    async fn execute(&self, workflow_name: &str, input: Value) -> ExecutionRecord {
        match self.executors.get(workflow_name) {
            Some(executor) => executor.execute(input).await,
            None => {
                warn!(workflow_name = %workflow_name, "No handler registered for workflow");
                ExecutionRecord::failed(
                    workflow_name,
                    input,
                    &FlowError::not_found("workflow", workflow_name),
                )
            }
        }
    }
}

impl std::fmt::Debug for LocalFlowDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFlowDriver")
            .field("workflows", &self.registered_workflows())
            .field("max_executions", &self.max_executions)
            .finish()
    }
}
