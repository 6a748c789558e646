use super::messages::{BusEvent, FinishMessage};
use crate::choreography::EventBus;
use crate::config::EventBusConfig;
use crate::error::{FlowError, FlowResult};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Publishes finish events on behalf of a workflow that completed successfully
#[derive(Clone)]
pub struct FinishEventPublisher {
    bus: Arc<dyn EventBus>,
    event_bus_name: String,
    source: String,
    detail_type: String,
}

impl FinishEventPublisher {
    pub fn new(bus: Arc<dyn EventBus>, config: &EventBusConfig) -> Self {
        Self {
            bus,
            event_bus_name: config.name.clone(),
            source: config.source.clone(),
            detail_type: config.finish_detail_type.clone(),
        }
    }

    /// Publish `{WorkflowName, WorkflowStatus: SUCCEEDED, WorkflowOutput}`.
    ///
    /// The output must carry a `JobName`; without it no finish rule could ever match.
    #[instrument(skip(self, output), fields(event_bus = %self.event_bus_name))]
    pub async fn publish_succeeded(&self, workflow_name: &str, output: Value) -> FlowResult<BusEvent> {
        let finish = FinishMessage::succeeded(workflow_name, output);
        if finish.job_name().is_none() {
            return Err(FlowError::invalid_input(format!(
                "Output of workflow {workflow_name} has no JobName; its finish event cannot be routed"
            )));
        }

        let event = BusEvent::new(
            self.event_bus_name.clone(),
            self.source.clone(),
            self.detail_type.clone(),
            serde_json::to_value(&finish)?,
        );

        self.bus.put_events(std::slice::from_ref(&event)).await?;

        debug!(
            event_id = %event.id,
            workflow_name = %workflow_name,
            job_name = finish.job_name(),
            "Published workflow finish event"
        );

        Ok(event)
    }
}

impl std::fmt::Debug for FinishEventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinishEventPublisher")
            .field("bus", &"<EventBus>")
            .field("event_bus_name", &self.event_bus_name)
            .field("source", &self.source)
            .finish()
    }
}
