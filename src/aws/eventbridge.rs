//! EventBridge rendition of the choreography bus.
//!
//! Targets are Step Functions state machines addressed through
//! [`EventBusConfig::state_machine_arn`]. Constant inputs become the target's
//! `Input`, event paths its `InputPath`, so finish events are forwarded verbatim.

use super::sdk_error;
use crate::choreography::{EventBus, RuleDefinition, RuleTarget, RuleTrigger, TargetInput};
use crate::config::EventBusConfig;
use crate::error::{FlowError, FlowResult};
use crate::events::BusEvent;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_eventbridge::types::{PutEventsRequestEntry, RuleState, Target};
use aws_sdk_eventbridge::Client;
use tracing::{debug, instrument};

const SERVICE: &str = "eventbridge";

pub struct EventBridgeBus {
    client: Client,
    config: EventBusConfig,
}

impl EventBridgeBus {
    pub fn new(sdk_config: &SdkConfig, config: EventBusConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
            config,
        }
    }

    fn target(&self, target: &RuleTarget) -> FlowResult<Target> {
        let builder = Target::builder()
            .id(&target.id)
            .arn(self.config.state_machine_arn(&target.state_machine_name))
            .set_role_arn(
                target
                    .role_arn
                    .clone()
                    .or_else(|| self.config.target_role_arn.clone()),
            );
        let builder = match &target.input {
            TargetInput::Constant(value) => builder.input(value.to_string()),
            TargetInput::EventPath(path) => builder.input_path(path),
        };
        builder.build().map_err(|e| sdk_error(SERVICE, "PutTargets", e))
    }
}

fn check_failed_entries(operation: &str, failed: i32) -> FlowResult<()> {
    if failed > 0 {
        return Err(FlowError::EventBus(format!(
            "{operation} rejected {failed} entries"
        )));
    }
    Ok(())
}

#[async_trait]
impl EventBus for EventBridgeBus {
    #[instrument(skip(self, rule), fields(rule_name = %rule.name))]
    async fn put_rule(&self, rule: &RuleDefinition) -> FlowResult<()> {
        let state = if rule.enabled {
            RuleState::Enabled
        } else {
            RuleState::Disabled
        };
        let request = self
            .client
            .put_rule()
            .name(&rule.name)
            .set_event_bus_name(rule.event_bus_name.clone())
            .state(state);
        let request = match &rule.trigger {
            RuleTrigger::Schedule { expression } => request.schedule_expression(expression),
            RuleTrigger::Pattern { pattern } => request.event_pattern(pattern.to_json_string()),
        };

        let output = request
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "PutRule", e))?;
        debug!(rule_arn = output.rule_arn().unwrap_or(""), "Rule upserted");
        Ok(())
    }

    #[instrument(skip(self, targets), fields(count = targets.len()))]
    async fn put_targets(
        &self,
        rule_name: &str,
        event_bus_name: Option<&str>,
        targets: &[RuleTarget],
    ) -> FlowResult<()> {
        if targets.is_empty() {
            return Ok(());
        }

        let targets = targets
            .iter()
            .map(|target| self.target(target))
            .collect::<FlowResult<Vec<_>>>()?;
        let output = self
            .client
            .put_targets()
            .rule(rule_name)
            .set_event_bus_name(event_bus_name.map(str::to_string))
            .set_targets(Some(targets))
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "PutTargets", e))?;

        check_failed_entries("PutTargets", output.failed_entry_count())
    }

    #[instrument(skip(self, events), fields(count = events.len()))]
    async fn put_events(&self, events: &[BusEvent]) -> FlowResult<()> {
        let entries = events
            .iter()
            .map(|event| {
                PutEventsRequestEntry::builder()
                    .event_bus_name(&event.event_bus_name)
                    .source(&event.source)
                    .detail_type(&event.detail_type)
                    .detail(event.detail.to_string())
                    .build()
            })
            .collect::<Vec<_>>();

        let output = self
            .client
            .put_events()
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "PutEvents", e))?;

        check_failed_entries("PutEvents", output.failed_entry_count())
    }
}

impl std::fmt::Debug for EventBridgeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBridgeBus")
            .field("event_bus", &self.config.name)
            .finish()
    }
}
