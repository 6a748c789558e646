use super::rules::{RuleDefinition, RuleTarget};
use crate::events::BusEvent;
use crate::error::FlowResult;
use async_trait::async_trait;

/// Pattern-matching event bus the choreography is deployed onto
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Create or update a rule. Targets already attached to the rule are kept.
    async fn put_rule(&self, rule: &RuleDefinition) -> FlowResult<()>;

    /// Attach targets to an existing rule, replacing targets with the same id
    async fn put_targets(
        &self,
        rule_name: &str,
        event_bus_name: Option<&str>,
        targets: &[RuleTarget],
    ) -> FlowResult<()>;

    /// Publish events; delivery to matching rules is the bus's concern
    async fn put_events(&self, events: &[BusEvent]) -> FlowResult<()>;
}
