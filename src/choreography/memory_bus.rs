//! # In-Memory Event Bus
//!
//! Local bus with the delivery semantics the choreography depends on: rules match
//! events published on their own bus, disabled rules never fire, and each match
//! queues one invocation per target. Invocations are executed by whoever drains
//! the queue (see [`LocalFlowDriver`](super::driver::LocalFlowDriver)).

use super::bus::EventBus;
use super::rules::{RuleDefinition, RuleTarget, RuleTrigger};
use crate::error::{FlowError, FlowResult};
use crate::events::BusEvent;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::broadcast;
use tracing::{debug, instrument};

/// Name rules without an explicit bus are placed on
pub const DEFAULT_BUS_NAME: &str = "default";

/// A target the bus decided to start
#[derive(Debug, Clone, PartialEq)]
pub struct TargetInvocation {
    pub rule_name: String,
    pub target_id: String,
    pub state_machine_name: String,
    pub input: Value,
}

pub struct InMemoryEventBus {
    rules: RwLock<BTreeMap<String, RuleDefinition>>,
    invocations: Mutex<VecDeque<TargetInvocation>>,
    published: Mutex<Vec<BusEvent>>,
    event_sender: broadcast::Sender<BusEvent>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        let (event_sender, _) = broadcast::channel(1000);
        Self {
            rules: RwLock::new(BTreeMap::new()),
            invocations: Mutex::new(VecDeque::new()),
            published: Mutex::new(Vec::new()),
            event_sender,
        }
    }

    /// Subscribe to every event published on any bus
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.event_sender.subscribe()
    }

    pub fn rules(&self) -> Vec<RuleDefinition> {
        self.rules.read().values().cloned().collect()
    }

    pub fn rule(&self, name: &str) -> Option<RuleDefinition> {
        self.rules.read().get(name).cloned()
    }

    pub fn published_events(&self) -> Vec<BusEvent> {
        self.published.lock().clone()
    }

    /// Fire a schedule rule as if its schedule elapsed. Returns the number of
    /// invocations queued, zero for a disabled rule.
    pub fn fire_schedule(&self, rule_name: &str) -> FlowResult<usize> {
        let rule = self
            .rule(rule_name)
            .ok_or_else(|| FlowError::not_found("rule", rule_name))?;
        if !matches!(rule.trigger, RuleTrigger::Schedule { .. }) {
            return Err(FlowError::EventBus(format!(
                "Rule {rule_name} is not a schedule rule"
            )));
        }
        if !rule.enabled {
            debug!(rule_name = %rule_name, "Schedule rule disabled; nothing fired");
            return Ok(0);
        }

        self.enqueue(&rule, &Value::Null)
    }

    pub fn next_invocation(&self) -> Option<TargetInvocation> {
        self.invocations.lock().pop_front()
    }

    pub fn drain_invocations(&self) -> Vec<TargetInvocation> {
        self.invocations.lock().drain(..).collect()
    }

    pub fn pending_invocations(&self) -> usize {
        self.invocations.lock().len()
    }

    fn enqueue(&self, rule: &RuleDefinition, document: &Value) -> FlowResult<usize> {
        let queued = resolve_invocations(rule, document)?;
        let count = queued.len();
        self.invocations.lock().extend(queued);
        Ok(count)
    }
}

fn resolve_invocations(rule: &RuleDefinition, document: &Value) -> FlowResult<Vec<TargetInvocation>> {
    rule.targets
        .iter()
        .map(|target| {
            Ok(TargetInvocation {
                rule_name: rule.name.clone(),
                target_id: target.id.clone(),
                state_machine_name: target.state_machine_name.clone(),
                input: target.input.resolve(document)?,
            })
        })
        .collect()
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEventBus")
            .field("rules", &self.rules.read().len())
            .field("pending_invocations", &self.invocations.lock().len())
            .finish()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn put_rule(&self, rule: &RuleDefinition) -> FlowResult<()> {
        let mut rules = self.rules.write();
        let targets = rules
            .get(&rule.name)
            .map(|existing| existing.targets.clone())
            .unwrap_or_default();

        let mut stored = rule.clone();
        stored.targets = targets;
        rules.insert(rule.name.clone(), stored);
        Ok(())
    }

    async fn put_targets(
        &self,
        rule_name: &str,
        event_bus_name: Option<&str>,
        targets: &[RuleTarget],
    ) -> FlowResult<()> {
        let mut rules = self.rules.write();
        let rule = rules
            .get_mut(rule_name)
            .filter(|rule| rule.event_bus_name.as_deref() == event_bus_name)
            .ok_or_else(|| FlowError::not_found("rule", rule_name))?;

        for target in targets {
            match rule.targets.iter_mut().find(|existing| existing.id == target.id) {
                Some(existing) => *existing = target.clone(),
                None => rule.targets.push(target.clone()),
            }
        }
        Ok(())
    }

    #[instrument(skip(self, events), fields(events = events.len()))]
    async fn put_events(&self, events: &[BusEvent]) -> FlowResult<()> {
        for event in events {
            let document = event.as_document();
            let matching: Vec<RuleDefinition> = self
                .rules
                .read()
                .values()
                .filter(|rule| rule.enabled)
                .filter(|rule| {
                    rule.event_bus_name.as_deref().unwrap_or(DEFAULT_BUS_NAME)
                        == event.event_bus_name
                })
                .filter(|rule| rule.pattern().is_some_and(|p| p.matches(&document)))
                .cloned()
                .collect();

            // Every target of every matching rule resolves, or the event queues nothing
            let mut queued = Vec::new();
            for rule in &matching {
                let invocations = resolve_invocations(rule, &document)?;
                debug!(rule_name = %rule.name, queued = invocations.len(), "Event matched rule");
                queued.extend(invocations);
            }

            self.invocations.lock().extend(queued);
            self.published.lock().push(event.clone());
            // No subscribers is fine
            let _ = self.event_sender.send(event.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choreography::rules::{RuleKind, TargetInput};
    use crate::events::{EventPattern, FinishMessage};
    use serde_json::json;

    fn finish_rule(name: &str, enabled: bool) -> RuleDefinition {
        RuleDefinition {
            name: name.to_string(),
            kind: RuleKind::Finish,
            step_index: 0,
            state_machine_name: "a".to_string(),
            event_bus_name: Some("replication".to_string()),
            enabled,
            trigger: RuleTrigger::Pattern {
                pattern: EventPattern::workflow_succeeded("custom.replication", "a", "job-01"),
            },
            targets: vec![],
        }
    }

    fn target() -> RuleTarget {
        RuleTarget {
            id: "job-01-step-01-target".to_string(),
            state_machine_name: "b".to_string(),
            role_arn: None,
            input: TargetInput::EventPath("$.detail.WorkflowOutput".to_string()),
        }
    }

    fn finish_event(bus: &str) -> BusEvent {
        let finish = FinishMessage::succeeded("a", json!({"JobName": "job-01", "InstanceName": "i"}));
        BusEvent::new(
            bus,
            "custom.replication",
            "Replication Workflow Finished",
            serde_json::to_value(finish).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_matching_event_queues_target() {
        let bus = InMemoryEventBus::new();
        bus.put_rule(&finish_rule("r", true)).await.unwrap();
        bus.put_targets("r", Some("replication"), &[target()]).await.unwrap();

        bus.put_events(&[finish_event("replication")]).await.unwrap();

        let invocation = bus.next_invocation().unwrap();
        assert_eq!(invocation.state_machine_name, "b");
        assert_eq!(invocation.input["JobName"], "job-01");
        assert!(bus.next_invocation().is_none());
    }

    #[tokio::test]
    async fn test_disabled_rule_and_other_bus_do_not_fire() {
        let bus = InMemoryEventBus::new();
        bus.put_rule(&finish_rule("r", false)).await.unwrap();
        bus.put_targets("r", Some("replication"), &[target()]).await.unwrap();

        bus.put_events(&[finish_event("replication")]).await.unwrap();
        assert_eq!(bus.pending_invocations(), 0);

        bus.put_rule(&finish_rule("r", true)).await.unwrap();
        bus.put_events(&[finish_event("other")]).await.unwrap();
        assert_eq!(bus.pending_invocations(), 0);
        assert_eq!(bus.published_events().len(), 2);
    }

    #[tokio::test]
    async fn test_put_rule_keeps_targets_and_put_targets_upserts() {
        let bus = InMemoryEventBus::new();
        bus.put_rule(&finish_rule("r", true)).await.unwrap();
        bus.put_targets("r", Some("replication"), &[target()]).await.unwrap();
        bus.put_targets("r", Some("replication"), &[target()]).await.unwrap();
        bus.put_rule(&finish_rule("r", true)).await.unwrap();

        assert_eq!(bus.rule("r").unwrap().targets.len(), 1);
    }

    #[tokio::test]
    async fn test_put_targets_on_unknown_rule() {
        let bus = InMemoryEventBus::new();
        let err = bus.put_targets("missing", None, &[target()]).await.unwrap_err();
        assert!(matches!(err, FlowError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_subscribers_see_published_events() {
        let bus = InMemoryEventBus::new();
        let mut receiver = bus.subscribe();
        bus.put_events(&[finish_event("replication")]).await.unwrap();

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.detail["WorkflowName"], "a");
    }

    #[tokio::test]
    async fn test_unresolvable_target_queues_nothing_for_the_event() {
        let bus = InMemoryEventBus::new();
        for name in ["r1", "r2"] {
            bus.put_rule(&finish_rule(name, true)).await.unwrap();
        }
        bus.put_targets("r1", Some("replication"), &[target()]).await.unwrap();
        let broken = RuleTarget {
            input: TargetInput::EventPath("$.detail.Missing".to_string()),
            ..target()
        };
        bus.put_targets("r2", Some("replication"), &[broken]).await.unwrap();

        let err = bus.put_events(&[finish_event("replication")]).await.unwrap_err();

        assert!(matches!(err, FlowError::EventBus(_)));
        assert_eq!(bus.pending_invocations(), 0);
        assert!(bus.published_events().is_empty());
    }
}
