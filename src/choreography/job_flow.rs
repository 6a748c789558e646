//! # Job Flow Builder
//!
//! Turns a job's ordered step list into the rules and targets that sequence the
//! steps purely through events. No step knows who triggers it or whom it
//! triggers; reordering steps is a configuration change only.
//!
//! For the step at index `i`:
//! 1. A step with a `cron` schedule gets a schedule rule (enabled per the step)
//!    whose target starts the step with the fixed `{JobName, InstanceName}`
//!    payload. It never depends on a predecessor.
//! 2. Otherwise, for `i > 0`, the step is attached as a target of step `i - 1`'s
//!    finish rule with its input taken from the finish event's `WorkflowOutput`.
//! 3. Every step gets a finish rule matching its own successful completion for
//!    this job. The rule's enabled flag mirrors the step's.
//!
//! A first step without a schedule has no inbound trigger and must be started
//! externally.

use super::bus::EventBus;
use super::rules::{RuleDefinition, RuleKind, RuleTarget, RuleTrigger, TargetInput};
use super::schedule::CronSchedule;
use crate::config::EventBusConfig;
use crate::constants::WORKFLOW_OUTPUT_PATH;
use crate::error::{FlowError, FlowResult};
use crate::events::{EventPattern, TriggerMessage};
use crate::logging::log_rule_operation;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

fn default_enabled() -> bool {
    true
}

/// One element of a job's chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStepConfig {
    pub state_machine_name: String,
    /// Whether this step's completion is observable downstream
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<CronSchedule>,
}

impl WorkflowStepConfig {
    pub fn new(state_machine_name: impl Into<String>) -> Self {
        Self {
            state_machine_name: state_machine_name.into(),
            enabled: true,
            cron: None,
        }
    }

    pub fn with_cron(mut self, cron: CronSchedule) -> Self {
        self.cron = Some(cron);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Ordered step chain of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFlowDefinition {
    pub job_name: String,
    pub instance_name: String,
    pub steps: Vec<WorkflowStepConfig>,
}

/// Rules, with their targets, that realise one job flow on a bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFlowPlan {
    pub job_name: String,
    pub event_bus_name: String,
    pub rules: Vec<RuleDefinition>,
}

impl JobFlowPlan {
    pub fn finish_rules(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.rules.iter().filter(|rule| rule.kind == RuleKind::Finish)
    }

    pub fn cron_rules(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.rules.iter().filter(|rule| rule.kind == RuleKind::Cron)
    }

    /// Targets fed by a predecessor's finish event
    pub fn chained_targets(&self) -> impl Iterator<Item = (&RuleDefinition, &RuleTarget)> {
        self.finish_rules()
            .flat_map(|rule| rule.targets.iter().map(move |target| (rule, target)))
    }

    /// Targets that can actually be invoked: those on enabled rules
    pub fn active_targets(&self) -> impl Iterator<Item = (&RuleDefinition, &RuleTarget)> {
        self.rules
            .iter()
            .filter(|rule| rule.enabled)
            .flat_map(|rule| rule.targets.iter().map(move |target| (rule, target)))
    }

    pub fn rule(&self, name: &str) -> Option<&RuleDefinition> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn target_count(&self) -> usize {
        self.rules.iter().map(|rule| rule.targets.len()).sum()
    }
}

pub fn cron_rule_name(job_name: &str, index: usize) -> String {
    format!("{job_name}-step-{index:02}-cron-rule")
}

pub fn finish_rule_name(job_name: &str, index: usize) -> String {
    format!("{job_name}-step-{index:02}-finish-rule")
}

pub fn target_id(job_name: &str, index: usize) -> String {
    format!("{job_name}-step-{index:02}-target")
}

#[derive(Debug, Clone)]
pub struct JobFlowBuilder {
    event_bus: EventBusConfig,
}

impl JobFlowBuilder {
    pub fn new(event_bus: EventBusConfig) -> Self {
        Self { event_bus }
    }

    #[instrument(skip(self, flow), fields(job_name = %flow.job_name, steps = flow.steps.len()))]
    pub fn build(&self, flow: &JobFlowDefinition) -> FlowResult<JobFlowPlan> {
        if flow.steps.is_empty() {
            return Err(FlowError::invalid_input(format!(
                "Job flow {} has no steps",
                flow.job_name
            )));
        }

        let mut rules: Vec<RuleDefinition> = Vec::with_capacity(flow.steps.len() * 2);
        let mut previous_finish: Option<usize> = None;

        for (index, step) in flow.steps.iter().enumerate() {
            if let Some(cron) = &step.cron {
                cron.validate().map_err(|reason| {
                    FlowError::Configuration(format!(
                        "Step {index} of job flow {}: {reason}",
                        flow.job_name
                    ))
                })?;

                let fixed_input =
                    TriggerMessage::new(flow.job_name.clone(), flow.instance_name.clone())
                        .to_value()?;
                rules.push(RuleDefinition {
                    name: cron_rule_name(&flow.job_name, index),
                    kind: RuleKind::Cron,
                    step_index: index,
                    state_machine_name: step.state_machine_name.clone(),
                    event_bus_name: None,
                    enabled: step.enabled,
                    trigger: RuleTrigger::Schedule {
                        expression: cron.expression(),
                    },
                    targets: vec![self.target(flow, index, step, TargetInput::Constant(fixed_input))],
                });
            } else if let Some(previous) = previous_finish {
                let target = self.target(
                    flow,
                    index,
                    step,
                    TargetInput::EventPath(WORKFLOW_OUTPUT_PATH.to_string()),
                );
                let predecessor = &mut rules[previous];
                // A disabled predecessor ends the chain; nothing is attached to it
                if predecessor.enabled {
                    predecessor.targets.push(target);
                } else {
                    debug!(
                        rule_name = %predecessor.name,
                        step_index = index,
                        "Predecessor finish rule disabled; step is not chained"
                    );
                }
            }

            rules.push(RuleDefinition {
                name: finish_rule_name(&flow.job_name, index),
                kind: RuleKind::Finish,
                step_index: index,
                state_machine_name: step.state_machine_name.clone(),
                event_bus_name: Some(self.event_bus.name.clone()),
                enabled: step.enabled,
                trigger: RuleTrigger::Pattern {
                    pattern: EventPattern::workflow_succeeded(
                        &self.event_bus.source,
                        &step.state_machine_name,
                        &flow.job_name,
                    ),
                },
                targets: Vec::new(),
            });
            previous_finish = Some(rules.len() - 1);
        }

        Ok(JobFlowPlan {
            job_name: flow.job_name.clone(),
            event_bus_name: self.event_bus.name.clone(),
            rules,
        })
    }

    fn target(
        &self,
        flow: &JobFlowDefinition,
        index: usize,
        step: &WorkflowStepConfig,
        input: TargetInput,
    ) -> RuleTarget {
        RuleTarget {
            id: target_id(&flow.job_name, index),
            state_machine_name: step.state_machine_name.clone(),
            role_arn: self.event_bus.target_role_arn.clone(),
            input,
        }
    }
}

/// Applies plans to an event bus
#[derive(Clone)]
pub struct JobFlowDeployer {
    bus: Arc<dyn EventBus>,
}

impl JobFlowDeployer {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    /// Put every rule first, then its targets, so that targets always land on a rule
    /// that already exists.
    #[instrument(skip(self, plan), fields(job_name = %plan.job_name, rules = plan.rules.len()))]
    pub async fn deploy(&self, plan: &JobFlowPlan) -> FlowResult<()> {
        for rule in &plan.rules {
            self.bus.put_rule(rule).await?;
            log_rule_operation(
                "put_rule",
                &rule.name,
                Some(&plan.job_name),
                if rule.enabled { "enabled" } else { "disabled" },
                rule.schedule_expression(),
            );
        }

        for rule in plan.rules.iter().filter(|rule| !rule.targets.is_empty()) {
            self.bus
                .put_targets(&rule.name, rule.event_bus_name.as_deref(), &rule.targets)
                .await?;
            log_rule_operation(
                "put_targets",
                &rule.name,
                Some(&plan.job_name),
                "attached",
                Some(&format!("{} target(s)", rule.targets.len())),
            );
        }

        Ok(())
    }
}

impl std::fmt::Debug for JobFlowDeployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobFlowDeployer")
            .field("bus", &"<EventBus>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> JobFlowBuilder {
        JobFlowBuilder::new(EventBusConfig::default())
    }

    fn flow(steps: Vec<WorkflowStepConfig>) -> JobFlowDefinition {
        JobFlowDefinition {
            job_name: "orders-full".to_string(),
            instance_name: "instance-01".to_string(),
            steps,
        }
    }

    #[test]
    fn test_rule_and_target_names() {
        assert_eq!(cron_rule_name("orders", 0), "orders-step-00-cron-rule");
        assert_eq!(finish_rule_name("orders", 12), "orders-step-12-finish-rule");
        assert_eq!(target_id("orders", 3), "orders-step-03-target");
    }

    #[test]
    fn test_empty_flow_is_rejected() {
        let err = builder().build(&flow(vec![])).unwrap_err();
        assert!(matches!(err, FlowError::InvalidInput(_)));
    }

    #[test]
    fn test_cron_step_gets_fixed_payload() {
        let cron = CronSchedule {
            minute: Some("0".to_string()),
            hour: Some("3".to_string()),
            ..Default::default()
        };
        let plan = builder()
            .build(&flow(vec![
                WorkflowStepConfig::new("create_instance_workflow").with_cron(cron),
                WorkflowStepConfig::new("execute_job_workflow"),
            ]))
            .unwrap();

        let cron_rule = plan.rule("orders-full-step-00-cron-rule").unwrap();
        assert_eq!(cron_rule.schedule_expression(), Some("cron(0 3 * * ? *)"));
        assert_eq!(cron_rule.event_bus_name, None);
        assert_eq!(
            cron_rule.targets[0].input,
            TargetInput::Constant(serde_json::json!({
                "JobName": "orders-full",
                "InstanceName": "instance-01"
            }))
        );

        let finish = plan.rule("orders-full-step-00-finish-rule").unwrap();
        assert_eq!(finish.targets.len(), 1);
        assert_eq!(finish.targets[0].state_machine_name, "execute_job_workflow");
        assert!(finish.targets[0].input.is_event_path());
    }

    #[test]
    fn test_invalid_cron_is_configuration_error() {
        let cron = CronSchedule {
            day: Some("1".to_string()),
            week_day: Some("MON".to_string()),
            ..Default::default()
        };
        let err = builder()
            .build(&flow(vec![WorkflowStepConfig::new("a").with_cron(cron)]))
            .unwrap_err();
        assert!(matches!(err, FlowError::Configuration(_)));
    }

    #[test]
    fn test_cron_step_mid_chain_breaks_predecessor_link() {
        let plan = builder()
            .build(&flow(vec![
                WorkflowStepConfig::new("a"),
                WorkflowStepConfig::new("b").with_cron(CronSchedule::default()),
                WorkflowStepConfig::new("c"),
            ]))
            .unwrap();

        assert_eq!(plan.finish_rules().count(), 3);
        assert!(plan.rule("orders-full-step-00-finish-rule").unwrap().targets.is_empty());
        assert_eq!(
            plan.rule("orders-full-step-01-finish-rule").unwrap().targets[0].state_machine_name,
            "c"
        );
    }
}
