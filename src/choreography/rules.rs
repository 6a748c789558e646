//! # Rules and Targets
//!
//! Bus-neutral description of what the choreography needs from an event bus: rules
//! that fire on a schedule or on a matching event, and the workflow targets each
//! rule starts.

use crate::error::{FlowError, FlowResult};
use crate::events::EventPattern;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What makes a rule fire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleTrigger {
    Schedule { expression: String },
    Pattern { pattern: EventPattern },
}

/// Role of a rule inside a job flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Starts a step on a schedule
    Cron,
    /// Observes a step's successful completion
    Finish,
}

/// Input handed to a target's workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TargetInput {
    /// Fixed payload, independent of the event
    Constant(Value),
    /// A JSON path into the matched event, passed through without transformation
    EventPath(String),
}

impl TargetInput {
    pub fn resolve(&self, event_document: &Value) -> FlowResult<Value> {
        match self {
            Self::Constant(value) => Ok(value.clone()),
            Self::EventPath(path) => resolve_event_path(event_document, path),
        }
    }

    pub fn is_event_path(&self) -> bool {
        matches!(self, Self::EventPath(_))
    }
}

fn resolve_event_path(document: &Value, path: &str) -> FlowResult<Value> {
    let relative = path
        .strip_prefix("$.")
        .or_else(|| (path == "$").then_some(""))
        .ok_or_else(|| FlowError::EventBus(format!("Unsupported event path '{path}'")))?;

    let mut current = document;
    for segment in relative.split('.').filter(|s| !s.is_empty()) {
        current = current.get(segment).ok_or_else(|| {
            FlowError::EventBus(format!("Event has no value at path '{path}'"))
        })?;
    }
    Ok(current.clone())
}

/// A workflow started by a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTarget {
    pub id: String,
    pub state_machine_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    pub input: TargetInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub name: String,
    pub kind: RuleKind,
    /// Index of the step the rule belongs to
    pub step_index: usize,
    /// Step workflow the rule is about (scheduled or observed)
    pub state_machine_name: String,
    /// `None` places the rule on the account's default bus (schedules)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_bus_name: Option<String>,
    pub enabled: bool,
    pub trigger: RuleTrigger,
    #[serde(default)]
    pub targets: Vec<RuleTarget>,
}

impl RuleDefinition {
    pub fn is_finish_rule(&self) -> bool {
        self.kind == RuleKind::Finish
    }

    pub fn pattern(&self) -> Option<&EventPattern> {
        match &self.trigger {
            RuleTrigger::Pattern { pattern } => Some(pattern),
            RuleTrigger::Schedule { .. } => None,
        }
    }

    pub fn schedule_expression(&self) -> Option<&str> {
        match &self.trigger {
            RuleTrigger::Schedule { expression } => Some(expression),
            RuleTrigger::Pattern { .. } => None,
        }
    }
}
