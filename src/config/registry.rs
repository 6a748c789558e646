use super::FlowConfig;
use crate::choreography::JobFlowDefinition;
use crate::error::{FlowError, FlowResult};
use crate::models::{InstanceConfig, JobConfig};
use std::collections::HashMap;

/// Name lookups over the deployed job, instance and flow definitions.
///
/// Used when a trigger arrives without its `JobConfig`, which is the case for every
/// schedule-triggered step.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: HashMap<String, JobConfig>,
    instances: HashMap<String, InstanceConfig>,
    flows: HashMap<String, JobFlowDefinition>,
}

impl JobRegistry {
    pub fn from_config(config: &FlowConfig) -> Self {
        Self {
            jobs: config
                .jobs
                .iter()
                .map(|job| (job.job_name.clone(), job.clone()))
                .collect(),
            instances: config
                .instances
                .iter()
                .map(|instance| (instance.instance_name.clone(), instance.clone()))
                .collect(),
            flows: config
                .job_flows
                .iter()
                .map(|flow| (flow.job_name.clone(), flow.clone()))
                .collect(),
        }
    }

    pub fn register_job(&mut self, job: JobConfig) {
        self.jobs.insert(job.job_name.clone(), job);
    }

    pub fn register_instance(&mut self, instance: InstanceConfig) {
        self.instances.insert(instance.instance_name.clone(), instance);
    }

    pub fn job(&self, job_name: &str) -> FlowResult<&JobConfig> {
        self.jobs
            .get(job_name)
            .ok_or_else(|| FlowError::not_found("job", job_name))
    }

    pub fn instance(&self, instance_name: &str) -> FlowResult<&InstanceConfig> {
        self.instances
            .get(instance_name)
            .ok_or_else(|| FlowError::not_found("instance configuration", instance_name))
    }

    pub fn flow(&self, job_name: &str) -> Option<&JobFlowDefinition> {
        self.flows.get(job_name)
    }

    /// Flows ordered by job name
    pub fn flows(&self) -> Vec<&JobFlowDefinition> {
        let mut flows: Vec<&JobFlowDefinition> = self.flows.values().collect();
        flows.sort_by(|a, b| a.job_name.cmp(&b.job_name));
        flows
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }
}
