use super::completion::CompletionPoller;
use crate::error::FlowResult;
use crate::models::{InstanceConfig, ReplicationInstance};
use crate::services::ReplicationService;
use std::sync::Arc;
use tracing::{info, instrument};

/// Creates the ephemeral instance a job chain runs on
pub struct InstanceProvisioner {
    replication: Arc<dyn ReplicationService>,
    poller: CompletionPoller,
}

impl InstanceProvisioner {
    pub fn new(replication: Arc<dyn ReplicationService>, poller: CompletionPoller) -> Self {
        Self {
            replication,
            poller,
        }
    }

    /// Reuse an instance that already carries the name, otherwise create it, then
    /// wait until it is available. An instance that is being deleted is waited out
    /// and created again.
    #[instrument(skip(self, instance), fields(instance_name = %instance.instance_name))]
    pub async fn provision(&self, instance: &InstanceConfig) -> FlowResult<ReplicationInstance> {
        let mut existing = self
            .replication
            .describe_instance(&instance.instance_name)
            .await?;

        if existing.as_ref().is_some_and(ReplicationInstance::is_deleting) {
            info!("Replication instance is being deleted; waiting before creating it again");
            self.poller
                .wait_for_instance_deleted(self.replication.as_ref(), &instance.instance_name)
                .await?;
            existing = None;
        }

        match existing {
            Some(existing) => {
                info!(
                    instance_arn = %existing.replication_instance_arn,
                    "Reusing existing replication instance"
                );
            }
            None => {
                let created = self.replication.create_instance(instance).await?;
                info!(
                    instance_arn = %created.replication_instance_arn,
                    instance_type = %instance.instance_type,
                    "Replication instance created"
                );
            }
        }

        self.poller
            .wait_for_instance_available(self.replication.as_ref(), &instance.instance_name)
            .await
    }
}

impl std::fmt::Debug for InstanceProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceProvisioner")
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}
