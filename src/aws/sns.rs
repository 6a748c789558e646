use super::sdk_error;
use crate::error::FlowResult;
use crate::services::{FailureNotification, FailureNotifier};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sns::Client;
use tracing::{info, instrument};

const SERVICE: &str = "sns";

/// Publishes failure notifications to the operators' topic; subscribers (email,
/// chat) are managed on the topic itself.
#[derive(Debug, Clone)]
pub struct SnsFailureNotifier {
    client: Client,
    topic_arn: String,
}

impl SnsFailureNotifier {
    pub fn new(sdk_config: &SdkConfig, topic_arn: impl Into<String>) -> Self {
        Self::with_client(Client::new(sdk_config), topic_arn)
    }

    pub fn with_client(client: Client, topic_arn: impl Into<String>) -> Self {
        Self {
            client,
            topic_arn: topic_arn.into(),
        }
    }
}

#[async_trait]
impl FailureNotifier for SnsFailureNotifier {
    #[instrument(skip(self, notification), fields(topic_arn = %self.topic_arn, workflow_name = %notification.workflow_name))]
    async fn notify(&self, notification: &FailureNotification) -> FlowResult<()> {
        let output = self
            .client
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(notification.subject())
            .message(serde_json::to_string_pretty(notification)?)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "Publish", e))?;

        info!(message_id = output.message_id().unwrap_or(""), "Failure notification published");
        Ok(())
    }
}
