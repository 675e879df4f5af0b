// pantry_admin/src/services/email_mock.rs
use async_trait::async_trait;
use pantry::services::Notifier;
use serde_json::Value;
use tracing::info;

/// Writes notifications to the log instead of a mail relay.
#[derive(Debug, Clone)]
pub struct MockEmailNotifier {
  sender: String,
}

impl MockEmailNotifier {
  pub fn new(sender: &str) -> Self {
    Self {
      sender: sender.to_string(),
    }
  }
}

#[async_trait]
impl Notifier for MockEmailNotifier {
  async fn send(&self, recipient: &str, template: &str, variables: &Value) -> anyhow::Result<()> {
    info!(
      "Simulating sending email: To='{}', From='{}', Template='{}'",
      recipient, self.sender, template
    );
    tokio::time::sleep(std::time::Duration::from_millis(20)).await; // Simulate network latency

    // Simulate potential failure
    if recipient.to_lowercase().contains("fail_test") {
      tracing::warn!("Simulated email failure for recipient: {}", recipient);
      anyhow::bail!("Simulated email send failure");
    }

    let message_id = format!("mock_email_{}", uuid::Uuid::new_v4());
    info!(%message_id, %variables, "Mock email sent successfully.");
    Ok(())
  }
}
