// pantry_admin/src/services/payment_mock.rs
use async_trait::async_trait;
use pantry::services::{GatewayError, PaymentGateway};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Simulated payment provider. Refunds succeed after a short delay unless
/// the amount is not positive.
#[derive(Debug, Clone)]
pub struct MockPaymentGateway {
  account_id: String,
}

impl MockPaymentGateway {
  pub fn new(account_id: &str) -> Self {
    Self {
      account_id: account_id.to_string(),
    }
  }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
  #[instrument(name = "MockPaymentGateway::refund", skip(self), fields(payment_account_id = %self.account_id))]
  async fn refund(&self, payment_id: &str, amount: Decimal) -> Result<String, GatewayError> {
    info!("Simulating refund for account '{}'", self.account_id);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await; // Simulate network latency

    if amount <= Decimal::ZERO {
      warn!(%amount, "Mock refund rejected.");
      return Err(GatewayError::Rejected(format!("refund amount must be positive, got {amount}")));
    }
    let refund_id = format!("mock_re_{}", Uuid::new_v4());
    info!(%refund_id, "Mock refund succeeded.");
    Ok(refund_id)
  }
}
