// pantry/src/services/payment.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
  #[error("Payment {payment_id} was already refunded")]
  AlreadyRefunded { payment_id: String },

  #[error("Payment gateway unreachable: {0}")]
  Unreachable(String),

  #[error("Payment gateway rejected the request: {0}")]
  Rejected(String),
}

/// Refund side of the payment provider.
///
/// Any error is fatal to the surrounding cancellation, which is rolled back.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// Refunds `amount` of the captured payment `payment_id` and returns the
  /// provider's refund id.
  async fn refund(&self, payment_id: &str, amount: Decimal) -> Result<String, GatewayError>;
}
