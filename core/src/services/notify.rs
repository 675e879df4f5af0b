// pantry/src/services/notify.rs

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument};

/// Template names understood by every [`Notifier`].
pub mod templates {
  /// Sent to a shipper when an order is offered. Variables: `order_id`,
  /// `receiver_name`, `receiver_phone`, `address`, `note`, `cod_amount`.
  pub const SHIPMENT_ASSIGNED: &str = "shipment_assigned";
  /// Sent to a shipper whose offer was withdrawn. Variables: `order_id`, `reason`.
  pub const SHIPMENT_REVOKED: &str = "shipment_revoked";
  /// Sent to the customer. Variables: `order_id`, `refunded`.
  pub const ORDER_CANCELLED: &str = "order_cancelled";
}

/// Outbound message channel (email in production).
#[async_trait]
pub trait Notifier: Send + Sync {
  async fn send(&self, recipient: &str, template: &str, variables: &Value) -> anyhow::Result<()>;
}

/// Fire-and-forget front of a [`Notifier`].
///
/// Every send runs on its own task. Failures are logged and never reach the
/// operation that triggered the message.
#[derive(Clone)]
pub struct NotificationDispatcher {
  notifier: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
  pub fn new(notifier: Arc<dyn Notifier>) -> Self {
    Self { notifier }
  }

  /// Spawns the send. The handle resolves to whether delivery succeeded;
  /// callers are free to drop it.
  pub fn dispatch(&self, recipient: &str, template: &'static str, variables: Value) -> JoinHandle<bool> {
    let notifier = Arc::clone(&self.notifier);
    let recipient = recipient.to_string();
    let span = tracing::info_span!("notification", %recipient, template);

    tokio::spawn(
      async move {
        match notifier.send(&recipient, template, &variables).await {
          Ok(()) => {
            info!("Notification delivered.");
            true
          }
          Err(e) => {
            warn!(error = %e, "Notification failed; dropping it.");
            false
          }
        }
      }
      .instrument(span),
    )
  }
}

impl std::fmt::Debug for NotificationDispatcher {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("NotificationDispatcher").finish_non_exhaustive()
  }
}
