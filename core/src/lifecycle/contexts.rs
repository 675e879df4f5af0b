// pantry/src/lifecycle/contexts.rs

//! Data carried through each order workflow. Handlers receive these wrapped in
//! a [`crate::workflow::SharedContext`].

use crate::models::{Order, OrderLineItem, OrderStatus};
use crate::services::PaymentGateway;
use crate::store::SharedTx;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug)]
pub struct AcceptContext {
  pub tx: SharedTx,
  pub order_id: String,
  pub staff_id: String,
  pub now: DateTime<Utc>,
  pub order: Option<Order>,
  pub items: Vec<OrderLineItem>,
}

pub struct CancelContext {
  pub tx: SharedTx,
  pub gateway: Arc<dyn PaymentGateway>,
  pub order_id: String,
  pub order: Option<Order>,
  pub items: Vec<OrderLineItem>,
  pub refund_id: Option<String>,
  /// Shippers whose offer or accepted delivery was withdrawn by the cancellation.
  pub released_shippers: Vec<String>,
}

#[derive(Debug)]
pub struct TransitionContext {
  pub tx: SharedTx,
  pub order_id: String,
  pub expected: OrderStatus,
  pub target: OrderStatus,
  pub check_payment: bool,
  /// Whether the stored status equals `target` once the write is done.
  pub applied: bool,
}

#[derive(Debug)]
pub struct DeliveryContext {
  pub tx: SharedTx,
  pub order_id: String,
  pub now: DateTime<Utc>,
  pub order: Option<Order>,
}

/// Access to the order loaded by the first stage of a workflow.
pub(crate) trait LoadedOrder {
  fn order_id(&self) -> &str;
  fn loaded(&self) -> Option<&Order>;
}

macro_rules! impl_loaded_order {
  ($($ctx:ty),+) => {
    $(impl LoadedOrder for $ctx {
      fn order_id(&self) -> &str {
        &self.order_id
      }
      fn loaded(&self) -> Option<&Order> {
        self.order.as_ref()
      }
    })+
  };
}

impl_loaded_order!(AcceptContext, CancelContext, DeliveryContext);
