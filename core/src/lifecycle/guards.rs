// pantry/src/lifecycle/guards.rs

//! Checks shared by the order workflows.

use super::contexts::LoadedOrder;
use crate::error::{PantryError, PantryResult};
use crate::models::{Order, OrderLineItem, OrderStatus, PaymentStatus};
use crate::store::StoreTx;
use crate::workflow::SharedContext;
use std::collections::BTreeMap;
use tracing::{info, warn};

pub(crate) async fn load_order(tx: &mut dyn StoreTx, order_id: &str) -> PantryResult<Order> {
  tx.order(order_id)
    .await?
    .ok_or_else(|| PantryError::not_found("order", order_id))
}

pub(crate) fn ensure_status(order: &Order, expected: OrderStatus) -> PantryResult<()> {
  if order.status != expected {
    warn!(order_id = %order.id, %expected, actual = %order.status, "Order is not in the expected status.");
    return Err(PantryError::InvalidState {
      order_id: order.id.clone(),
      expected,
      actual: order.status,
    });
  }
  Ok(())
}

/// Cash-on-delivery orders must still be unpaid; prepaid orders must be paid.
pub(crate) fn ensure_payment(order: &Order) -> PantryResult<()> {
  match (order.payment_method.is_cod(), order.payment_status) {
    (true, PaymentStatus::Pending) | (false, PaymentStatus::Received) => Ok(()),
    (true, status) => {
      warn!(order_id = %order.id, %status, "COD order has already been settled.");
      Err(PantryError::IllegalPaymentState {
        order_id: order.id.clone(),
        status,
      })
    }
    (false, status) => {
      warn!(order_id = %order.id, %status, "Prepaid order has not been paid.");
      Err(PantryError::PaymentNotReceived {
        order_id: order.id.clone(),
        status,
      })
    }
  }
}

/// Conditional status write. Losing the race to another writer surfaces as
/// `InvalidState` with the status that writer left behind.
pub(crate) async fn advance(
  tx: &mut dyn StoreTx,
  order_id: &str,
  from: OrderStatus,
  to: OrderStatus,
) -> PantryResult<()> {
  if tx.compare_and_set_order_status(order_id, from, to).await? {
    info!(order_id, %from, %to, "Order status changed.");
    return Ok(());
  }
  let actual = load_order(tx, order_id).await?.status;
  warn!(order_id, expected = %from, %actual, "Order status changed underneath the operation.");
  Err(PantryError::InvalidState {
    order_id: order_id.to_string(),
    expected: from,
    actual,
  })
}

/// Units needed per product. Line items pinned to different price snapshots
/// of one product are summed.
pub(crate) fn required_quantities(items: &[OrderLineItem]) -> BTreeMap<String, i32> {
  let mut required = BTreeMap::new();
  for item in items {
    *required.entry(item.product_id.clone()).or_insert(0) += item.quantity;
  }
  required
}

pub(crate) fn loaded_order<T: LoadedOrder + Send + Sync>(ctx: &SharedContext<T>) -> PantryResult<Order> {
  let c = ctx.read();
  c.loaded()
    .cloned()
    .ok_or_else(|| PantryError::not_found("order", c.order_id()))
}
