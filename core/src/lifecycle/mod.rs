// pantry/src/lifecycle/mod.rs

//! The order state machine.
//!
//! Each operation opens one store transaction, runs its workflow over a
//! context holding that transaction, and commits only when the workflow
//! completes. Notifications go out after the commit.

pub mod contexts;
pub(crate) mod guards;
mod workflows;

use self::contexts::{AcceptContext, CancelContext, DeliveryContext, TransitionContext};
use crate::collaborators::Collaborators;
use crate::error::{PantryError, PantryResult};
use crate::models::{Order, OrderLineItem, OrderStatus};
use crate::services::templates;
use crate::shipment::AssignmentTimers;
use crate::store::{Page, PageRequest, SharedTx};
use crate::workflow::{SharedContext, Workflow, WorkflowError};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Runs `workflow` and commits `tx` if every stage ran.
pub(crate) async fn run_and_commit<T>(
  workflow: &Workflow<T, PantryError>,
  ctx: &SharedContext<T>,
  tx: &SharedTx,
) -> PantryResult<()>
where
  T: Send + Sync + 'static,
{
  let outcome = workflow.run(ctx.clone()).await?;
  if !outcome.is_completed() {
    return Err(
      WorkflowError::Halted {
        workflow: workflow.name().to_string(),
      }
      .into(),
    );
  }
  tx.commit().await?;
  Ok(())
}

pub struct OrderLifecycle {
  deps: Collaborators,
  timers: AssignmentTimers,
  accept: Workflow<AcceptContext, PantryError>,
  cancel: Workflow<CancelContext, PantryError>,
  transition: Workflow<TransitionContext, PantryError>,
  delivery: Workflow<DeliveryContext, PantryError>,
}

impl OrderLifecycle {
  /// `timers` must be the set the shipment coordinator arms, so a cancellation
  /// can defuse the offers it withdraws.
  pub fn new(deps: Collaborators, timers: AssignmentTimers) -> Self {
    Self {
      deps,
      timers,
      accept: workflows::accept_workflow(),
      cancel: workflows::cancel_workflow(),
      transition: workflows::transition_workflow(),
      delivery: workflows::delivery_workflow(),
    }
  }

  /// Staff confirms an order: stock is debited for every line item, the order
  /// moves to `ON_PROCESSING`, and its shipment record is opened.
  #[instrument(name = "OrderLifecycle::accept_order", skip(self), err(Display))]
  pub async fn accept_order(&self, order_id: &str, staff_id: &str) -> PantryResult<Order> {
    let tx = SharedTx::begin(self.deps.store.as_ref()).await?;
    let ctx = SharedContext::new(AcceptContext {
      tx: tx.clone(),
      order_id: order_id.to_string(),
      staff_id: staff_id.to_string(),
      now: self.deps.clock.now(),
      order: None,
      items: Vec::new(),
    });
    run_and_commit(&self.accept, &ctx, &tx).await?;

    let order = guards::loaded_order(&ctx)?;
    info!(order_id, staff_id, "Order accepted.");
    Ok(order)
  }

  /// Cancels an order that has not left the store, returning its stock and
  /// refunding a captured prepaid payment. A refund failure cancels nothing.
  #[instrument(name = "OrderLifecycle::cancel_order", skip(self), err(Display))]
  pub async fn cancel_order(&self, order_id: &str) -> PantryResult<Order> {
    let tx = SharedTx::begin(self.deps.store.as_ref()).await?;
    let ctx = SharedContext::new(CancelContext {
      tx: tx.clone(),
      gateway: Arc::clone(&self.deps.gateway),
      order_id: order_id.to_string(),
      order: None,
      items: Vec::new(),
      refund_id: None,
      released_shippers: Vec::new(),
    });
    run_and_commit(&self.cancel, &ctx, &tx).await?;

    let mut order = guards::loaded_order(&ctx)?;
    order.status = OrderStatus::Cancelled;
    let (refund_id, released) = {
      let c = ctx.read();
      (c.refund_id.clone(), c.released_shippers.clone())
    };
    info!(order_id, refunded = refund_id.is_some(), "Order cancelled.");

    self.deps.notifications.dispatch(
      &order.user_id,
      templates::ORDER_CANCELLED,
      json!({ "order_id": order.id, "refunded": refund_id.is_some() }),
    );
    for shipper_id in released {
      self.timers.defuse(order_id, &shipper_id);
      self.deps.notifications.dispatch(
        &shipper_id,
        templates::SHIPMENT_REVOKED,
        json!({ "order_id": order.id, "reason": "order cancelled" }),
      );
    }
    Ok(order)
  }

  /// Generic status step along the lifecycle graph.
  ///
  /// Edges with side effects of their own (`ON_CONFIRM -> ON_PROCESSING` and
  /// anything into `CANCELLED`) are refused here. Returns whether the stored
  /// status equals `target` after the write.
  #[instrument(name = "OrderLifecycle::transition", skip(self), err(Display))]
  pub async fn transition(
    &self,
    order_id: &str,
    expected: OrderStatus,
    target: OrderStatus,
    check_payment: bool,
  ) -> PantryResult<bool> {
    let owned_elsewhere = target == OrderStatus::Cancelled
      || (expected == OrderStatus::OnConfirm && target == OrderStatus::OnProcessing);
    if owned_elsewhere || !expected.can_transition_to(target) {
      warn!(order_id, from = %expected, to = %target, "Refusing transition.");
      return Err(PantryError::IllegalTransition {
        from: expected,
        to: target,
      });
    }

    let tx = SharedTx::begin(self.deps.store.as_ref()).await?;
    let ctx = SharedContext::new(TransitionContext {
      tx: tx.clone(),
      order_id: order_id.to_string(),
      expected,
      target,
      check_payment,
      applied: false,
    });
    run_and_commit(&self.transition, &ctx, &tx).await?;
    let applied = ctx.read().applied;
    Ok(applied)
  }

  /// `SHIPPED -> DELIVERED`. Cash on delivery is recorded as received.
  #[instrument(name = "OrderLifecycle::confirm_delivery", skip(self), err(Display))]
  pub async fn confirm_delivery(&self, order_id: &str) -> PantryResult<Order> {
    let tx = SharedTx::begin(self.deps.store.as_ref()).await?;
    let ctx = SharedContext::new(DeliveryContext {
      tx: tx.clone(),
      order_id: order_id.to_string(),
      now: self.deps.clock.now(),
      order: None,
    });
    run_and_commit(&self.delivery, &ctx, &tx).await?;
    info!(order_id, "Order delivered.");
    guards::loaded_order(&ctx)
  }

  pub async fn order(&self, order_id: &str) -> PantryResult<(Order, Vec<OrderLineItem>)> {
    let mut tx = self.deps.store.begin().await?;
    let order = guards::load_order(tx.as_mut(), order_id).await?;
    let items = tx.order_items(order_id).await?;
    Ok((order, items))
  }

  pub async fn list_orders(&self, status: Option<OrderStatus>, page: PageRequest) -> PantryResult<Page<Order>> {
    let mut tx = self.deps.store.begin().await?;
    Ok(tx.list_orders(status, page).await?)
  }
}

impl std::fmt::Debug for OrderLifecycle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OrderLifecycle").field("deps", &self.deps).finish_non_exhaustive()
  }
}
