// pantry/src/lifecycle/workflows.rs

//! Stage wiring of the order workflows.
//!
//! Every stage takes the transaction from its context, so a failure anywhere
//! leaves the whole operation uncommitted.

use super::contexts::{AcceptContext, CancelContext, DeliveryContext, TransitionContext};
use super::guards;
use crate::error::PantryError;
use crate::models::{OrderProcess, OrderStatus, PaymentStatus, PaymentTransaction, ShipmentStatus};
use crate::store::StoreError;
use crate::workflow::{SharedContext, SkipCondition, StageControl, Workflow};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub(crate) fn accept_workflow() -> Workflow<AcceptContext, PantryError> {
  let mut wf = Workflow::new(
    "accept_order",
    &[
      ("load_order", false, None),
      ("reserve_stock", false, None),
      ("advance_status", false, None),
      ("open_process", false, None),
    ],
  );

  wf.on("load_order", |ctx: SharedContext<AcceptContext>| async move {
    let (tx, order_id) = {
      let c = ctx.read();
      (c.tx.clone(), c.order_id.clone())
    };
    let mut tx = tx.lock().await;
    let order = guards::load_order(&mut **tx, &order_id).await?;
    guards::ensure_status(&order, OrderStatus::OnConfirm)?;
    guards::ensure_payment(&order)?;
    let items = tx.order_items(&order_id).await?;

    let mut c = ctx.write();
    c.order = Some(order);
    c.items = items;
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf.on("reserve_stock", |ctx: SharedContext<AcceptContext>| async move {
    let (tx, items) = {
      let c = ctx.read();
      (c.tx.clone(), c.items.clone())
    };
    let mut tx = tx.lock().await;
    for (product_id, requested) in guards::required_quantities(&items) {
      let mut product = tx
        .product(&product_id)
        .await?
        .ok_or_else(|| PantryError::not_found("product", &product_id))?;
      if product.available_quantity < requested {
        warn!(%product_id, requested, available = product.available_quantity, "Not enough stock to accept order.");
        return Err(PantryError::InsufficientStock {
          product_id,
          requested,
          available: product.available_quantity,
        });
      }
      product.debit(requested);
      tx.save_product(&product).await?;
      debug!(%product_id, requested, left = product.available_quantity, "Stock debited.");
    }
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf.on("advance_status", |ctx: SharedContext<AcceptContext>| async move {
    let (tx, order_id) = {
      let c = ctx.read();
      (c.tx.clone(), c.order_id.clone())
    };
    guards::advance(&mut **tx.lock().await, &order_id, OrderStatus::OnConfirm, OrderStatus::OnProcessing).await?;
    if let Some(order) = ctx.write().order.as_mut() {
      order.status = OrderStatus::OnProcessing;
    }
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf.on("open_process", |ctx: SharedContext<AcceptContext>| async move {
    let (tx, process) = {
      let c = ctx.read();
      (c.tx.clone(), OrderProcess::new(&c.order_id, &c.staff_id, c.now))
    };
    tx.lock().await.save_order_process(&process).await?;
    debug!(order_id = %process.order_id, process_by = %process.process_by, "Order process opened.");
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf
}

pub(crate) fn cancel_workflow() -> Workflow<CancelContext, PantryError> {
  let prepaid_only: SkipCondition<CancelContext> = Arc::new(|ctx: SharedContext<CancelContext>| {
    ctx.read().order.as_ref().map_or(true, |o| o.payment_method.is_cod())
  });

  let mut wf = Workflow::new(
    "cancel_order",
    &[
      ("load_order", false, None),
      ("advance_status", false, None),
      ("restore_stock", false, None),
      ("release_shipper", true, None),
      // Must stay last: nothing but the commit may fail after a refund.
      ("refund_payment", false, Some(prepaid_only)),
    ],
  );

  wf.on("load_order", |ctx: SharedContext<CancelContext>| async move {
    let (tx, order_id) = {
      let c = ctx.read();
      (c.tx.clone(), c.order_id.clone())
    };
    let mut tx = tx.lock().await;
    let order = guards::load_order(&mut **tx, &order_id).await?;
    match order.status {
      OrderStatus::Cancelled => return Err(PantryError::AlreadyCancelled { order_id }),
      OrderStatus::Delivered => return Err(PantryError::AlreadyDelivered { order_id }),
      status @ (OrderStatus::OnShipping | OrderStatus::Shipped) => {
        warn!(%order_id, %status, "Order is already with the shipper.");
        return Err(PantryError::CannotCancelInTransit { order_id, status });
      }
      OrderStatus::OnConfirm | OrderStatus::OnProcessing => {}
    }
    let items = tx.order_items(&order_id).await?;

    let mut c = ctx.write();
    c.order = Some(order);
    c.items = items;
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf.on("advance_status", |ctx: SharedContext<CancelContext>| async move {
    let order = guards::loaded_order(&ctx)?;
    let tx = ctx.read().tx.clone();
    guards::advance(&mut **tx.lock().await, &order.id, order.status, OrderStatus::Cancelled).await?;
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf.on("restore_stock", |ctx: SharedContext<CancelContext>| async move {
    let order = guards::loaded_order(&ctx)?;
    // Stock is only taken when staff accepts the order.
    if order.status == OrderStatus::OnConfirm {
      return Ok(StageControl::Continue);
    }
    let (tx, items) = {
      let c = ctx.read();
      (c.tx.clone(), c.items.clone())
    };
    let mut tx = tx.lock().await;
    for (product_id, quantity) in guards::required_quantities(&items) {
      let mut product = tx
        .product(&product_id)
        .await?
        .ok_or_else(|| PantryError::not_found("product", &product_id))?;
      product.credit(quantity);
      tx.save_product(&product).await?;
      debug!(%product_id, quantity, available = product.available_quantity, "Stock credited back.");
    }
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf.on("release_shipper", |ctx: SharedContext<CancelContext>| async move {
    let (tx, order_id) = {
      let c = ctx.read();
      (c.tx.clone(), c.order_id.clone())
    };
    let mut tx = tx.lock().await;
    let mut released = Vec::new();
    for holder in tx.shippers_holding(&order_id).await? {
      let mut next = holder.clone();
      next.release();
      if !tx.swap_shipper(&next, holder.status, Some(&order_id)).await? {
        return Err(PantryError::from(StoreError::Conflict(format!(
          "shipper {} changed while releasing order {}",
          holder.shipper_id, order_id
        ))));
      }
      info!(%order_id, shipper_id = %holder.shipper_id, "Shipper released from cancelled order.");
      released.push(holder.shipper_id);
    }
    if let Some(mut process) = tx.order_process(&order_id).await? {
      if process.deliver_by.take().is_some() {
        process.shipment_status = ShipmentStatus::Awaiting;
        tx.save_order_process(&process).await?;
      }
    }
    ctx.write().released_shippers = released;
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf.on("refund_payment", |ctx: SharedContext<CancelContext>| async move {
    let order = guards::loaded_order(&ctx)?;
    let (tx, gateway) = {
      let c = ctx.read();
      (c.tx.clone(), Arc::clone(&c.gateway))
    };
    let mut tx = tx.lock().await;
    let Some(mut payment) = tx.payment_for_order(&order.id).await? else {
      debug!(order_id = %order.id, "No captured payment to refund.");
      return Ok(StageControl::Continue);
    };
    if payment.status != PaymentStatus::Received {
      debug!(order_id = %order.id, status = %payment.status, "Payment is not refundable.");
      return Ok(StageControl::Continue);
    }

    let refund_id = gateway.refund(&payment.id, payment.amount).await.map_err(|e| {
      error!(order_id = %order.id, payment_id = %payment.id, error = %e, "Refund failed; cancellation rolls back.");
      e
    })?;
    payment.status = PaymentStatus::Refunded;
    payment.refund_id = Some(refund_id.clone());
    tx.save_payment(&payment).await?;
    tx.set_payment_status(&order.id, PaymentStatus::Refunded).await?;
    info!(order_id = %order.id, %refund_id, amount = %payment.amount, "Payment refunded.");

    let mut c = ctx.write();
    c.refund_id = Some(refund_id);
    if let Some(o) = c.order.as_mut() {
      o.payment_status = PaymentStatus::Refunded;
    }
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf
}

pub(crate) fn transition_workflow() -> Workflow<TransitionContext, PantryError> {
  let mut wf = Workflow::new("transition", &[("check_order", false, None), ("apply", false, None)]);

  wf.on("check_order", |ctx: SharedContext<TransitionContext>| async move {
    let (tx, order_id, expected, check_payment) = {
      let c = ctx.read();
      (c.tx.clone(), c.order_id.clone(), c.expected, c.check_payment)
    };
    let order = guards::load_order(&mut **tx.lock().await, &order_id).await?;
    guards::ensure_status(&order, expected)?;
    if check_payment {
      guards::ensure_payment(&order)?;
    }
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf.on("apply", |ctx: SharedContext<TransitionContext>| async move {
    let (tx, order_id, expected, target) = {
      let c = ctx.read();
      (c.tx.clone(), c.order_id.clone(), c.expected, c.target)
    };
    let mut tx = tx.lock().await;
    guards::advance(&mut **tx, &order_id, expected, target).await?;
    let stored = guards::load_order(&mut **tx, &order_id).await?.status;
    if stored != target {
      warn!(%order_id, %stored, %target, "Stored status differs from the one just written.");
    }
    ctx.write().applied = stored == target;
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf
}

pub(crate) fn delivery_workflow() -> Workflow<DeliveryContext, PantryError> {
  let cod_only: SkipCondition<DeliveryContext> = Arc::new(|ctx: SharedContext<DeliveryContext>| {
    ctx.read().order.as_ref().map_or(true, |o| !o.payment_method.is_cod())
  });

  let mut wf = Workflow::new(
    "confirm_delivery",
    &[
      ("load_order", false, None),
      ("advance_status", false, None),
      ("collect_cod", false, Some(cod_only)),
      ("close_shipment", true, None),
    ],
  );

  wf.on("load_order", |ctx: SharedContext<DeliveryContext>| async move {
    let (tx, order_id) = {
      let c = ctx.read();
      (c.tx.clone(), c.order_id.clone())
    };
    let order = guards::load_order(&mut **tx.lock().await, &order_id).await?;
    guards::ensure_status(&order, OrderStatus::Shipped)?;
    guards::ensure_payment(&order)?;
    ctx.write().order = Some(order);
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf.on("advance_status", |ctx: SharedContext<DeliveryContext>| async move {
    let tx = ctx.read().tx.clone();
    let order_id = ctx.read().order_id.clone();
    guards::advance(&mut **tx.lock().await, &order_id, OrderStatus::Shipped, OrderStatus::Delivered).await?;
    if let Some(order) = ctx.write().order.as_mut() {
      order.status = OrderStatus::Delivered;
    }
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf.on("collect_cod", |ctx: SharedContext<DeliveryContext>| async move {
    let order = guards::loaded_order(&ctx)?;
    let (tx, now) = {
      let c = ctx.read();
      (c.tx.clone(), c.now)
    };
    let mut tx = tx.lock().await;
    tx.set_payment_status(&order.id, PaymentStatus::Received).await?;
    tx.save_payment(&PaymentTransaction {
      id: format!("cod-{}", order.id),
      order_id: order.id.clone(),
      amount: order.cod_amount(),
      status: PaymentStatus::Received,
      refund_id: None,
      created_at: now,
    })
    .await?;
    info!(order_id = %order.id, amount = %order.cod_amount(), "Cash on delivery collected.");
    if let Some(o) = ctx.write().order.as_mut() {
      o.payment_status = PaymentStatus::Received;
    }
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf.on("close_shipment", |ctx: SharedContext<DeliveryContext>| async move {
    let (tx, order_id) = {
      let c = ctx.read();
      (c.tx.clone(), c.order_id.clone())
    };
    let mut tx = tx.lock().await;
    if let Some(mut process) = tx.order_process(&order_id).await? {
      process.shipment_status = ShipmentStatus::Delivered;
      tx.save_order_process(&process).await?;
    }
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf
}
