// pantry/src/shipment/assign.rs

//! Offering an order to a shipper.

use crate::error::{PantryError, PantryResult};
use crate::lifecycle::guards;
use crate::models::{Order, OrderProcess, OrderStatus, ShipmentStatus, ShipperAvailability, ShipperStatus};
use crate::store::{SharedTx, StoreTx};
use crate::workflow::{SharedContext, StageControl, Workflow};
use chrono::{DateTime, NaiveTime, Utc};
use tracing::{info, warn};

#[derive(Debug)]
pub struct AssignContext {
  pub tx: SharedTx,
  pub order_id: String,
  pub shipper_id: String,
  pub now: DateTime<Utc>,
  /// Time of day in the store's timezone.
  pub local_time: NaiveTime,
  pub order: Option<Order>,
  pub process: Option<OrderProcess>,
  pub shipper: Option<ShipperAvailability>,
}

pub(crate) async fn load_shipper(tx: &mut dyn StoreTx, shipper_id: &str) -> PantryResult<ShipperAvailability> {
  tx.shipper(shipper_id)
    .await?
    .ok_or_else(|| PantryError::not_found("shipper", shipper_id))
}

/// The shipper must have a shift and `now` must fall inside it.
pub(crate) fn ensure_on_shift(shipper: &ShipperAvailability, now: NaiveTime) -> PantryResult<()> {
  let (Some(start), Some(end)) = (shipper.start_shift, shipper.end_shift) else {
    return Err(PantryError::NoShiftConfigured {
      shipper_id: shipper.shipper_id.clone(),
    });
  };
  if now < start || now > end {
    return Err(PantryError::OutOfShift {
      shipper_id: shipper.shipper_id.clone(),
      start,
      end,
      now,
    });
  }
  Ok(())
}

pub(crate) fn assign_workflow() -> Workflow<AssignContext, PantryError> {
  let mut wf = Workflow::new(
    "assign_shipper",
    &[
      ("check_order", false, None),
      ("check_shipper", false, None),
      ("check_exclusive", false, None),
      ("offer", false, None),
    ],
  );

  wf.on("check_order", |ctx: SharedContext<AssignContext>| async move {
    let (tx, order_id) = {
      let c = ctx.read();
      (c.tx.clone(), c.order_id.clone())
    };
    let mut tx = tx.lock().await;
    let order = guards::load_order(&mut **tx, &order_id).await?;
    let process = tx.order_process(&order_id).await?;
    let Some(process) = process.filter(|_| order.status == OrderStatus::OnProcessing) else {
      warn!(%order_id, status = %order.status, "Order is not waiting for a shipper.");
      return Err(PantryError::OrderNotShippable { order_id });
    };

    let mut c = ctx.write();
    c.order = Some(order);
    c.process = Some(process);
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf.on("check_shipper", |ctx: SharedContext<AssignContext>| async move {
    let (tx, order_id, shipper_id, local_time) = {
      let c = ctx.read();
      (c.tx.clone(), c.order_id.clone(), c.shipper_id.clone(), c.local_time)
    };
    let shipper = load_shipper(&mut **tx.lock().await, &shipper_id).await?;

    if shipper.holds(&order_id) {
      return Err(PantryError::AlreadyAssigned { order_id, shipper_id });
    }
    if !matches!(shipper.status, ShipperStatus::Idle | ShipperStatus::Rejected) {
      warn!(%shipper_id, status = %shipper.status, "Shipper is busy.");
      return Err(PantryError::ShipperBusy {
        shipper_id,
        status: shipper.status,
      });
    }
    if let Err(e) = ensure_on_shift(&shipper, local_time) {
      warn!(%shipper_id, error = %e, "Shipper cannot take orders now.");
      return Err(e);
    }

    ctx.write().shipper = Some(shipper);
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf.on("check_exclusive", |ctx: SharedContext<AssignContext>| async move {
    let (tx, order_id, shipper_id) = {
      let c = ctx.read();
      (c.tx.clone(), c.order_id.clone(), c.shipper_id.clone())
    };
    let holders = tx.lock().await.shippers_holding(&order_id).await?;
    if let Some(holder) = holders.into_iter().find(|h| h.shipper_id != shipper_id) {
      warn!(%order_id, holder = %holder.shipper_id, "Order already held by another shipper.");
      return Err(PantryError::OrderTaken {
        order_id,
        holder: holder.shipper_id,
      });
    }
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf.on("offer", |ctx: SharedContext<AssignContext>| async move {
    let (tx, order_id, now, shipper, process) = {
      let c = ctx.read();
      (c.tx.clone(), c.order_id.clone(), c.now, c.shipper.clone(), c.process.clone())
    };
    let (Some(shipper), Some(mut process)) = (shipper, process) else {
      return Err(PantryError::OrderNotShippable { order_id });
    };
    let mut tx = tx.lock().await;

    let mut next = shipper.clone();
    next.offer(&order_id, now);
    if !tx.swap_shipper(&next, shipper.status, shipper.current_order.as_deref()).await? {
      let current = load_shipper(&mut **tx, &shipper.shipper_id).await?;
      warn!(shipper_id = %shipper.shipper_id, status = %current.status, "Shipper changed while being assigned.");
      return Err(PantryError::ShipperBusy {
        shipper_id: current.shipper_id,
        status: current.status,
      });
    }

    process.deliver_by = Some(shipper.shipper_id.clone());
    process.shipment_status = ShipmentStatus::Assign;
    tx.save_order_process(&process).await?;
    info!(%order_id, shipper_id = %shipper.shipper_id, "Order offered to shipper.");

    ctx.write().shipper = Some(next);
    Ok::<_, PantryError>(StageControl::Continue)
  });

  wf
}
