// pantry/src/shipment/sweep.rs

//! Withdrawing offers that were not accepted in time.
//!
//! The in-process timer covers the common case. The sweep covers offers whose
//! timer was lost, for instance across a restart, using the persisted
//! `assigned_at` of each shipper row.

use super::assign::load_shipper;
use crate::collaborators::Collaborators;
use crate::error::PantryResult;
use crate::models::{ShipmentStatus, ShipperStatus};
use crate::services::templates;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, instrument};

pub(crate) const EXPIRED_REASON: &str = "not accepted in time";

/// Returns the shipper to `IDLE` if it still holds an unaccepted offer of
/// `order_id`. With `generation` set, only the offer made at that instant is
/// withdrawn, so a newer offer of the same pair survives an old timer.
///
/// Returns whether anything was reverted.
#[instrument(name = "shipment::revert_assignment", skip(deps), err(Display))]
pub(crate) async fn revert_assignment(
  deps: &Collaborators,
  order_id: &str,
  shipper_id: &str,
  generation: Option<DateTime<Utc>>,
) -> PantryResult<bool> {
  let mut tx = deps.store.begin().await?;
  let shipper = load_shipper(tx.as_mut(), shipper_id).await?;
  let still_offered = shipper.status == ShipperStatus::Assign && shipper.holds(order_id);
  if !still_offered || generation.is_some_and(|g| shipper.assigned_at != Some(g)) {
    debug!(status = %shipper.status, "Offer already settled; nothing to revert.");
    return Ok(false);
  }

  let mut next = shipper.clone();
  next.release();
  if !tx.swap_shipper(&next, ShipperStatus::Assign, Some(order_id)).await? {
    return Ok(false);
  }
  if let Some(mut process) = tx.order_process(order_id).await? {
    if process.is_delivered_by(shipper_id) {
      process.deliver_by = None;
      process.shipment_status = ShipmentStatus::Awaiting;
      tx.save_order_process(&process).await?;
    }
  }
  tx.commit().await?;

  info!("Unaccepted offer withdrawn.");
  deps.notifications.dispatch(
    shipper_id,
    templates::SHIPMENT_REVOKED,
    json!({ "order_id": order_id, "reason": EXPIRED_REASON }),
  );
  Ok(true)
}

/// Reverts every offer older than the assignment timeout. Returns how many were reverted.
#[instrument(name = "shipment::sweep_stale_assignments", skip(deps), err(Display))]
pub(crate) async fn sweep_stale_assignments(deps: &Collaborators) -> PantryResult<usize> {
  let cutoff = chrono::Duration::from_std(deps.settings.assignment_timeout)
    .ok()
    .and_then(|timeout| deps.clock.now().checked_sub_signed(timeout));
  let Some(cutoff) = cutoff else {
    return Ok(0);
  };
  let stale = {
    let mut tx = deps.store.begin().await?;
    tx.stale_assignments(cutoff).await?
  };

  let mut reverted = 0;
  for shipper in stale {
    let Some(order_id) = shipper.current_order.as_deref() else {
      continue;
    };
    if revert_assignment(deps, order_id, &shipper.shipper_id, shipper.assigned_at).await? {
      reverted += 1;
    }
  }
  Ok(reverted)
}
