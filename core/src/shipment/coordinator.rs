// pantry/src/shipment/coordinator.rs

use super::assign::{assign_workflow, load_shipper, AssignContext};
use super::sweep::{revert_assignment, sweep_stale_assignments};
use super::timers::AssignmentTimers;
use crate::collaborators::Collaborators;
use crate::error::{PantryError, PantryResult};
use crate::lifecycle::{guards, run_and_commit};
use crate::models::{OrderProcess, OrderStatus, ShipmentStatus, ShipperAvailability, ShipperStatus};
use crate::services::templates;
use crate::settings::Settings;
use crate::store::{Page, PageRequest, SharedTx, StoreError, StoreTx};
use crate::workflow::{SharedContext, Workflow};
use chrono::NaiveTime;
use serde_json::json;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Matches orders waiting for delivery with shippers and drives each
/// pairing through offer, acceptance, departure and hand-over.
///
/// Status and current order of a shipper are always written together through
/// a conditional swap, so concurrent calls on the same shipper cannot both win.
pub struct ShipmentCoordinator {
  deps: Collaborators,
  timers: AssignmentTimers,
  assign: Workflow<AssignContext, PantryError>,
}

async fn load_process(tx: &mut dyn StoreTx, order_id: &str) -> PantryResult<OrderProcess> {
  tx.order_process(order_id)
    .await?
    .ok_or_else(|| PantryError::not_found("order process", order_id))
}

fn ensure_delivered_by(process: &OrderProcess, shipper_id: &str) -> PantryResult<()> {
  if !process.is_delivered_by(shipper_id) {
    warn!(order_id = %process.order_id, shipper_id, "Shipper is not the order's deliverer.");
    return Err(PantryError::NotYourOrder {
      order_id: process.order_id.clone(),
      shipper_id: shipper_id.to_string(),
    });
  }
  Ok(())
}

/// Writes `next` over `current`, failing when another transaction moved the row first.
async fn swap(tx: &mut dyn StoreTx, current: &ShipperAvailability, next: &ShipperAvailability) -> PantryResult<()> {
  if tx
    .swap_shipper(next, current.status, current.current_order.as_deref())
    .await?
  {
    return Ok(());
  }
  Err(
    StoreError::Conflict(format!(
      "shipper {} changed during the operation",
      current.shipper_id
    ))
    .into(),
  )
}

pub(crate) fn validate_shift(settings: &Settings, start: NaiveTime, end: NaiveTime) -> PantryResult<()> {
  if start >= end {
    return Err(PantryError::InvalidRange { start, end });
  }
  if start < settings.earliest_shift_start {
    return Err(PantryError::TooEarly {
      earliest: settings.earliest_shift_start,
    });
  }
  if end > settings.latest_shift_end {
    return Err(PantryError::TooLate {
      latest: settings.latest_shift_end,
    });
  }
  Ok(())
}

impl ShipmentCoordinator {
  pub fn new(deps: Collaborators, timers: AssignmentTimers) -> Self {
    Self {
      deps,
      timers,
      assign: assign_workflow(),
    }
  }

  pub fn timers(&self) -> &AssignmentTimers {
    &self.timers
  }

  /// Offers `order_id` to `shipper_id`, notifies the shipper and arms the
  /// acceptance timeout.
  #[instrument(name = "ShipmentCoordinator::assign_shipper", skip(self), err(Display))]
  pub async fn assign_shipper(&self, order_id: &str, shipper_id: &str) -> PantryResult<ShipperAvailability> {
    let tx = SharedTx::begin(self.deps.store.as_ref()).await?;
    let ctx = SharedContext::new(AssignContext {
      tx: tx.clone(),
      order_id: order_id.to_string(),
      shipper_id: shipper_id.to_string(),
      now: self.deps.clock.now(),
      local_time: self.deps.clock.local_time(),
      order: None,
      process: None,
      shipper: None,
    });
    run_and_commit(&self.assign, &ctx, &tx).await?;

    let (order, shipper) = {
      let c = ctx.read();
      (c.order.clone(), c.shipper.clone())
    };
    let (Some(order), Some(shipper)) = (order, shipper) else {
      return Err(PantryError::not_found("shipper", shipper_id));
    };

    self.deps.notifications.dispatch(
      shipper_id,
      templates::SHIPMENT_ASSIGNED,
      json!({
        "order_id": order.id,
        "receiver_name": order.receiver_name,
        "receiver_phone": order.receiver_phone,
        "address": order.address,
        "note": order.note,
        "cod_amount": order.cod_amount().to_string(),
      }),
    );

    let deps = self.deps.clone();
    let generation = shipper.assigned_at;
    let (timer_order, timer_shipper) = (order_id.to_string(), shipper_id.to_string());
    self.timers.schedule(
      order_id,
      shipper_id,
      self.deps.settings.assignment_timeout,
      async move {
        match revert_assignment(&deps, &timer_order, &timer_shipper, generation).await {
          Ok(true) => info!(order_id = %timer_order, shipper_id = %timer_shipper, "Offer expired."),
          Ok(false) => debug!(order_id = %timer_order, "Offer was settled before the timeout."),
          Err(e) => error!(order_id = %timer_order, error = %e, "Failed to withdraw expired offer."),
        }
      },
    );
    Ok(shipper)
  }

  #[instrument(name = "ShipmentCoordinator::accept_shipment", skip(self), err(Display))]
  pub async fn accept_shipment(&self, order_id: &str, shipper_id: &str) -> PantryResult<ShipperAvailability> {
    let mut tx = self.deps.store.begin().await?;
    let shipper = load_shipper(tx.as_mut(), shipper_id).await?;
    if !shipper.holds(order_id) {
      warn!(order_id, shipper_id, "Order was not offered to this shipper.");
      return Err(PantryError::NotAssignedToYou {
        order_id: order_id.to_string(),
        shipper_id: shipper_id.to_string(),
      });
    }
    if shipper.status != ShipperStatus::Assign {
      return Err(PantryError::AlreadyAccepted {
        order_id: order_id.to_string(),
        shipper_id: shipper_id.to_string(),
      });
    }

    let mut next = shipper.clone();
    next.accept();
    swap(tx.as_mut(), &shipper, &next).await?;
    let mut process = load_process(tx.as_mut(), order_id).await?;
    process.deliver_by = Some(shipper_id.to_string());
    process.shipment_status = ShipmentStatus::Accepted;
    tx.save_order_process(&process).await?;
    tx.commit().await?;

    self.timers.defuse(order_id, shipper_id);
    info!(order_id, shipper_id, "Shipment accepted.");
    Ok(next)
  }

  #[instrument(name = "ShipmentCoordinator::reject_shipment", skip(self), err(Display))]
  pub async fn reject_shipment(&self, order_id: &str, shipper_id: &str) -> PantryResult<ShipperAvailability> {
    let mut tx = self.deps.store.begin().await?;
    let mut process = load_process(tx.as_mut(), order_id).await?;
    ensure_delivered_by(&process, shipper_id)?;
    let shipper = load_shipper(tx.as_mut(), shipper_id).await?;
    if !shipper.holds(order_id) || !matches!(shipper.status, ShipperStatus::Assign | ShipperStatus::Accepted) {
      warn!(order_id, shipper_id, status = %shipper.status, "Shipment can no longer be rejected.");
      return Err(PantryError::NotYourOrder {
        order_id: order_id.to_string(),
        shipper_id: shipper_id.to_string(),
      });
    }

    let mut next = shipper.clone();
    next.decline();
    swap(tx.as_mut(), &shipper, &next).await?;
    process.deliver_by = None;
    process.shipment_status = ShipmentStatus::Rejected;
    tx.save_order_process(&process).await?;
    tx.commit().await?;

    self.timers.defuse(order_id, shipper_id);
    info!(order_id, shipper_id, "Shipment rejected.");
    Ok(next)
  }

  /// The shipper leaves with the order: order `ON_SHIPPING`, shipper `ON_SHIPPING`.
  #[instrument(name = "ShipmentCoordinator::start_shipping", skip(self), err(Display))]
  pub async fn start_shipping(&self, order_id: &str, shipper_id: &str) -> PantryResult<OrderProcess> {
    let mut tx = self.deps.store.begin().await?;
    let mut process = load_process(tx.as_mut(), order_id).await?;
    ensure_delivered_by(&process, shipper_id)?;
    let order = guards::load_order(tx.as_mut(), order_id).await?;
    if order.status != OrderStatus::OnProcessing {
      warn!(order_id, status = %order.status, "Order cannot leave the store.");
      return Err(PantryError::OrderNotShippable {
        order_id: order_id.to_string(),
      });
    }
    guards::ensure_payment(&order)?;
    let shipper = load_shipper(tx.as_mut(), shipper_id).await?;
    if !shipper.holds(order_id) || shipper.status != ShipperStatus::Accepted {
      warn!(order_id, shipper_id, status = %shipper.status, "Shipment has not been accepted.");
      return Err(PantryError::NotYourOrder {
        order_id: order_id.to_string(),
        shipper_id: shipper_id.to_string(),
      });
    }

    guards::advance(tx.as_mut(), order_id, OrderStatus::OnProcessing, OrderStatus::OnShipping).await?;
    let mut next = shipper.clone();
    next.depart();
    swap(tx.as_mut(), &shipper, &next).await?;
    process.shipping_date = Some(self.deps.clock.now());
    process.shipment_status = ShipmentStatus::OnShipping;
    tx.save_order_process(&process).await?;
    tx.commit().await?;

    self.timers.defuse(order_id, shipper_id);
    info!(order_id, shipper_id, "Shipping started.");
    Ok(process)
  }

  /// The shipper hands the order over: order `SHIPPED`, shipper back to `IDLE`.
  #[instrument(name = "ShipmentCoordinator::complete_shipment", skip(self), err(Display))]
  pub async fn complete_shipment(&self, order_id: &str, shipper_id: &str) -> PantryResult<OrderProcess> {
    let mut tx = self.deps.store.begin().await?;
    let mut process = load_process(tx.as_mut(), order_id).await?;
    ensure_delivered_by(&process, shipper_id)?;
    let order = guards::load_order(tx.as_mut(), order_id).await?;
    if order.status != OrderStatus::OnShipping {
      warn!(order_id, status = %order.status, "Order is not out for delivery.");
      return Err(PantryError::OrderNotShippable {
        order_id: order_id.to_string(),
      });
    }
    let shipper = load_shipper(tx.as_mut(), shipper_id).await?;
    if !shipper.holds(order_id) || shipper.status != ShipperStatus::OnShipping {
      return Err(PantryError::NotYourOrder {
        order_id: order_id.to_string(),
        shipper_id: shipper_id.to_string(),
      });
    }

    guards::advance(tx.as_mut(), order_id, OrderStatus::OnShipping, OrderStatus::Shipped).await?;
    let mut next = shipper.clone();
    next.release();
    swap(tx.as_mut(), &shipper, &next).await?;
    process.shipment_status = ShipmentStatus::Delivered;
    tx.save_order_process(&process).await?;
    tx.commit().await?;

    info!(order_id, shipper_id, "Shipment completed.");
    Ok(process)
  }

  #[instrument(name = "ShipmentCoordinator::set_shift_time", skip(self), err(Display))]
  pub async fn set_shift_time(
    &self,
    shipper_id: &str,
    start: NaiveTime,
    end: NaiveTime,
  ) -> PantryResult<ShipperAvailability> {
    validate_shift(&self.deps.settings, start, end)?;

    let mut tx = self.deps.store.begin().await?;
    let shipper = load_shipper(tx.as_mut(), shipper_id).await?;
    let mut next = shipper.clone();
    next.start_shift = Some(start);
    next.end_shift = Some(end);
    swap(tx.as_mut(), &shipper, &next).await?;
    tx.commit().await?;
    info!(shipper_id, %start, %end, "Shift updated.");
    Ok(next)
  }

  /// Creates an `IDLE` availability row without a shift. Registering an
  /// existing shipper returns the stored row unchanged.
  #[instrument(name = "ShipmentCoordinator::register_shipper", skip(self), err(Display))]
  pub async fn register_shipper(&self, shipper_id: &str) -> PantryResult<ShipperAvailability> {
    let mut tx = self.deps.store.begin().await?;
    if let Some(existing) = tx.shipper(shipper_id).await? {
      debug!(shipper_id, "Shipper already registered.");
      return Ok(existing);
    }
    let shipper = ShipperAvailability::new(shipper_id);
    tx.insert_shipper(&shipper).await?;
    tx.commit().await?;
    info!(shipper_id, "Shipper registered.");
    Ok(shipper)
  }

  pub async fn shipper(&self, shipper_id: &str) -> PantryResult<ShipperAvailability> {
    let mut tx = self.deps.store.begin().await?;
    load_shipper(tx.as_mut(), shipper_id).await
  }

  pub async fn list_shippers(
    &self,
    status: Option<ShipperStatus>,
    page: PageRequest,
  ) -> PantryResult<Page<ShipperAvailability>> {
    let mut tx = self.deps.store.begin().await?;
    Ok(tx.list_shippers(status, page).await?)
  }

  pub async fn order_process(&self, order_id: &str) -> PantryResult<OrderProcess> {
    let mut tx = self.deps.store.begin().await?;
    load_process(tx.as_mut(), order_id).await
  }

  pub async fn sweep_stale_assignments(&self) -> PantryResult<usize> {
    sweep_stale_assignments(&self.deps).await
  }

  /// Sweeps once right away, then every `sweep_interval`, until `shutdown` fires.
  /// Pending timers are cancelled on the way out.
  pub async fn run_reconciliation(&self, shutdown: CancellationToken) {
    info!(
      interval_secs = self.deps.settings.sweep_interval.as_secs(),
      "Assignment reconciliation started."
    );
    let mut interval = tokio::time::interval(self.deps.settings.sweep_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      tokio::select! {
        _ = shutdown.cancelled() => {
          info!("Assignment reconciliation received shutdown signal.");
          break;
        }
        _ = interval.tick() => {
          match self.sweep_stale_assignments().await {
            Ok(0) => debug!("No stale assignments."),
            Ok(reverted) => info!(reverted, "Stale assignments reverted."),
            Err(e) => error!(error = %e, "Stale assignment sweep failed."),
          }
        }
      }
    }
    self.timers.cancel_all();
  }
}

impl std::fmt::Debug for ShipmentCoordinator {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ShipmentCoordinator")
      .field("deps", &self.deps)
      .field("timers", &self.timers)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn at(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap()
  }

  #[test]
  fn shift_bounds_are_enforced() {
    let settings = Settings::default();
    assert!(validate_shift(&settings, at(8), at(23)).is_ok());
    assert!(matches!(validate_shift(&settings, at(12), at(12)), Err(PantryError::InvalidRange { .. })));
    assert!(matches!(validate_shift(&settings, at(14), at(10)), Err(PantryError::InvalidRange { .. })));
    assert!(matches!(validate_shift(&settings, at(7), at(12)), Err(PantryError::TooEarly { .. })));
    let late_end = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
    assert!(matches!(validate_shift(&settings, at(9), late_end), Err(PantryError::TooLate { .. })));
  }
}
