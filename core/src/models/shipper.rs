// pantry/src/models/shipper.rs

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "shipper_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipperStatus {
  Idle,
  Assign,
  Accepted,
  OnShipping,
  Rejected,
}

impl ShipperStatus {
  /// Statuses in which the shipper holds an order.
  pub fn holds_order(self) -> bool {
    matches!(self, ShipperStatus::Assign | ShipperStatus::Accepted | ShipperStatus::OnShipping)
  }
}

impl fmt::Display for ShipperStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      ShipperStatus::Idle => "IDLE",
      ShipperStatus::Assign => "ASSIGN",
      ShipperStatus::Accepted => "ACCEPTED",
      ShipperStatus::OnShipping => "ON_SHIPPING",
      ShipperStatus::Rejected => "REJECTED",
    })
  }
}

/// Long-lived availability row of one shipper.
///
/// `status` and `current_order` move together: `current_order` is set iff
/// `status.holds_order()`. The methods below are the only writers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ShipperAvailability {
  pub shipper_id: String,
  pub start_shift: Option<NaiveTime>,
  pub end_shift: Option<NaiveTime>,
  pub status: ShipperStatus,
  pub current_order: Option<String>,
  pub assigned_at: Option<DateTime<Utc>>,
}

impl ShipperAvailability {
  pub fn new(shipper_id: &str) -> Self {
    Self {
      shipper_id: shipper_id.to_string(),
      start_shift: None,
      end_shift: None,
      status: ShipperStatus::Idle,
      current_order: None,
      assigned_at: None,
    }
  }

  pub fn holds(&self, order_id: &str) -> bool {
    self.current_order.as_deref() == Some(order_id)
  }

  pub fn is_consistent(&self) -> bool {
    self.status.holds_order() == self.current_order.is_some()
  }

  pub(crate) fn offer(&mut self, order_id: &str, at: DateTime<Utc>) {
    self.status = ShipperStatus::Assign;
    self.current_order = Some(order_id.to_string());
    self.assigned_at = Some(at);
  }

  pub(crate) fn accept(&mut self) {
    self.status = ShipperStatus::Accepted;
  }

  pub(crate) fn depart(&mut self) {
    self.status = ShipperStatus::OnShipping;
  }

  pub(crate) fn decline(&mut self) {
    self.status = ShipperStatus::Rejected;
    self.current_order = None;
    self.assigned_at = None;
  }

  pub(crate) fn release(&mut self) {
    self.status = ShipperStatus::Idle;
    self.current_order = None;
    self.assigned_at = None;
  }
}
