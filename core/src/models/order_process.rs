// pantry/src/models/order_process.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "shipment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
  /// Accepted by staff, not yet offered to a shipper.
  Awaiting,
  Assign,
  Accepted,
  Rejected,
  OnShipping,
  Delivered,
}

/// Shipment-side record of an order, created when staff accepts the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrderProcess {
  pub order_id: String,
  pub confirm_date: DateTime<Utc>,
  pub process_by: String,
  pub shipping_date: Option<DateTime<Utc>>,
  pub deliver_by: Option<String>,
  pub shipment_status: ShipmentStatus,
}

impl OrderProcess {
  pub fn new(order_id: &str, staff_id: &str, confirm_date: DateTime<Utc>) -> Self {
    Self {
      order_id: order_id.to_string(),
      confirm_date,
      process_by: staff_id.to_string(),
      shipping_date: None,
      deliver_by: None,
      shipment_status: ShipmentStatus::Awaiting,
    }
  }

  pub fn is_delivered_by(&self, shipper_id: &str) -> bool {
    self.deliver_by.as_deref() == Some(shipper_id)
  }
}
