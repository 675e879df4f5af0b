// pantry/src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
  OnConfirm,
  OnProcessing,
  OnShipping,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 6] = [
    OrderStatus::OnConfirm,
    OrderStatus::OnProcessing,
    OrderStatus::OnShipping,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
  ];

  /// Direct successors in the lifecycle graph.
  pub fn successors(self) -> &'static [OrderStatus] {
    match self {
      OrderStatus::OnConfirm => &[OrderStatus::OnProcessing, OrderStatus::Cancelled],
      OrderStatus::OnProcessing => &[OrderStatus::OnShipping, OrderStatus::Cancelled],
      OrderStatus::OnShipping => &[OrderStatus::Shipped],
      OrderStatus::Shipped => &[OrderStatus::Delivered],
      OrderStatus::Delivered | OrderStatus::Cancelled => &[],
    }
  }

  pub fn can_transition_to(self, target: OrderStatus) -> bool {
    self.successors().contains(&target)
  }

  pub fn is_terminal(self) -> bool {
    self.successors().is_empty()
  }

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::OnConfirm => "ON_CONFIRM",
      OrderStatus::OnProcessing => "ON_PROCESSING",
      OrderStatus::OnShipping => "ON_SHIPPING",
      OrderStatus::Shipped => "SHIPPED",
      OrderStatus::Delivered => "DELIVERED",
      OrderStatus::Cancelled => "CANCELLED",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
  Paypal,
  Vnpay,
  Cod,
}

impl PaymentMethod {
  pub fn is_cod(self) -> bool {
    matches!(self, PaymentMethod::Cod)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
  Pending,
  Received,
  Refunded,
}

impl fmt::Display for PaymentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      PaymentStatus::Pending => "PENDING",
      PaymentStatus::Received => "RECEIVED",
      PaymentStatus::Refunded => "REFUNDED",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
  pub id: String,
  pub user_id: String,
  pub order_date: DateTime<Utc>,
  pub address: String,
  pub receiver_name: String,
  pub receiver_phone: String,
  pub note: Option<String>,
  pub total_price: Decimal,
  pub coupon_id: Option<String>,
  pub payment_method: PaymentMethod,
  pub payment_status: PaymentStatus,
  pub status: OrderStatus,
}

impl Order {
  /// Amount the shipper collects at the door; zero for prepaid orders.
  pub fn cod_amount(&self) -> Decimal {
    if self.payment_method.is_cod() {
      self.total_price
    } else {
      Decimal::ZERO
    }
  }
}

/// One product/quantity pairing, pinned to the price snapshot taken at `price_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrderLineItem {
  pub order_id: String,
  pub product_id: String,
  pub price_date: DateTime<Utc>,
  pub quantity: i32,
}

/// A captured payment for a prepaid order, as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PaymentTransaction {
  pub id: String,
  pub order_id: String,
  pub amount: Decimal,
  pub status: PaymentStatus,
  pub refund_id: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cancellation_is_only_reachable_before_shipping() {
    let cancellable: Vec<_> = OrderStatus::ALL
      .into_iter()
      .filter(|s| s.can_transition_to(OrderStatus::Cancelled))
      .collect();
    assert_eq!(cancellable, vec![OrderStatus::OnConfirm, OrderStatus::OnProcessing]);
  }

  #[test]
  fn terminal_states_have_no_exit() {
    assert!(OrderStatus::Cancelled.is_terminal());
    assert!(OrderStatus::Delivered.is_terminal());
    assert!(!OrderStatus::Shipped.is_terminal());
  }

  #[test]
  fn processing_is_never_skipped() {
    assert!(!OrderStatus::OnConfirm.can_transition_to(OrderStatus::OnShipping));
    assert!(!OrderStatus::OnConfirm.can_transition_to(OrderStatus::Shipped));
    assert!(OrderStatus::OnProcessing.can_transition_to(OrderStatus::OnShipping));
  }
}
