// pantry/src/error.rs
use crate::models::{OrderStatus, PaymentStatus, ShipperStatus};
use crate::services::payment::GatewayError;
use crate::store::StoreError;
use crate::workflow::WorkflowError;
use chrono::NaiveTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PantryError {
  #[error("Record not found: {entity} '{id}'")]
  NotFound { entity: &'static str, id: String },

  #[error("Record already exists: {entity} '{id}'")]
  AlreadyExists { entity: &'static str, id: String },

  // --- Order state machine ---
  #[error("Order {order_id} is {actual}, expected {expected}")]
  InvalidState {
    order_id: String,
    expected: OrderStatus,
    actual: OrderStatus,
  },

  #[error("Order status cannot move from {from} to {to} through this operation")]
  IllegalTransition { from: OrderStatus, to: OrderStatus },

  #[error("Product {product_id} has {available} units, {requested} requested")]
  InsufficientStock {
    product_id: String,
    requested: i32,
    available: i32,
  },

  #[error("Cash-on-delivery order {order_id} has payment status {status}, expected PENDING")]
  IllegalPaymentState { order_id: String, status: PaymentStatus },

  #[error("Payment for order {order_id} is {status}, expected RECEIVED")]
  PaymentNotReceived { order_id: String, status: PaymentStatus },

  #[error("Order {order_id} is already cancelled")]
  AlreadyCancelled { order_id: String },

  #[error("Order {order_id} is already delivered")]
  AlreadyDelivered { order_id: String },

  #[error("Order {order_id} is {status} and can no longer be cancelled")]
  CannotCancelInTransit { order_id: String, status: OrderStatus },

  // --- Shipment coordination ---
  #[error("Order {order_id} is not ready for shipping")]
  OrderNotShippable { order_id: String },

  #[error("Shipper {shipper_id} is {status}")]
  ShipperBusy { shipper_id: String, status: ShipperStatus },

  #[error("Shipper {shipper_id} works {start}-{end}, current time is {now}")]
  OutOfShift {
    shipper_id: String,
    start: NaiveTime,
    end: NaiveTime,
    now: NaiveTime,
  },

  #[error("Shipper {shipper_id} has no shift configured")]
  NoShiftConfigured { shipper_id: String },

  #[error("Order {order_id} was not offered to shipper {shipper_id}")]
  NotAssignedToYou { order_id: String, shipper_id: String },

  #[error("Order {order_id} is not delivered by shipper {shipper_id}")]
  NotYourOrder { order_id: String, shipper_id: String },

  #[error("Shipper {shipper_id} already holds order {order_id}")]
  AlreadyAssigned { order_id: String, shipper_id: String },

  #[error("Shipper {shipper_id} already accepted order {order_id}")]
  AlreadyAccepted { order_id: String, shipper_id: String },

  #[error("Order {order_id} is already held by shipper {holder}")]
  OrderTaken { order_id: String, holder: String },

  #[error("Shift start {start} must be before end {end}")]
  InvalidRange { start: NaiveTime, end: NaiveTime },

  #[error("Shift cannot start before {earliest}")]
  TooEarly { earliest: NaiveTime },

  #[error("Shift cannot end after {latest}")]
  TooLate { latest: NaiveTime },

  // --- Inventory ---
  #[error("Amount must be positive, got {amount}")]
  InvalidAmount { amount: i32 },

  #[error("Price must be positive")]
  InvalidPrice,

  #[error("Sale percent cannot be negative, got {sale_percent}")]
  InvalidSalePercent { sale_percent: i32 },

  #[error("Product {product_id} has no stock left")]
  QuantityEmpty { product_id: String },

  // --- Coupons ---
  #[error("Coupon {coupon_id} has expired")]
  CouponExpired { coupon_id: String },

  #[error("Coupon {coupon_id} is disabled")]
  CouponDisabled { coupon_id: String },

  #[error("Coupon {coupon_id} has no uses left")]
  CouponExhausted { coupon_id: String },

  #[error("Coupon {coupon_id} requires an order of at least {minimum}")]
  CouponMinimumNotMet {
    coupon_id: String,
    minimum: rust_decimal::Decimal,
  },

  #[error("Coupon usage left {usage_left} must be between -1 and the usage amount {usage_amount}")]
  InvalidCouponUsage { usage_left: i32, usage_amount: i32 },

  // --- Infrastructure ---
  #[error("Store error: {0}")]
  Store(#[from] StoreError),

  #[error("Payment gateway failure: {0}")]
  Gateway(#[from] GatewayError),

  #[error("Workflow error: {0}")]
  Workflow(#[from] WorkflowError),
}

/// Coarse classification used at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  /// Input that fails validation before any state is consulted.
  Validation,
  /// A business rule rejected the operation; nothing was written.
  Rule,
  /// Infrastructure failure; the enclosing transaction was rolled back.
  Fatal,
}

impl PantryError {
  pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
    PantryError::NotFound { entity, id: id.into() }
  }

  pub fn kind(&self) -> ErrorKind {
    use PantryError::*;
    match self {
      NotFound { .. } => ErrorKind::NotFound,
      InvalidAmount { .. }
      | InvalidPrice
      | InvalidSalePercent { .. }
      | InvalidRange { .. }
      | TooEarly { .. }
      | TooLate { .. }
      | InvalidCouponUsage { .. } => ErrorKind::Validation,
      Store(_) | Gateway(_) | Workflow(_) => ErrorKind::Fatal,
      _ => ErrorKind::Rule,
    }
  }

  pub fn is_recoverable(&self) -> bool {
    self.kind() != ErrorKind::Fatal
  }
}

pub type PantryResult<T, E = PantryError> = std::result::Result<T, E>;
