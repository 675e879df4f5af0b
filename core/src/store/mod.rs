// pantry/src/store/mod.rs

//! Transactional persistence contract and its backends.
//!
//! Every lifecycle operation runs inside exactly one [`StoreTx`]. A transaction
//! that is dropped without [`StoreTx::commit`] leaves no trace.

pub mod memory;
pub mod postgres;
pub mod shared;

use crate::models::{
  Coupon, Order, OrderLineItem, OrderProcess, OrderStatus, PaymentStatus, PaymentTransaction, Product, ProductPriceHistory,
  ProductStockHistory, ShipperAvailability, ShipperStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use shared::SharedTx;

pub const DEFAULT_PAGE_SIZE: u32 = 7;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Transaction already finished")]
  Finished,

  #[error("Conflicting write: {0}")]
  Conflict(String),
}

/// `(page_index, page_size)` paging request. Index is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
  pub index: u32,
  pub size: u32,
}

impl Default for PageRequest {
  fn default() -> Self {
    Self {
      index: 0,
      size: DEFAULT_PAGE_SIZE,
    }
  }
}

impl PageRequest {
  pub fn new(index: u32, size: u32) -> Self {
    Self { index, size }
  }

  pub fn offset(&self) -> usize {
    self.index as usize * self.size as usize
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: u64,
}

#[async_trait]
pub trait Store: Send + Sync {
  async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;
}

/// One open transaction. Reads observe the transaction's own writes.
#[async_trait]
pub trait StoreTx: Send {
  // --- Orders ---
  async fn order(&mut self, order_id: &str) -> Result<Option<Order>, StoreError>;
  async fn order_items(&mut self, order_id: &str) -> Result<Vec<OrderLineItem>, StoreError>;
  async fn insert_order(&mut self, order: &Order, items: &[OrderLineItem]) -> Result<(), StoreError>;
  /// Writes `target` only if the stored status is still `expected`. Returns whether a row changed.
  async fn compare_and_set_order_status(
    &mut self,
    order_id: &str,
    expected: OrderStatus,
    target: OrderStatus,
  ) -> Result<bool, StoreError>;
  async fn set_payment_status(&mut self, order_id: &str, status: PaymentStatus) -> Result<(), StoreError>;
  async fn list_orders(&mut self, status: Option<OrderStatus>, page: PageRequest) -> Result<Page<Order>, StoreError>;

  // --- Payments ---
  async fn payment_for_order(&mut self, order_id: &str) -> Result<Option<PaymentTransaction>, StoreError>;
  async fn save_payment(&mut self, payment: &PaymentTransaction) -> Result<(), StoreError>;

  // --- Products ---
  async fn product(&mut self, product_id: &str) -> Result<Option<Product>, StoreError>;
  async fn save_product(&mut self, product: &Product) -> Result<(), StoreError>;
  async fn insert_price_history(&mut self, entry: &ProductPriceHistory) -> Result<(), StoreError>;
  async fn insert_stock_history(&mut self, entry: &ProductStockHistory) -> Result<(), StoreError>;
  async fn price_history(&mut self, product_id: &str) -> Result<Vec<ProductPriceHistory>, StoreError>;
  async fn stock_history(&mut self, product_id: &str) -> Result<Vec<ProductStockHistory>, StoreError>;

  // --- Shipment ---
  async fn order_process(&mut self, order_id: &str) -> Result<Option<OrderProcess>, StoreError>;
  async fn save_order_process(&mut self, process: &OrderProcess) -> Result<(), StoreError>;
  async fn shipper(&mut self, shipper_id: &str) -> Result<Option<ShipperAvailability>, StoreError>;
  async fn insert_shipper(&mut self, shipper: &ShipperAvailability) -> Result<(), StoreError>;
  /// Replaces the shipper row only if its stored status and current order still
  /// match. Status and current order are written together or not at all.
  async fn swap_shipper(
    &mut self,
    next: &ShipperAvailability,
    expected_status: ShipperStatus,
    expected_order: Option<&str>,
  ) -> Result<bool, StoreError>;
  async fn shippers_holding(&mut self, order_id: &str) -> Result<Vec<ShipperAvailability>, StoreError>;
  /// Shippers still in `ASSIGN` whose offer was made at or before `cutoff`.
  async fn stale_assignments(&mut self, cutoff: DateTime<Utc>) -> Result<Vec<ShipperAvailability>, StoreError>;
  async fn list_shippers(
    &mut self,
    status: Option<ShipperStatus>,
    page: PageRequest,
  ) -> Result<Page<ShipperAvailability>, StoreError>;

  // --- Coupons ---
  async fn coupon(&mut self, coupon_id: &str) -> Result<Option<Coupon>, StoreError>;
  async fn save_coupon(&mut self, coupon: &Coupon) -> Result<(), StoreError>;

  async fn commit(&mut self) -> Result<(), StoreError>;
}
