// pantry/src/store/memory.rs

//! In-process backend.
//!
//! A transaction holds the single table lock from `begin` until it commits or
//! is dropped, so transactions are serializable. Writes go to a private copy of
//! the tables which replaces the shared copy on commit.

use super::{Page, PageRequest, Store, StoreError, StoreTx};
use crate::models::{
  Coupon, Order, OrderLineItem, OrderProcess, OrderStatus, PaymentStatus, PaymentTransaction, Product,
  ProductPriceHistory, ProductStockHistory, ShipperAvailability, ShipperStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct Tables {
  orders: BTreeMap<String, Order>,
  order_items: BTreeMap<String, Vec<OrderLineItem>>,
  payments: BTreeMap<String, PaymentTransaction>,
  products: BTreeMap<String, Product>,
  price_history: Vec<ProductPriceHistory>,
  stock_history: Vec<ProductStockHistory>,
  processes: BTreeMap<String, OrderProcess>,
  shippers: BTreeMap<String, ShipperAvailability>,
  coupons: BTreeMap<String, Coupon>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
    let guard = Arc::clone(&self.tables).lock_owned().await;
    let working = guard.clone();
    Ok(Box::new(MemoryTx {
      guard: Some(guard),
      working,
    }))
  }
}

struct MemoryTx {
  guard: Option<OwnedMutexGuard<Tables>>,
  working: Tables,
}

impl MemoryTx {
  fn tables(&mut self) -> Result<&mut Tables, StoreError> {
    if self.guard.is_none() {
      return Err(StoreError::Finished);
    }
    Ok(&mut self.working)
  }
}

fn paginate<T: Clone>(rows: Vec<T>, page: PageRequest) -> Page<T> {
  let total = rows.len() as u64;
  let items = rows.into_iter().skip(page.offset()).take(page.size as usize).collect();
  Page { items, total }
}

#[async_trait]
impl StoreTx for MemoryTx {
  async fn order(&mut self, order_id: &str) -> Result<Option<Order>, StoreError> {
    Ok(self.tables()?.orders.get(order_id).cloned())
  }

  async fn order_items(&mut self, order_id: &str) -> Result<Vec<OrderLineItem>, StoreError> {
    Ok(self.tables()?.order_items.get(order_id).cloned().unwrap_or_default())
  }

  async fn insert_order(&mut self, order: &Order, items: &[OrderLineItem]) -> Result<(), StoreError> {
    let tables = self.tables()?;
    if tables.orders.contains_key(&order.id) {
      return Err(StoreError::Conflict(format!("order {} already exists", order.id)));
    }
    tables.orders.insert(order.id.clone(), order.clone());
    tables.order_items.insert(order.id.clone(), items.to_vec());
    Ok(())
  }

  async fn compare_and_set_order_status(
    &mut self,
    order_id: &str,
    expected: OrderStatus,
    target: OrderStatus,
  ) -> Result<bool, StoreError> {
    match self.tables()?.orders.get_mut(order_id) {
      Some(order) if order.status == expected => {
        order.status = target;
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn set_payment_status(&mut self, order_id: &str, status: PaymentStatus) -> Result<(), StoreError> {
    if let Some(order) = self.tables()?.orders.get_mut(order_id) {
      order.payment_status = status;
    }
    Ok(())
  }

  async fn list_orders(&mut self, status: Option<OrderStatus>, page: PageRequest) -> Result<Page<Order>, StoreError> {
    let mut rows: Vec<Order> = self
      .tables()?
      .orders
      .values()
      .filter(|o| status.map_or(true, |s| o.status == s))
      .cloned()
      .collect();
    rows.sort_by(|a, b| b.order_date.cmp(&a.order_date).then_with(|| a.id.cmp(&b.id)));
    Ok(paginate(rows, page))
  }

  async fn payment_for_order(&mut self, order_id: &str) -> Result<Option<PaymentTransaction>, StoreError> {
    Ok(self.tables()?.payments.get(order_id).cloned())
  }

  async fn save_payment(&mut self, payment: &PaymentTransaction) -> Result<(), StoreError> {
    self.tables()?.payments.insert(payment.order_id.clone(), payment.clone());
    Ok(())
  }

  async fn product(&mut self, product_id: &str) -> Result<Option<Product>, StoreError> {
    Ok(self.tables()?.products.get(product_id).cloned())
  }

  async fn save_product(&mut self, product: &Product) -> Result<(), StoreError> {
    self.tables()?.products.insert(product.id.clone(), product.clone());
    Ok(())
  }

  async fn insert_price_history(&mut self, entry: &ProductPriceHistory) -> Result<(), StoreError> {
    self.tables()?.price_history.push(entry.clone());
    Ok(())
  }

  async fn insert_stock_history(&mut self, entry: &ProductStockHistory) -> Result<(), StoreError> {
    self.tables()?.stock_history.push(entry.clone());
    Ok(())
  }

  async fn price_history(&mut self, product_id: &str) -> Result<Vec<ProductPriceHistory>, StoreError> {
    Ok(
      self
        .tables()?
        .price_history
        .iter()
        .filter(|h| h.product_id == product_id)
        .cloned()
        .collect(),
    )
  }

  async fn stock_history(&mut self, product_id: &str) -> Result<Vec<ProductStockHistory>, StoreError> {
    Ok(
      self
        .tables()?
        .stock_history
        .iter()
        .filter(|h| h.product_id == product_id)
        .cloned()
        .collect(),
    )
  }

  async fn order_process(&mut self, order_id: &str) -> Result<Option<OrderProcess>, StoreError> {
    Ok(self.tables()?.processes.get(order_id).cloned())
  }

  async fn save_order_process(&mut self, process: &OrderProcess) -> Result<(), StoreError> {
    self.tables()?.processes.insert(process.order_id.clone(), process.clone());
    Ok(())
  }

  async fn shipper(&mut self, shipper_id: &str) -> Result<Option<ShipperAvailability>, StoreError> {
    Ok(self.tables()?.shippers.get(shipper_id).cloned())
  }

  async fn insert_shipper(&mut self, shipper: &ShipperAvailability) -> Result<(), StoreError> {
    let tables = self.tables()?;
    if tables.shippers.contains_key(&shipper.shipper_id) {
      return Err(StoreError::Conflict(format!("shipper {} already exists", shipper.shipper_id)));
    }
    tables.shippers.insert(shipper.shipper_id.clone(), shipper.clone());
    Ok(())
  }

  async fn swap_shipper(
    &mut self,
    next: &ShipperAvailability,
    expected_status: ShipperStatus,
    expected_order: Option<&str>,
  ) -> Result<bool, StoreError> {
    match self.tables()?.shippers.get_mut(&next.shipper_id) {
      Some(row) if row.status == expected_status && row.current_order.as_deref() == expected_order => {
        *row = next.clone();
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn shippers_holding(&mut self, order_id: &str) -> Result<Vec<ShipperAvailability>, StoreError> {
    Ok(self.tables()?.shippers.values().filter(|s| s.holds(order_id)).cloned().collect())
  }

  async fn stale_assignments(&mut self, cutoff: DateTime<Utc>) -> Result<Vec<ShipperAvailability>, StoreError> {
    Ok(
      self
        .tables()?
        .shippers
        .values()
        .filter(|s| s.status == ShipperStatus::Assign && s.assigned_at.map_or(false, |at| at <= cutoff))
        .cloned()
        .collect(),
    )
  }

  async fn list_shippers(
    &mut self,
    status: Option<ShipperStatus>,
    page: PageRequest,
  ) -> Result<Page<ShipperAvailability>, StoreError> {
    let rows: Vec<ShipperAvailability> = self
      .tables()?
      .shippers
      .values()
      .filter(|s| status.map_or(true, |st| s.status == st))
      .cloned()
      .collect();
    Ok(paginate(rows, page))
  }

  async fn coupon(&mut self, coupon_id: &str) -> Result<Option<Coupon>, StoreError> {
    Ok(self.tables()?.coupons.get(coupon_id).cloned())
  }

  async fn save_coupon(&mut self, coupon: &Coupon) -> Result<(), StoreError> {
    self.tables()?.coupons.insert(coupon.id.clone(), coupon.clone());
    Ok(())
  }

  async fn commit(&mut self) -> Result<(), StoreError> {
    let mut guard = self.guard.take().ok_or(StoreError::Finished)?;
    *guard = std::mem::take(&mut self.working);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::ProductStatus;
  use rust_decimal::Decimal;

  fn product(id: &str, quantity: i32) -> Product {
    Product {
      id: id.to_string(),
      name: id.to_string(),
      available_quantity: quantity,
      status: ProductStatus::InStock,
      price: Decimal::new(10, 0),
      sale_percent: 0,
    }
  }

  #[tokio::test]
  async fn dropped_transaction_leaves_no_trace() {
    let store = MemoryStore::new();
    {
      let mut tx = store.begin().await.unwrap();
      tx.save_product(&product("kale", 4)).await.unwrap();
    }
    let mut tx = store.begin().await.unwrap();
    assert!(tx.product("kale").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn committed_writes_are_visible_to_later_transactions() {
    let store = MemoryStore::new();
    let mut tx = store.begin().await.unwrap();
    tx.save_product(&product("kale", 4)).await.unwrap();
    tx.commit().await.unwrap();
    drop(tx);

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.product("kale").await.unwrap().unwrap().available_quantity, 4);
  }

  #[tokio::test]
  async fn use_after_commit_is_rejected() {
    let store = MemoryStore::new();
    let mut tx = store.begin().await.unwrap();
    tx.commit().await.unwrap();
    assert!(matches!(tx.product("kale").await, Err(StoreError::Finished)));
    assert!(matches!(tx.commit().await, Err(StoreError::Finished)));
  }

  #[tokio::test]
  async fn swap_shipper_requires_matching_status_and_order() {
    let store = MemoryStore::new();
    let mut tx = store.begin().await.unwrap();
    let idle = ShipperAvailability::new("s1");
    tx.insert_shipper(&idle).await.unwrap();

    let mut offered = idle.clone();
    offered.offer("o1", Utc::now());
    assert!(!tx.swap_shipper(&offered, ShipperStatus::Assign, None).await.unwrap());
    assert!(tx.swap_shipper(&offered, ShipperStatus::Idle, None).await.unwrap());
    assert!(!tx.swap_shipper(&offered, ShipperStatus::Idle, None).await.unwrap());
    assert_eq!(tx.shippers_holding("o1").await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn paging_reports_total_count() {
    let store = MemoryStore::new();
    let mut tx = store.begin().await.unwrap();
    for i in 0..10 {
      tx.insert_shipper(&ShipperAvailability::new(&format!("s{i:02}"))).await.unwrap();
    }
    let first = tx.list_shippers(None, PageRequest::default()).await.unwrap();
    assert_eq!(first.total, 10);
    assert_eq!(first.items.len(), 7);
    let second = tx.list_shippers(None, PageRequest::new(1, 7)).await.unwrap();
    assert_eq!(second.items.len(), 3);
    assert_eq!(second.items[0].shipper_id, "s07");
  }
}
