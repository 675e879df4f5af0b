// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use pantry::models::{
  Coupon, Order, OrderLineItem, OrderProcess, OrderStatus, PaymentMethod, PaymentStatus, PaymentTransaction, Product,
  ProductPriceHistory, ProductStatus, ProductStockHistory, ShipperAvailability, ShipperStatus,
};
use pantry::services::{GatewayError, ManualClock, NotificationDispatcher, Notifier, PaymentGateway};
use pantry::{Collaborators, MemoryStore, Page, PageRequest, Pantry, Settings, Store, StoreError, StoreTx};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::Level;

// --- Tracing ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Collaborator doubles ---
#[derive(Debug, Clone, PartialEq)]
pub struct SentNotification {
  pub recipient: String,
  pub template: String,
  pub variables: Value,
}

#[derive(Default)]
pub struct RecordingNotifier {
  pub sent: Mutex<Vec<SentNotification>>,
  pub fail: AtomicBool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
  async fn send(&self, recipient: &str, template: &str, variables: &Value) -> anyhow::Result<()> {
    if self.fail.load(Ordering::SeqCst) {
      anyhow::bail!("smtp relay refused the message");
    }
    self.sent.lock().push(SentNotification {
      recipient: recipient.to_string(),
      template: template.to_string(),
      variables: variables.clone(),
    });
    Ok(())
  }
}

impl RecordingNotifier {
  pub fn sent_with(&self, template: &str) -> Vec<SentNotification> {
    self.sent.lock().iter().filter(|n| n.template == template).cloned().collect()
  }
}

#[derive(Default)]
pub struct ScriptedGateway {
  pub refunds: Mutex<Vec<(String, Decimal)>>,
  pub fail_with: Mutex<Option<GatewayError>>,
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
  async fn refund(&self, payment_id: &str, amount: Decimal) -> Result<String, GatewayError> {
    if let Some(e) = self.fail_with.lock().clone() {
      return Err(e);
    }
    let mut refunds = self.refunds.lock();
    refunds.push((payment_id.to_string(), amount));
    Ok(format!("refund-{}", refunds.len()))
  }
}

/// `MemoryStore` whose shipper rows can be made to lose every conditional swap,
/// as if another transaction always got there first.
#[derive(Clone, Default)]
pub struct ContestedStore {
  pub inner: MemoryStore,
  pub contested: Arc<AtomicBool>,
}

impl ContestedStore {
  pub fn contest_shippers(&self, on: bool) {
    self.contested.store(on, Ordering::SeqCst);
  }
}

#[async_trait]
impl Store for ContestedStore {
  async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
    Ok(Box::new(ContestedTx {
      inner: self.inner.begin().await?,
      contested: self.contested.clone(),
    }))
  }
}

struct ContestedTx {
  inner: Box<dyn StoreTx>,
  contested: Arc<AtomicBool>,
}

#[async_trait]
impl StoreTx for ContestedTx {
  async fn order(&mut self, order_id: &str) -> Result<Option<Order>, StoreError> {
    self.inner.order(order_id).await
  }
  async fn order_items(&mut self, order_id: &str) -> Result<Vec<OrderLineItem>, StoreError> {
    self.inner.order_items(order_id).await
  }
  async fn insert_order(&mut self, order: &Order, items: &[OrderLineItem]) -> Result<(), StoreError> {
    self.inner.insert_order(order, items).await
  }
  async fn compare_and_set_order_status(
    &mut self,
    order_id: &str,
    expected: OrderStatus,
    target: OrderStatus,
  ) -> Result<bool, StoreError> {
    self.inner.compare_and_set_order_status(order_id, expected, target).await
  }
  async fn set_payment_status(&mut self, order_id: &str, status: PaymentStatus) -> Result<(), StoreError> {
    self.inner.set_payment_status(order_id, status).await
  }
  async fn list_orders(&mut self, status: Option<OrderStatus>, page: PageRequest) -> Result<Page<Order>, StoreError> {
    self.inner.list_orders(status, page).await
  }
  async fn payment_for_order(&mut self, order_id: &str) -> Result<Option<PaymentTransaction>, StoreError> {
    self.inner.payment_for_order(order_id).await
  }
  async fn save_payment(&mut self, payment: &PaymentTransaction) -> Result<(), StoreError> {
    self.inner.save_payment(payment).await
  }
  async fn product(&mut self, product_id: &str) -> Result<Option<Product>, StoreError> {
    self.inner.product(product_id).await
  }
  async fn save_product(&mut self, product: &Product) -> Result<(), StoreError> {
    self.inner.save_product(product).await
  }
  async fn insert_price_history(&mut self, entry: &ProductPriceHistory) -> Result<(), StoreError> {
    self.inner.insert_price_history(entry).await
  }
  async fn insert_stock_history(&mut self, entry: &ProductStockHistory) -> Result<(), StoreError> {
    self.inner.insert_stock_history(entry).await
  }
  async fn price_history(&mut self, product_id: &str) -> Result<Vec<ProductPriceHistory>, StoreError> {
    self.inner.price_history(product_id).await
  }
  async fn stock_history(&mut self, product_id: &str) -> Result<Vec<ProductStockHistory>, StoreError> {
    self.inner.stock_history(product_id).await
  }
  async fn order_process(&mut self, order_id: &str) -> Result<Option<OrderProcess>, StoreError> {
    self.inner.order_process(order_id).await
  }
  async fn save_order_process(&mut self, process: &OrderProcess) -> Result<(), StoreError> {
    self.inner.save_order_process(process).await
  }
  async fn shipper(&mut self, shipper_id: &str) -> Result<Option<ShipperAvailability>, StoreError> {
    self.inner.shipper(shipper_id).await
  }
  async fn insert_shipper(&mut self, shipper: &ShipperAvailability) -> Result<(), StoreError> {
    self.inner.insert_shipper(shipper).await
  }
  async fn swap_shipper(
    &mut self,
    next: &ShipperAvailability,
    expected_status: ShipperStatus,
    expected_order: Option<&str>,
  ) -> Result<bool, StoreError> {
    if self.contested.load(Ordering::SeqCst) {
      return Ok(false);
    }
    self.inner.swap_shipper(next, expected_status, expected_order).await
  }
  async fn shippers_holding(&mut self, order_id: &str) -> Result<Vec<ShipperAvailability>, StoreError> {
    self.inner.shippers_holding(order_id).await
  }
  async fn stale_assignments(&mut self, cutoff: DateTime<Utc>) -> Result<Vec<ShipperAvailability>, StoreError> {
    self.inner.stale_assignments(cutoff).await
  }
  async fn list_shippers(
    &mut self,
    status: Option<ShipperStatus>,
    page: PageRequest,
  ) -> Result<Page<ShipperAvailability>, StoreError> {
    self.inner.list_shippers(status, page).await
  }
  async fn coupon(&mut self, coupon_id: &str) -> Result<Option<Coupon>, StoreError> {
    self.inner.coupon(coupon_id).await
  }
  async fn save_coupon(&mut self, coupon: &Coupon) -> Result<(), StoreError> {
    self.inner.save_coupon(coupon).await
  }
  async fn commit(&mut self) -> Result<(), StoreError> {
    self.inner.commit().await
  }
}

// --- Harness ---
pub const STAFF: &str = "staff-01";

/// 03:00 UTC, i.e. 10:00 in the store's timezone.
pub fn opening_time() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap()
}

pub fn hm(h: u32, m: u32) -> NaiveTime {
  NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn money(units: i64) -> Decimal {
  Decimal::new(units, 0)
}

pub struct Harness {
  pub store: MemoryStore,
  pub contested: ContestedStore,
  pub clock: Arc<ManualClock>,
  pub notifier: Arc<RecordingNotifier>,
  pub gateway: Arc<ScriptedGateway>,
  pub pantry: Pantry,
}

impl Harness {
  pub fn new() -> Self {
    Self::with_settings(Settings::default())
  }

  pub fn with_settings(settings: Settings) -> Self {
    let contested = ContestedStore::default();
    let store = contested.inner.clone();
    let clock = Arc::new(ManualClock::new(opening_time(), chrono_tz::Asia::Ho_Chi_Minh));
    let notifier = Arc::new(RecordingNotifier::default());
    let gateway = Arc::new(ScriptedGateway::default());
    let deps = Collaborators {
      store: Arc::new(contested.clone()),
      gateway: gateway.clone(),
      notifications: NotificationDispatcher::new(notifier.clone()),
      clock: clock.clone(),
      settings,
    };
    Self {
      pantry: Pantry::new(deps),
      store,
      contested,
      clock,
      notifier,
      gateway,
    }
  }

  /// A second set of services over the same store, as after a process restart.
  pub fn restarted(&self) -> Pantry {
    Pantry::new(Collaborators {
      store: Arc::new(self.contested.clone()),
      gateway: self.gateway.clone(),
      notifications: NotificationDispatcher::new(self.notifier.clone()),
      clock: self.clock.clone(),
      settings: Settings::default(),
    })
  }

  // --- Seeding ---
  pub async fn seed_product(&self, id: &str, quantity: i32) {
    let mut tx = self.store.begin().await.unwrap();
    tx.save_product(&Product {
      id: id.to_string(),
      name: format!("Product {id}"),
      available_quantity: quantity,
      status: if quantity > 0 {
        ProductStatus::InStock
      } else {
        ProductStatus::OutOfStock
      },
      price: money(25_000),
      sale_percent: 0,
    })
    .await
    .unwrap();
    tx.commit().await.unwrap();
  }

  pub async fn seed_order(
    &self,
    id: &str,
    method: PaymentMethod,
    payment_status: PaymentStatus,
    status: OrderStatus,
    items: &[(&str, i32)],
  ) {
    let order = Order {
      id: id.to_string(),
      user_id: format!("customer-of-{id}"),
      order_date: self.clock_now(),
      address: "12 Nguyen Hue, District 1".to_string(),
      receiver_name: "Tran Thi B".to_string(),
      receiver_phone: "0901234567".to_string(),
      note: Some("Leave at reception".to_string()),
      total_price: money(120_000),
      coupon_id: None,
      payment_method: method,
      payment_status,
      status,
    };
    let lines: Vec<OrderLineItem> = items
      .iter()
      .map(|(product_id, quantity)| OrderLineItem {
        order_id: id.to_string(),
        product_id: product_id.to_string(),
        price_date: opening_time(),
        quantity: *quantity,
      })
      .collect();
    let mut tx = self.store.begin().await.unwrap();
    tx.insert_order(&order, &lines).await.unwrap();
    tx.commit().await.unwrap();
  }

  pub async fn seed_cod_order(&self, id: &str, items: &[(&str, i32)]) {
    self
      .seed_order(id, PaymentMethod::Cod, PaymentStatus::Pending, OrderStatus::OnConfirm, items)
      .await;
  }

  /// A prepaid order whose payment was captured.
  pub async fn seed_paid_order(&self, id: &str, items: &[(&str, i32)]) {
    self
      .seed_order(id, PaymentMethod::Paypal, PaymentStatus::Received, OrderStatus::OnConfirm, items)
      .await;
    let mut tx = self.store.begin().await.unwrap();
    tx.save_payment(&PaymentTransaction {
      id: format!("pay-{id}"),
      order_id: id.to_string(),
      amount: money(120_000),
      status: PaymentStatus::Received,
      refund_id: None,
      created_at: self.clock_now(),
    })
    .await
    .unwrap();
    tx.commit().await.unwrap();
  }

  pub async fn seed_shipper(&self, id: &str, shift: Option<(NaiveTime, NaiveTime)>) {
    let mut shipper = ShipperAvailability::new(id);
    if let Some((start, end)) = shift {
      shipper.start_shift = Some(start);
      shipper.end_shift = Some(end);
    }
    let mut tx = self.store.begin().await.unwrap();
    tx.insert_shipper(&shipper).await.unwrap();
    tx.commit().await.unwrap();
  }

  pub async fn seed_coupon(&self, id: &str, usage_left: i32, expire_date: NaiveDate, minimum: Decimal) {
    let mut tx = self.store.begin().await.unwrap();
    tx.save_coupon(&Coupon {
      id: id.to_string(),
      expire_date,
      sale_percent: 15,
      usage_amount: usage_left.max(0),
      usage_left,
      minimum_price: minimum,
    })
    .await
    .unwrap();
    tx.commit().await.unwrap();
  }

  /// Order accepted by staff and ready to be offered to a shipper.
  pub async fn processing_order(&self, id: &str) {
    let goods = format!("{id}-goods");
    self.seed_product(&goods, 10).await;
    self.seed_cod_order(id, &[(goods.as_str(), 1)]).await;
    self.pantry.orders.accept_order(id, STAFF).await.unwrap();
  }

  // --- Reads ---
  pub fn clock_now(&self) -> DateTime<Utc> {
    use pantry::services::Clock;
    self.clock.now()
  }

  pub async fn product(&self, id: &str) -> Product {
    self.store.begin().await.unwrap().product(id).await.unwrap().unwrap()
  }

  pub async fn order(&self, id: &str) -> Order {
    self.store.begin().await.unwrap().order(id).await.unwrap().unwrap()
  }

  pub async fn shipper(&self, id: &str) -> ShipperAvailability {
    self.store.begin().await.unwrap().shipper(id).await.unwrap().unwrap()
  }

  pub async fn process(&self, order_id: &str) -> Option<OrderProcess> {
    self.store.begin().await.unwrap().order_process(order_id).await.unwrap()
  }

  pub async fn payment(&self, order_id: &str) -> Option<PaymentTransaction> {
    self.store.begin().await.unwrap().payment_for_order(order_id).await.unwrap()
  }

  /// Lets spawned notification tasks run.
  pub async fn settle(&self) {
    for _ in 0..16 {
      tokio::task::yield_now().await;
    }
  }
}
