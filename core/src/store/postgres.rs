// pantry/src/store/postgres.rs

//! PostgreSQL backend over `sqlx`. Schema lives in `core/schema.sql`.
//!
//! Rows that an operation is about to modify are read with `FOR UPDATE`, and
//! status changes are conditional updates, so two transactions racing on the
//! same order or shipper cannot both win.

use super::{Page, PageRequest, Store, StoreError, StoreTx};
use crate::models::{
  Coupon, Order, OrderLineItem, OrderProcess, OrderStatus, PaymentStatus, PaymentTransaction, Product,
  ProductPriceHistory, ProductStockHistory, ShipperAvailability, ShipperStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

const ORDER_COLUMNS: &str = "id, user_id, order_date, address, receiver_name, receiver_phone, note, total_price, \
                             coupon_id, payment_method, payment_status, status";
const SHIPPER_COLUMNS: &str = "shipper_id, start_shift, end_shift, status, current_order, assigned_at";

#[derive(Debug, Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }
}

#[async_trait]
impl Store for PgStore {
  #[instrument(name = "PgStore::begin", skip(self), err(Display))]
  async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
    let tx = self.pool.begin().await?;
    debug!("Postgres transaction opened.");
    Ok(Box::new(PgTx { tx: Some(tx) }))
  }
}

struct PgTx {
  tx: Option<Transaction<'static, Postgres>>,
}

impl PgTx {
  fn conn(&mut self) -> Result<&mut PgConnection, StoreError> {
    self.tx.as_deref_mut().ok_or(StoreError::Finished)
  }
}

#[async_trait]
impl StoreTx for PgTx {
  async fn order(&mut self, order_id: &str) -> Result<Option<Order>, StoreError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
    Ok(
      sqlx::query_as::<_, Order>(&sql)
        .bind(order_id)
        .fetch_optional(self.conn()?)
        .await?,
    )
  }

  async fn order_items(&mut self, order_id: &str) -> Result<Vec<OrderLineItem>, StoreError> {
    Ok(
      sqlx::query_as::<_, OrderLineItem>(
        "SELECT order_id, product_id, price_date, quantity FROM order_line_items WHERE order_id = $1 \
         ORDER BY product_id",
      )
      .bind(order_id)
      .fetch_all(self.conn()?)
      .await?,
    )
  }

  async fn insert_order(&mut self, order: &Order, items: &[OrderLineItem]) -> Result<(), StoreError> {
    let sql = format!(
      "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
    );
    sqlx::query(&sql)
      .bind(&order.id)
      .bind(&order.user_id)
      .bind(order.order_date)
      .bind(&order.address)
      .bind(&order.receiver_name)
      .bind(&order.receiver_phone)
      .bind(&order.note)
      .bind(order.total_price)
      .bind(&order.coupon_id)
      .bind(order.payment_method)
      .bind(order.payment_status)
      .bind(order.status)
      .execute(self.conn()?)
      .await?;

    for item in items {
      sqlx::query("INSERT INTO order_line_items (order_id, product_id, price_date, quantity) VALUES ($1, $2, $3, $4)")
        .bind(&item.order_id)
        .bind(&item.product_id)
        .bind(item.price_date)
        .bind(item.quantity)
        .execute(self.conn()?)
        .await?;
    }
    Ok(())
  }

  async fn compare_and_set_order_status(
    &mut self,
    order_id: &str,
    expected: OrderStatus,
    target: OrderStatus,
  ) -> Result<bool, StoreError> {
    let result = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2 AND status = $3")
      .bind(target)
      .bind(order_id)
      .bind(expected)
      .execute(self.conn()?)
      .await?;
    Ok(result.rows_affected() == 1)
  }

  async fn set_payment_status(&mut self, order_id: &str, status: PaymentStatus) -> Result<(), StoreError> {
    sqlx::query("UPDATE orders SET payment_status = $1 WHERE id = $2")
      .bind(status)
      .bind(order_id)
      .execute(self.conn()?)
      .await?;
    Ok(())
  }

  async fn list_orders(&mut self, status: Option<OrderStatus>, page: PageRequest) -> Result<Page<Order>, StoreError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE ($1::order_status IS NULL OR status = $1)")
      .bind(status)
      .fetch_one(self.conn()?)
      .await?;
    let sql = format!(
      "SELECT {ORDER_COLUMNS} FROM orders WHERE ($1::order_status IS NULL OR status = $1) \
       ORDER BY order_date DESC, id LIMIT $2 OFFSET $3"
    );
    let items = sqlx::query_as::<_, Order>(&sql)
      .bind(status)
      .bind(i64::from(page.size))
      .bind(page.offset() as i64)
      .fetch_all(self.conn()?)
      .await?;
    Ok(Page {
      items,
      total: total as u64,
    })
  }

  async fn payment_for_order(&mut self, order_id: &str) -> Result<Option<PaymentTransaction>, StoreError> {
    Ok(
      sqlx::query_as::<_, PaymentTransaction>(
        "SELECT id, order_id, amount, status, refund_id, created_at FROM payment_transactions \
         WHERE order_id = $1 FOR UPDATE",
      )
      .bind(order_id)
      .fetch_optional(self.conn()?)
      .await?,
    )
  }

  async fn save_payment(&mut self, payment: &PaymentTransaction) -> Result<(), StoreError> {
    sqlx::query(
      "INSERT INTO payment_transactions (id, order_id, amount, status, refund_id, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6) \
       ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status, refund_id = EXCLUDED.refund_id",
    )
    .bind(&payment.id)
    .bind(&payment.order_id)
    .bind(payment.amount)
    .bind(payment.status)
    .bind(&payment.refund_id)
    .bind(payment.created_at)
    .execute(self.conn()?)
    .await?;
    Ok(())
  }

  async fn product(&mut self, product_id: &str) -> Result<Option<Product>, StoreError> {
    Ok(
      sqlx::query_as::<_, Product>(
        "SELECT id, name, available_quantity, status, price, sale_percent FROM products WHERE id = $1 FOR UPDATE",
      )
      .bind(product_id)
      .fetch_optional(self.conn()?)
      .await?,
    )
  }

  async fn save_product(&mut self, product: &Product) -> Result<(), StoreError> {
    sqlx::query(
      "INSERT INTO products (id, name, available_quantity, status, price, sale_percent) \
       VALUES ($1, $2, $3, $4, $5, $6) \
       ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, available_quantity = EXCLUDED.available_quantity, \
       status = EXCLUDED.status, price = EXCLUDED.price, sale_percent = EXCLUDED.sale_percent",
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(product.available_quantity)
    .bind(product.status)
    .bind(product.price)
    .bind(product.sale_percent)
    .execute(self.conn()?)
    .await?;
    Ok(())
  }

  async fn insert_price_history(&mut self, entry: &ProductPriceHistory) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO product_price_history (product_id, date, price, sale_percent) VALUES ($1, $2, $3, $4)")
      .bind(&entry.product_id)
      .bind(entry.date)
      .bind(entry.price)
      .bind(entry.sale_percent)
      .execute(self.conn()?)
      .await?;
    Ok(())
  }

  async fn insert_stock_history(&mut self, entry: &ProductStockHistory) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO product_stock_history (product_id, date, in_price, in_stock) VALUES ($1, $2, $3, $4)")
      .bind(&entry.product_id)
      .bind(entry.date)
      .bind(entry.in_price)
      .bind(entry.in_stock)
      .execute(self.conn()?)
      .await?;
    Ok(())
  }

  async fn price_history(&mut self, product_id: &str) -> Result<Vec<ProductPriceHistory>, StoreError> {
    Ok(
      sqlx::query_as::<_, ProductPriceHistory>(
        "SELECT product_id, date, price, sale_percent FROM product_price_history WHERE product_id = $1 ORDER BY date",
      )
      .bind(product_id)
      .fetch_all(self.conn()?)
      .await?,
    )
  }

  async fn stock_history(&mut self, product_id: &str) -> Result<Vec<ProductStockHistory>, StoreError> {
    Ok(
      sqlx::query_as::<_, ProductStockHistory>(
        "SELECT product_id, date, in_price, in_stock FROM product_stock_history WHERE product_id = $1 ORDER BY date",
      )
      .bind(product_id)
      .fetch_all(self.conn()?)
      .await?,
    )
  }

  async fn order_process(&mut self, order_id: &str) -> Result<Option<OrderProcess>, StoreError> {
    Ok(
      sqlx::query_as::<_, OrderProcess>(
        "SELECT order_id, confirm_date, process_by, shipping_date, deliver_by, shipment_status \
         FROM order_process WHERE order_id = $1 FOR UPDATE",
      )
      .bind(order_id)
      .fetch_optional(self.conn()?)
      .await?,
    )
  }

  async fn save_order_process(&mut self, process: &OrderProcess) -> Result<(), StoreError> {
    sqlx::query(
      "INSERT INTO order_process (order_id, confirm_date, process_by, shipping_date, deliver_by, shipment_status) \
       VALUES ($1, $2, $3, $4, $5, $6) \
       ON CONFLICT (order_id) DO UPDATE SET shipping_date = EXCLUDED.shipping_date, \
       deliver_by = EXCLUDED.deliver_by, shipment_status = EXCLUDED.shipment_status",
    )
    .bind(&process.order_id)
    .bind(process.confirm_date)
    .bind(&process.process_by)
    .bind(process.shipping_date)
    .bind(&process.deliver_by)
    .bind(process.shipment_status)
    .execute(self.conn()?)
    .await?;
    Ok(())
  }

  async fn shipper(&mut self, shipper_id: &str) -> Result<Option<ShipperAvailability>, StoreError> {
    let sql = format!("SELECT {SHIPPER_COLUMNS} FROM shipper_availability WHERE shipper_id = $1 FOR UPDATE");
    Ok(
      sqlx::query_as::<_, ShipperAvailability>(&sql)
        .bind(shipper_id)
        .fetch_optional(self.conn()?)
        .await?,
    )
  }

  async fn insert_shipper(&mut self, shipper: &ShipperAvailability) -> Result<(), StoreError> {
    let sql = format!("INSERT INTO shipper_availability ({SHIPPER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)");
    sqlx::query(&sql)
      .bind(&shipper.shipper_id)
      .bind(shipper.start_shift)
      .bind(shipper.end_shift)
      .bind(shipper.status)
      .bind(&shipper.current_order)
      .bind(shipper.assigned_at)
      .execute(self.conn()?)
      .await?;
    Ok(())
  }

  async fn swap_shipper(
    &mut self,
    next: &ShipperAvailability,
    expected_status: ShipperStatus,
    expected_order: Option<&str>,
  ) -> Result<bool, StoreError> {
    let result = sqlx::query(
      "UPDATE shipper_availability SET start_shift = $2, end_shift = $3, status = $4, current_order = $5, \
       assigned_at = $6 WHERE shipper_id = $1 AND status = $7 AND current_order IS NOT DISTINCT FROM $8",
    )
    .bind(&next.shipper_id)
    .bind(next.start_shift)
    .bind(next.end_shift)
    .bind(next.status)
    .bind(&next.current_order)
    .bind(next.assigned_at)
    .bind(expected_status)
    .bind(expected_order)
    .execute(self.conn()?)
    .await?;
    Ok(result.rows_affected() == 1)
  }

  async fn shippers_holding(&mut self, order_id: &str) -> Result<Vec<ShipperAvailability>, StoreError> {
    let sql = format!("SELECT {SHIPPER_COLUMNS} FROM shipper_availability WHERE current_order = $1");
    Ok(
      sqlx::query_as::<_, ShipperAvailability>(&sql)
        .bind(order_id)
        .fetch_all(self.conn()?)
        .await?,
    )
  }

  async fn stale_assignments(&mut self, cutoff: DateTime<Utc>) -> Result<Vec<ShipperAvailability>, StoreError> {
    let sql = format!(
      "SELECT {SHIPPER_COLUMNS} FROM shipper_availability WHERE status = 'ASSIGN' AND assigned_at <= $1 \
       ORDER BY assigned_at"
    );
    Ok(
      sqlx::query_as::<_, ShipperAvailability>(&sql)
        .bind(cutoff)
        .fetch_all(self.conn()?)
        .await?,
    )
  }

  async fn list_shippers(
    &mut self,
    status: Option<ShipperStatus>,
    page: PageRequest,
  ) -> Result<Page<ShipperAvailability>, StoreError> {
    let total: i64 =
      sqlx::query_scalar("SELECT COUNT(*) FROM shipper_availability WHERE ($1::shipper_status IS NULL OR status = $1)")
        .bind(status)
        .fetch_one(self.conn()?)
        .await?;
    let sql = format!(
      "SELECT {SHIPPER_COLUMNS} FROM shipper_availability WHERE ($1::shipper_status IS NULL OR status = $1) \
       ORDER BY shipper_id LIMIT $2 OFFSET $3"
    );
    let items = sqlx::query_as::<_, ShipperAvailability>(&sql)
      .bind(status)
      .bind(i64::from(page.size))
      .bind(page.offset() as i64)
      .fetch_all(self.conn()?)
      .await?;
    Ok(Page {
      items,
      total: total as u64,
    })
  }

  async fn coupon(&mut self, coupon_id: &str) -> Result<Option<Coupon>, StoreError> {
    Ok(
      sqlx::query_as::<_, Coupon>(
        "SELECT id, expire_date, sale_percent, usage_amount, usage_left, minimum_price FROM coupons \
         WHERE id = $1 FOR UPDATE",
      )
      .bind(coupon_id)
      .fetch_optional(self.conn()?)
      .await?,
    )
  }

  async fn save_coupon(&mut self, coupon: &Coupon) -> Result<(), StoreError> {
    sqlx::query(
      "INSERT INTO coupons (id, expire_date, sale_percent, usage_amount, usage_left, minimum_price) \
       VALUES ($1, $2, $3, $4, $5, $6) \
       ON CONFLICT (id) DO UPDATE SET expire_date = EXCLUDED.expire_date, sale_percent = EXCLUDED.sale_percent, \
       usage_amount = EXCLUDED.usage_amount, usage_left = EXCLUDED.usage_left, minimum_price = EXCLUDED.minimum_price",
    )
    .bind(&coupon.id)
    .bind(coupon.expire_date)
    .bind(coupon.sale_percent)
    .bind(coupon.usage_amount)
    .bind(coupon.usage_left)
    .bind(coupon.minimum_price)
    .execute(self.conn()?)
    .await?;
    Ok(())
  }

  async fn commit(&mut self) -> Result<(), StoreError> {
    let tx = self.tx.take().ok_or(StoreError::Finished)?;
    tx.commit().await?;
    debug!("Postgres transaction committed.");
    Ok(())
  }
}
