// pantry/src/models/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "product_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
  InStock,
  OutOfStock,
  NoLongerInSale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Product {
  /// Human-meaningful slug, e.g. `organic-kale-250g`.
  pub id: String,
  pub name: String,
  pub available_quantity: i32,
  pub status: ProductStatus,
  pub price: Decimal,
  pub sale_percent: i32,
}

impl Product {
  /// Removes `quantity` units. The caller has checked availability.
  pub(crate) fn debit(&mut self, quantity: i32) {
    self.available_quantity -= quantity;
    if self.available_quantity == 0 {
      self.status = ProductStatus::OutOfStock;
    }
  }

  /// Returns `quantity` units, flipping an out-of-stock product back in stock.
  pub(crate) fn credit(&mut self, quantity: i32) {
    self.available_quantity += quantity;
    if self.available_quantity > 0 && self.status == ProductStatus::OutOfStock {
      self.status = ProductStatus::InStock;
    }
  }
}

/// Immutable price log; order line items point at one of these rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ProductPriceHistory {
  pub product_id: String,
  pub date: DateTime<Utc>,
  pub price: Decimal,
  pub sale_percent: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ProductStockHistory {
  pub product_id: String,
  pub date: DateTime<Utc>,
  pub in_price: Decimal,
  pub in_stock: i32,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn product(quantity: i32) -> Product {
    Product {
      id: "carrot-1kg".to_string(),
      name: "Carrot 1kg".to_string(),
      available_quantity: quantity,
      status: if quantity == 0 { ProductStatus::OutOfStock } else { ProductStatus::InStock },
      price: Decimal::new(25_000, 0),
      sale_percent: 0,
    }
  }

  #[test]
  fn debit_to_zero_marks_out_of_stock() {
    let mut p = product(3);
    p.debit(3);
    assert_eq!(p.available_quantity, 0);
    assert_eq!(p.status, ProductStatus::OutOfStock);
  }

  #[test]
  fn credit_restores_in_stock() {
    let mut p = product(0);
    p.credit(2);
    assert_eq!(p.available_quantity, 2);
    assert_eq!(p.status, ProductStatus::InStock);
  }

  #[test]
  fn credit_keeps_discontinued_status() {
    let mut p = product(0);
    p.status = ProductStatus::NoLongerInSale;
    p.credit(5);
    assert_eq!(p.status, ProductStatus::NoLongerInSale);
  }
}
