// pantry/src/inventory.rs

//! Stock and price ledger of the catalogue.
//!
//! Order acceptance and cancellation move stock through the lifecycle
//! workflows; the operations here are the staff-facing ones.

use crate::collaborators::Collaborators;
use crate::error::{PantryError, PantryResult};
use crate::models::{Product, ProductPriceHistory, ProductStatus, ProductStockHistory};
use crate::services::Clock;
use crate::store::{Store, StoreTx};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct Inventory {
  store: Arc<dyn Store>,
  clock: Arc<dyn Clock>,
}

async fn load_product(tx: &mut dyn StoreTx, product_id: &str) -> PantryResult<Product> {
  tx.product(product_id)
    .await?
    .ok_or_else(|| PantryError::not_found("product", product_id))
}

fn validate_price(price: Decimal, sale_percent: i32) -> PantryResult<()> {
  if price <= Decimal::ZERO {
    return Err(PantryError::InvalidPrice);
  }
  if sale_percent < 0 {
    return Err(PantryError::InvalidSalePercent { sale_percent });
  }
  Ok(())
}

impl Inventory {
  pub fn new(deps: &Collaborators) -> Self {
    Self {
      store: Arc::clone(&deps.store),
      clock: Arc::clone(&deps.clock),
    }
  }

  /// Adds a product to the catalogue with no stock and its first price entry.
  #[instrument(name = "Inventory::register_product", skip(self), err(Display))]
  pub async fn register_product(
    &self,
    product_id: &str,
    name: &str,
    price: Decimal,
    sale_percent: i32,
  ) -> PantryResult<Product> {
    validate_price(price, sale_percent)?;
    let product = Product {
      id: product_id.to_string(),
      name: name.to_string(),
      available_quantity: 0,
      status: ProductStatus::OutOfStock,
      price,
      sale_percent,
    };

    let mut tx = self.store.begin().await?;
    if tx.product(product_id).await?.is_some() {
      warn!(product_id, "Product id already taken.");
      return Err(PantryError::AlreadyExists {
        entity: "product",
        id: product_id.to_string(),
      });
    }
    tx.save_product(&product).await?;
    tx.insert_price_history(&ProductPriceHistory {
      product_id: product.id.clone(),
      date: self.clock.now(),
      price,
      sale_percent,
    })
    .await?;
    tx.commit().await?;
    info!(product_id, "Product registered.");
    Ok(product)
  }

  /// Sets the available quantity to `amount` and logs the delivery.
  ///
  /// The quantity is replaced, not increased.
  #[instrument(name = "Inventory::restock", skip(self), err(Display))]
  pub async fn restock(&self, product_id: &str, amount: i32, import_price: Decimal) -> PantryResult<Product> {
    if amount <= 0 {
      return Err(PantryError::InvalidAmount { amount });
    }
    if import_price <= Decimal::ZERO {
      return Err(PantryError::InvalidPrice);
    }

    let mut tx = self.store.begin().await?;
    let mut product = load_product(tx.as_mut(), product_id).await?;
    product.available_quantity = amount;
    product.status = ProductStatus::InStock;
    tx.save_product(&product).await?;
    tx.insert_stock_history(&ProductStockHistory {
      product_id: product.id.clone(),
      date: self.clock.now(),
      in_price: import_price,
      in_stock: amount,
    })
    .await?;
    tx.commit().await?;

    info!(product_id, amount, %import_price, "Product restocked.");
    Ok(product)
  }

  #[instrument(name = "Inventory::update_price", skip(self), err(Display))]
  pub async fn update_price(&self, product_id: &str, price: Decimal, sale_percent: i32) -> PantryResult<Product> {
    validate_price(price, sale_percent)?;

    let mut tx = self.store.begin().await?;
    let mut product = load_product(tx.as_mut(), product_id).await?;
    tx.insert_price_history(&ProductPriceHistory {
      product_id: product.id.clone(),
      date: self.clock.now(),
      price,
      sale_percent,
    })
    .await?;
    product.price = price;
    product.sale_percent = sale_percent;
    tx.save_product(&product).await?;
    tx.commit().await?;

    info!(product_id, %price, sale_percent, "Product price updated.");
    Ok(product)
  }

  #[instrument(name = "Inventory::update_status", skip(self), err(Display))]
  pub async fn update_status(&self, product_id: &str, status: ProductStatus) -> PantryResult<Product> {
    let mut tx = self.store.begin().await?;
    let mut product = load_product(tx.as_mut(), product_id).await?;
    if status == ProductStatus::InStock && product.available_quantity == 0 {
      warn!(product_id, "Cannot mark an empty product in stock.");
      return Err(PantryError::QuantityEmpty {
        product_id: product_id.to_string(),
      });
    }
    product.status = status;
    tx.save_product(&product).await?;
    tx.commit().await?;
    info!(product_id, ?status, "Product status updated.");
    Ok(product)
  }

  pub async fn product(&self, product_id: &str) -> PantryResult<Product> {
    let mut tx = self.store.begin().await?;
    load_product(tx.as_mut(), product_id).await
  }

  pub async fn price_history(&self, product_id: &str) -> PantryResult<Vec<ProductPriceHistory>> {
    let mut tx = self.store.begin().await?;
    load_product(tx.as_mut(), product_id).await?;
    Ok(tx.price_history(product_id).await?)
  }

  pub async fn stock_history(&self, product_id: &str) -> PantryResult<Vec<ProductStockHistory>> {
    let mut tx = self.store.begin().await?;
    load_product(tx.as_mut(), product_id).await?;
    Ok(tx.stock_history(product_id).await?)
  }
}

impl std::fmt::Debug for Inventory {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Inventory").finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn price_validation_rejects_non_positive_price_and_negative_sale() {
    assert!(matches!(validate_price(Decimal::ZERO, 0), Err(PantryError::InvalidPrice)));
    assert!(matches!(
      validate_price(Decimal::new(1000, 2), -5),
      Err(PantryError::InvalidSalePercent { sale_percent: -5 })
    ));
    assert!(validate_price(Decimal::new(1000, 2), 0).is_ok());
  }
}
