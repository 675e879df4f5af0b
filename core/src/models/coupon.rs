// pantry/src/models/coupon.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// `usage_left == -1` marks a disabled coupon.
pub const DISABLED_USAGE: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Coupon {
  pub id: String,
  pub expire_date: NaiveDate,
  pub sale_percent: i32,
  pub usage_amount: i32,
  pub usage_left: i32,
  pub minimum_price: Decimal,
}

impl Coupon {
  /// Only `-1` is ever written, but any negative count is treated as disabled.
  pub fn is_disabled(&self) -> bool {
    self.usage_left <= DISABLED_USAGE
  }

  pub fn discount_for(&self, order_total: Decimal) -> Decimal {
    (order_total * Decimal::from(self.sale_percent) / Decimal::ONE_HUNDRED).round_dp(2)
  }
}
