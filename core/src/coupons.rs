// pantry/src/coupons.rs

use crate::collaborators::Collaborators;
use crate::error::{PantryError, PantryResult};
use crate::models::coupon::DISABLED_USAGE;
use crate::models::Coupon;
use crate::store::{Store, StoreTx};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct Coupons {
  store: Arc<dyn Store>,
}

async fn load_coupon(tx: &mut dyn StoreTx, coupon_id: &str) -> PantryResult<Coupon> {
  tx.coupon(coupon_id)
    .await?
    .ok_or_else(|| PantryError::not_found("coupon", coupon_id))
}

/// `usage_left` stays within `-1..=usage_amount`.
fn validate_usage(coupon: &Coupon) -> PantryResult<()> {
  if coupon.usage_amount < 0 || coupon.usage_left < DISABLED_USAGE || coupon.usage_left > coupon.usage_amount {
    return Err(PantryError::InvalidCouponUsage {
      usage_left: coupon.usage_left,
      usage_amount: coupon.usage_amount,
    });
  }
  Ok(())
}

/// Checks that `coupon` can be applied to an order of `order_total` on `today`.
fn check_redeemable(coupon: &Coupon, order_total: Decimal, today: NaiveDate) -> PantryResult<()> {
  let coupon_id = || coupon.id.clone();
  if today > coupon.expire_date {
    return Err(PantryError::CouponExpired { coupon_id: coupon_id() });
  }
  if coupon.is_disabled() {
    return Err(PantryError::CouponDisabled { coupon_id: coupon_id() });
  }
  if coupon.usage_left == 0 {
    return Err(PantryError::CouponExhausted { coupon_id: coupon_id() });
  }
  if order_total < coupon.minimum_price {
    return Err(PantryError::CouponMinimumNotMet {
      coupon_id: coupon_id(),
      minimum: coupon.minimum_price,
    });
  }
  Ok(())
}

impl Coupons {
  pub fn new(deps: &Collaborators) -> Self {
    Self {
      store: Arc::clone(&deps.store),
    }
  }

  /// Uses up one redemption and returns the discount on `order_total`.
  #[instrument(name = "Coupons::redeem_coupon", skip(self), err(Display))]
  pub async fn redeem_coupon(&self, coupon_id: &str, order_total: Decimal, today: NaiveDate) -> PantryResult<Decimal> {
    let mut tx = self.store.begin().await?;
    let mut coupon = load_coupon(tx.as_mut(), coupon_id).await?;
    if let Err(e) = check_redeemable(&coupon, order_total, today) {
      warn!(coupon_id, error = %e, "Coupon refused.");
      return Err(e);
    }
    coupon.usage_left -= 1;
    tx.save_coupon(&coupon).await?;
    tx.commit().await?;

    let discount = coupon.discount_for(order_total);
    info!(coupon_id, %discount, usage_left = coupon.usage_left, "Coupon redeemed.");
    Ok(discount)
  }

  #[instrument(name = "Coupons::disable_coupon", skip(self), err(Display))]
  pub async fn disable_coupon(&self, coupon_id: &str) -> PantryResult<Coupon> {
    let mut tx = self.store.begin().await?;
    let mut coupon = load_coupon(tx.as_mut(), coupon_id).await?;
    coupon.usage_left = DISABLED_USAGE;
    tx.save_coupon(&coupon).await?;
    tx.commit().await?;
    info!(coupon_id, "Coupon disabled.");
    Ok(coupon)
  }

  #[instrument(name = "Coupons::save_coupon", skip(self, coupon), fields(coupon_id = %coupon.id), err(Display))]
  pub async fn save_coupon(&self, coupon: &Coupon) -> PantryResult<()> {
    validate_usage(coupon)?;
    let mut tx = self.store.begin().await?;
    tx.save_coupon(coupon).await?;
    tx.commit().await?;
    Ok(())
  }

  pub async fn coupon(&self, coupon_id: &str) -> PantryResult<Coupon> {
    let mut tx = self.store.begin().await?;
    load_coupon(tx.as_mut(), coupon_id).await
  }
}

impl std::fmt::Debug for Coupons {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Coupons").finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn coupon(usage_left: i32) -> Coupon {
    Coupon {
      id: "SPRING10".into(),
      expire_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
      sale_percent: 10,
      usage_amount: 100,
      usage_left,
      minimum_price: Decimal::new(50_000, 0),
    }
  }

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
  }

  #[test]
  fn refusal_reasons_are_checked_in_order() {
    let total = Decimal::new(80_000, 0);
    assert!(check_redeemable(&coupon(5), total, day(30)).is_ok());
    assert!(matches!(
      check_redeemable(&coupon(DISABLED_USAGE), total, day(1)),
      Err(PantryError::CouponDisabled { .. })
    ));
    assert!(matches!(check_redeemable(&coupon(0), total, day(1)), Err(PantryError::CouponExhausted { .. })));
    assert!(matches!(
      check_redeemable(&coupon(5), Decimal::new(10_000, 0), day(1)),
      Err(PantryError::CouponMinimumNotMet { .. })
    ));
    assert!(matches!(check_redeemable(&coupon(-7), total, day(1)), Err(PantryError::CouponDisabled { .. })));
    let expired_on = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
    assert!(matches!(
      check_redeemable(&coupon(0), total, expired_on),
      Err(PantryError::CouponExpired { .. })
    ));
  }

  #[test]
  fn usage_left_must_stay_between_disabled_and_the_usage_amount() {
    assert!(validate_usage(&coupon(100)).is_ok());
    assert!(validate_usage(&coupon(0)).is_ok());
    assert!(validate_usage(&coupon(DISABLED_USAGE)).is_ok());
    assert!(matches!(
      validate_usage(&coupon(-7)),
      Err(PantryError::InvalidCouponUsage { usage_left: -7, .. })
    ));
    assert!(validate_usage(&coupon(101)).is_err());
    let mut negative_amount = coupon(0);
    negative_amount.usage_amount = -1;
    assert!(validate_usage(&negative_amount).is_err());
  }
}
