// pantry_admin/src/web/handlers/coupon_handlers.rs

use crate::errors::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use pantry::models::Coupon;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
  pub order_total: Decimal,
}

pub async fn save_coupon_handler(
  app_state: web::Data<AppState>,
  req_body: web::Json<Coupon>,
) -> Result<HttpResponse, AppError> {
  let coupon = req_body.into_inner();
  if !(0..=100).contains(&coupon.sale_percent) {
    return Err(AppError::Validation("sale_percent must be between 0 and 100".to_string()));
  }
  app_state.pantry.coupons.save_coupon(&coupon).await?;
  Ok(HttpResponse::Created().json(coupon))
}

pub async fn get_coupon_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let coupon = app_state.pantry.coupons.coupon(&path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(coupon))
}

pub async fn redeem_coupon_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  req_body: web::Json<RedeemRequest>,
) -> Result<HttpResponse, AppError> {
  let coupon_id = path.into_inner();
  let discount = app_state
    .pantry
    .coupons
    .redeem_coupon(&coupon_id, req_body.order_total, app_state.clock.today())
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "coupon_id": coupon_id, "discount": discount })))
}

pub async fn disable_coupon_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let coupon = app_state.pantry.coupons.disable_coupon(&path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(coupon))
}
