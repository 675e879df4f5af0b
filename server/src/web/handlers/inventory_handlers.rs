// pantry_admin/src/web/handlers/inventory_handlers.rs

use crate::errors::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use pantry::models::ProductStatus;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RegisterProductRequest {
  pub id: String,
  pub name: String,
  pub price: Decimal,
  #[serde(default)]
  pub sale_percent: i32,
}

#[derive(Debug, Deserialize)]
pub struct RestockRequest {
  pub amount: i32,
  pub import_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePriceRequest {
  pub price: Decimal,
  #[serde(default)]
  pub sale_percent: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
  pub status: ProductStatus,
}

pub async fn register_product_handler(
  app_state: web::Data<AppState>,
  req_body: web::Json<RegisterProductRequest>,
) -> Result<HttpResponse, AppError> {
  if req_body.id.trim().is_empty() || req_body.name.trim().is_empty() {
    return Err(AppError::Validation("product id and name are required".to_string()));
  }
  let product = app_state
    .pantry
    .inventory
    .register_product(&req_body.id, &req_body.name, req_body.price, req_body.sale_percent)
    .await?;
  Ok(HttpResponse::Created().json(product))
}

pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let product = app_state.pantry.inventory.product(&path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(product))
}

pub async fn restock_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  req_body: web::Json<RestockRequest>,
) -> Result<HttpResponse, AppError> {
  let product = app_state
    .pantry
    .inventory
    .restock(&path.into_inner(), req_body.amount, req_body.import_price)
    .await?;
  Ok(HttpResponse::Ok().json(product))
}

pub async fn update_price_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  req_body: web::Json<UpdatePriceRequest>,
) -> Result<HttpResponse, AppError> {
  let product = app_state
    .pantry
    .inventory
    .update_price(&path.into_inner(), req_body.price, req_body.sale_percent)
    .await?;
  Ok(HttpResponse::Ok().json(product))
}

pub async fn update_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  req_body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
  let product = app_state
    .pantry
    .inventory
    .update_status(&path.into_inner(), req_body.status)
    .await?;
  Ok(HttpResponse::Ok().json(product))
}

pub async fn price_history_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let history = app_state.pantry.inventory.price_history(&path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(history))
}

pub async fn stock_history_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let history = app_state.pantry.inventory.stock_history(&path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(history))
}
