// pantry_admin/src/web/handlers/order_handlers.rs

use super::page_request;
use crate::errors::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use pantry::models::OrderStatus;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
  pub status: Option<OrderStatus>,
  pub page: Option<u32>,
  pub size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptOrderRequest {
  pub staff_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
  pub expected: OrderStatus,
  pub target: OrderStatus,
  #[serde(default = "default_check_payment")]
  pub check_payment: bool,
}

fn default_check_payment() -> bool {
  true
}

pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  let page = app_state
    .pantry
    .orders
    .list_orders(query.status, page_request(query.page, query.size))
    .await?;
  Ok(HttpResponse::Ok().json(page))
}

pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let (order, items) = app_state.pantry.orders.order(&path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "order": order, "items": items })))
}

pub async fn accept_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  req_body: web::Json<AcceptOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  if req_body.staff_id.trim().is_empty() {
    return Err(AppError::Validation("staff_id is required".to_string()));
  }
  let order = app_state.pantry.orders.accept_order(&order_id, &req_body.staff_id).await?;
  info!(%order_id, "Order accepted via API.");
  Ok(HttpResponse::Ok().json(order))
}

pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.pantry.orders.cancel_order(&path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(order))
}

pub async fn transition_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  req_body: web::Json<TransitionRequest>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let applied = app_state
    .pantry
    .orders
    .transition(&order_id, req_body.expected, req_body.target, req_body.check_payment)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "order_id": order_id, "applied": applied })))
}

pub async fn confirm_delivery_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.pantry.orders.confirm_delivery(&path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(order))
}
