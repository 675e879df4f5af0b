// pantry_admin/src/web/handlers/shipment_handlers.rs

use super::page_request;
use crate::errors::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use chrono::NaiveTime;
use pantry::models::ShipperStatus;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ShipperRequest {
  pub shipper_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ShiftRequest {
  pub start: NaiveTime,
  pub end: NaiveTime,
}

#[derive(Debug, Deserialize)]
pub struct ListShippersQuery {
  pub status: Option<ShipperStatus>,
  pub page: Option<u32>,
  pub size: Option<u32>,
}

fn shipper_id(req_body: &ShipperRequest) -> Result<&str, AppError> {
  let id = req_body.shipper_id.trim();
  if id.is_empty() {
    return Err(AppError::Validation("shipper_id is required".to_string()));
  }
  Ok(id)
}

pub async fn assign_shipper_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  req_body: web::Json<ShipperRequest>,
) -> Result<HttpResponse, AppError> {
  let shipper = app_state
    .pantry
    .shipments
    .assign_shipper(&path.into_inner(), shipper_id(&req_body)?)
    .await?;
  Ok(HttpResponse::Ok().json(shipper))
}

pub async fn accept_shipment_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  req_body: web::Json<ShipperRequest>,
) -> Result<HttpResponse, AppError> {
  let shipper = app_state
    .pantry
    .shipments
    .accept_shipment(&path.into_inner(), shipper_id(&req_body)?)
    .await?;
  Ok(HttpResponse::Ok().json(shipper))
}

pub async fn reject_shipment_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  req_body: web::Json<ShipperRequest>,
) -> Result<HttpResponse, AppError> {
  let shipper = app_state
    .pantry
    .shipments
    .reject_shipment(&path.into_inner(), shipper_id(&req_body)?)
    .await?;
  Ok(HttpResponse::Ok().json(shipper))
}

pub async fn start_shipping_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  req_body: web::Json<ShipperRequest>,
) -> Result<HttpResponse, AppError> {
  let process = app_state
    .pantry
    .shipments
    .start_shipping(&path.into_inner(), shipper_id(&req_body)?)
    .await?;
  Ok(HttpResponse::Ok().json(process))
}

pub async fn complete_shipment_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  req_body: web::Json<ShipperRequest>,
) -> Result<HttpResponse, AppError> {
  let process = app_state
    .pantry
    .shipments
    .complete_shipment(&path.into_inner(), shipper_id(&req_body)?)
    .await?;
  Ok(HttpResponse::Ok().json(process))
}

pub async fn get_shipment_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let process = app_state.pantry.shipments.order_process(&path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(process))
}

pub async fn register_shipper_handler(
  app_state: web::Data<AppState>,
  req_body: web::Json<ShipperRequest>,
) -> Result<HttpResponse, AppError> {
  let shipper = app_state
    .pantry
    .shipments
    .register_shipper(shipper_id(&req_body)?)
    .await?;
  Ok(HttpResponse::Created().json(shipper))
}

pub async fn list_shippers_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListShippersQuery>,
) -> Result<HttpResponse, AppError> {
  let page = app_state
    .pantry
    .shipments
    .list_shippers(query.status, page_request(query.page, query.size))
    .await?;
  Ok(HttpResponse::Ok().json(page))
}

pub async fn get_shipper_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let shipper = app_state.pantry.shipments.shipper(&path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(shipper))
}

pub async fn set_shift_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  req_body: web::Json<ShiftRequest>,
) -> Result<HttpResponse, AppError> {
  let shipper = app_state
    .pantry
    .shipments
    .set_shift_time(&path.into_inner(), req_body.start, req_body.end)
    .await?;
  Ok(HttpResponse::Ok().json(shipper))
}
