// pantry_admin/src/web/handlers/mod.rs

pub mod coupon_handlers;
pub mod inventory_handlers;
pub mod order_handlers;
pub mod shipment_handlers;

use pantry::PageRequest;

/// Builds a page request from optional `?page=&size=` query parameters.
pub fn page_request(page: Option<u32>, size: Option<u32>) -> PageRequest {
  let default = PageRequest::default();
  PageRequest::new(page.unwrap_or(default.index), size.unwrap_or(default.size))
}
