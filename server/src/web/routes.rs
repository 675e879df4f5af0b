// pantry_admin/src/web/routes.rs

use crate::state::AppState;
use crate::web::handlers::{coupon_handlers, inventory_handlers, order_handlers, shipment_handlers};
use actix_web::web;

async fn health_check_handler(app_state: web::Data<AppState>) -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({
    "status": "ok",
    "env": app_state.config.app_env,
    "armed_assignment_timers": app_state.pantry.shipments.timers().armed_count(),
  }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      // Order state machine
      .service(
        web::scope("/orders")
          .route("", web::get().to(order_handlers::list_orders_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
          .route("/{order_id}/accept", web::post().to(order_handlers::accept_order_handler))
          .route("/{order_id}/cancel", web::post().to(order_handlers::cancel_order_handler))
          .route(
            "/{order_id}/transition",
            web::post().to(order_handlers::transition_order_handler),
          )
          .route("/{order_id}/deliver", web::post().to(order_handlers::confirm_delivery_handler)),
      )
      // Shipment coordination, keyed by order
      .service(
        web::scope("/shipments")
          .route("/{order_id}", web::get().to(shipment_handlers::get_shipment_handler))
          .route("/{order_id}/assign", web::post().to(shipment_handlers::assign_shipper_handler))
          .route("/{order_id}/accept", web::post().to(shipment_handlers::accept_shipment_handler))
          .route("/{order_id}/reject", web::post().to(shipment_handlers::reject_shipment_handler))
          .route("/{order_id}/start", web::post().to(shipment_handlers::start_shipping_handler))
          .route(
            "/{order_id}/complete",
            web::post().to(shipment_handlers::complete_shipment_handler),
          ),
      )
      .service(
        web::scope("/shippers")
          .route("", web::get().to(shipment_handlers::list_shippers_handler))
          .route("", web::post().to(shipment_handlers::register_shipper_handler))
          .route("/{shipper_id}", web::get().to(shipment_handlers::get_shipper_handler))
          .route("/{shipper_id}/shift", web::put().to(shipment_handlers::set_shift_handler)),
      )
      // Inventory ledger
      .service(
        web::scope("/products")
          .route("", web::post().to(inventory_handlers::register_product_handler))
          .route("/{product_id}", web::get().to(inventory_handlers::get_product_handler))
          .route("/{product_id}/restock", web::post().to(inventory_handlers::restock_handler))
          .route("/{product_id}/price", web::put().to(inventory_handlers::update_price_handler))
          .route("/{product_id}/status", web::put().to(inventory_handlers::update_status_handler))
          .route(
            "/{product_id}/price-history",
            web::get().to(inventory_handlers::price_history_handler),
          )
          .route(
            "/{product_id}/stock-history",
            web::get().to(inventory_handlers::stock_history_handler),
          ),
      )
      .service(
        web::scope("/coupons")
          .route("", web::post().to(coupon_handlers::save_coupon_handler))
          .route("/{coupon_id}", web::get().to(coupon_handlers::get_coupon_handler))
          .route("/{coupon_id}/redeem", web::post().to(coupon_handlers::redeem_coupon_handler))
          .route("/{coupon_id}/disable", web::post().to(coupon_handlers::disable_coupon_handler)),
      ),
  );
}
