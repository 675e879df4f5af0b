// pantry/src/models/mod.rs

//! Entities of the order lifecycle, mapped 1:1 onto store rows.

pub mod coupon;
pub mod order;
pub mod order_process;
pub mod product;
pub mod shipper;

pub use coupon::Coupon;
pub use order::{Order, OrderLineItem, OrderStatus, PaymentMethod, PaymentStatus, PaymentTransaction};
pub use order_process::{OrderProcess, ShipmentStatus};
pub use product::{Product, ProductPriceHistory, ProductStatus, ProductStockHistory};
pub use shipper::{ShipperAvailability, ShipperStatus};
