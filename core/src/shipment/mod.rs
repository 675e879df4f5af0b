// pantry/src/shipment/mod.rs

//! Shipment assignment: offering processed orders to shippers, the
//! acceptance timeout, and the reconciliation sweep behind it.

pub mod assign;
pub mod coordinator;
mod sweep;
pub mod timers;

pub use coordinator::ShipmentCoordinator;
pub use timers::AssignmentTimers;
