// pantry/src/lib.rs

//! Pantry: the order lifecycle core of a grocery and meal-kit admin backend.
//!
//! It covers
//!  - the order state machine (accept, cancel, generic transitions, delivery),
//!  - the inventory ledger (restock, price and status changes),
//!  - the shipment assignment coordinator with its acceptance timeout,
//!  - coupon redemption.
//!
//! Multi-step operations run as [`workflow::Workflow`]s over one store
//! transaction each. Payment refunds, notifications and the clock are reached
//! through the traits in [`services`]; persistence through [`store::Store`].

pub mod collaborators;
pub mod coupons;
pub mod error;
pub mod inventory;
pub mod lifecycle;
pub mod models;
pub mod services;
pub mod settings;
pub mod shipment;
pub mod store;
pub mod workflow;

pub use crate::collaborators::Collaborators;
pub use crate::coupons::Coupons;
pub use crate::error::{ErrorKind, PantryError, PantryResult};
pub use crate::inventory::Inventory;
pub use crate::lifecycle::OrderLifecycle;
pub use crate::settings::Settings;
pub use crate::shipment::{AssignmentTimers, ShipmentCoordinator};
pub use crate::store::{MemoryStore, Page, PageRequest, PgStore, Store, StoreError, StoreTx};
pub use crate::workflow::{SharedContext, StageControl, Workflow, WorkflowError, WorkflowOutcome};

/// All lifecycle services over one set of collaborators.
#[derive(Debug)]
pub struct Pantry {
  pub orders: OrderLifecycle,
  pub inventory: Inventory,
  pub coupons: Coupons,
  pub shipments: ShipmentCoordinator,
}

impl Pantry {
  pub fn new(deps: Collaborators) -> Self {
    let timers = AssignmentTimers::new();
    Self {
      inventory: Inventory::new(&deps),
      coupons: Coupons::new(&deps),
      shipments: ShipmentCoordinator::new(deps.clone(), timers.clone()),
      orders: OrderLifecycle::new(deps, timers),
    }
  }
}
