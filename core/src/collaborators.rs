// pantry/src/collaborators.rs

use crate::services::{Clock, NotificationDispatcher, PaymentGateway};
use crate::settings::Settings;
use crate::store::Store;
use std::sync::Arc;

/// Everything a lifecycle service reaches outside its own logic.
#[derive(Clone)]
pub struct Collaborators {
  pub store: Arc<dyn Store>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub notifications: NotificationDispatcher,
  pub clock: Arc<dyn Clock>,
  pub settings: Settings,
}

impl std::fmt::Debug for Collaborators {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Collaborators")
      .field("clock", &self.clock)
      .field("settings", &self.settings)
      .finish_non_exhaustive()
  }
}
