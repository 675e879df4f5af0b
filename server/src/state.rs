// pantry_admin/src/state.rs
use crate::config::AppConfig;
use pantry::services::Clock;
use pantry::Pantry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub pantry: Arc<Pantry>,
  pub clock: Arc<dyn Clock>,
  pub config: Arc<AppConfig>, // Share loaded config
}
