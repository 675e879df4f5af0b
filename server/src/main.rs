// pantry_admin/src/main.rs

mod config;
mod errors;
mod services;
mod state;
mod web;

use crate::config::AppConfig;
use crate::services::{MockEmailNotifier, MockPaymentGateway};
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use pantry::services::{Clock, NotificationDispatcher, SystemClock};
use pantry::{Collaborators, Pantry, PgStore};
use sqlx::PgPool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // Allow RUST_LOG override
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting pantry admin server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };
  errors::expose_internal_detail(!app_config.is_production());

  let db_pool = match PgPool::connect(&app_config.database_url).await {
    Ok(pool) => {
      tracing::info!("Successfully connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(app_config.store_timezone));
  let deps = Collaborators {
    store: Arc::new(PgStore::new(db_pool)),
    gateway: Arc::new(MockPaymentGateway::new(&app_config.mock_payment_account)),
    notifications: NotificationDispatcher::new(Arc::new(MockEmailNotifier::new(&app_config.mock_email_sender))),
    clock: clock.clone(),
    settings: app_config.core_settings(),
  };
  let pantry = Arc::new(Pantry::new(deps));

  // Offers whose timer did not survive a restart are withdrawn by this sweep.
  let shutdown = CancellationToken::new();
  let reconciler = tokio::spawn({
    let pantry = pantry.clone();
    let shutdown = shutdown.clone();
    async move { pantry.shipments.run_reconciliation(shutdown).await }
  });

  let app_state = AppState {
    pantry,
    clock,
    config: app_config.clone(),
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  let result = HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await;

  shutdown.cancel();
  if let Err(e) = reconciler.await {
    tracing::error!(error = %e, "Reconciliation task ended abnormally.");
  }
  tracing::info!("Server stopped.");
  result
}
