// pantry_admin/src/config.rs

use crate::errors::{AppError, Result};
use chrono_tz::Tz;
use dotenvy::dotenv;
use pantry::Settings;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  /// `production` hides internal error details from responses.
  pub app_env: String,
  pub store_timezone: Tz,

  pub assignment_timeout_secs: u64,
  pub sweep_interval_secs: u64,

  // Mock collaborator config
  pub mock_email_sender: String,
  pub mock_payment_account: String,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };
    let get_secs = |var_name: &str, default: u64| -> Result<u64> {
      match env::var(var_name) {
        Ok(raw) => raw
          .parse::<u64>()
          .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e))),
        Err(_) => Ok(default),
      }
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;
    let app_env = get_env("APP_ENV").unwrap_or_else(|_| "development".to_string());
    let store_timezone = get_env("STORE_TIMEZONE")
      .unwrap_or_else(|_| "Asia/Ho_Chi_Minh".to_string())
      .parse::<Tz>()
      .map_err(|e| AppError::Config(format!("Invalid STORE_TIMEZONE: {}", e)))?;

    let assignment_timeout_secs = get_secs("ASSIGNMENT_TIMEOUT_SECS", 900)?;
    let sweep_interval_secs = get_secs("SWEEP_INTERVAL_SECS", 60)?;
    if sweep_interval_secs == 0 {
      return Err(AppError::Config("SWEEP_INTERVAL_SECS must be positive".to_string()));
    }

    let mock_email_sender = get_env("MOCK_EMAIL_SENDER").unwrap_or_else(|_| "noreply@pantry.example".to_string());
    let mock_payment_account = get_env("MOCK_PAYMENT_ACCOUNT").unwrap_or_else(|_| "mock_main_acct".to_string());

    tracing::info!(%app_env, timezone = %store_timezone, "Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_env,
      store_timezone,
      assignment_timeout_secs,
      sweep_interval_secs,
      mock_email_sender,
      mock_payment_account,
    })
  }

  pub fn is_production(&self) -> bool {
    self.app_env.eq_ignore_ascii_case("production")
  }

  /// Lifecycle tunables; shift bounds keep their defaults.
  pub fn core_settings(&self) -> Settings {
    Settings {
      assignment_timeout: Duration::from_secs(self.assignment_timeout_secs),
      sweep_interval: Duration::from_secs(self.sweep_interval_secs),
      ..Settings::default()
    }
  }
}
