// pantry_admin/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use once_cell::sync::OnceCell;
use pantry::{ErrorKind, PantryError};
use serde_json::json;
use thiserror::Error;

static EXPOSE_DETAIL: OnceCell<bool> = OnceCell::new();

/// Whether 500 responses carry the underlying error text. Set once at startup.
pub fn expose_internal_detail(expose: bool) {
  let _ = EXPOSE_DETAIL.set(expose);
}

fn detail_exposed() -> bool {
  EXPOSE_DETAIL.get().copied().unwrap_or(true)
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error(transparent)]
  Pantry(#[from] PantryError),
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      AppError::Pantry(e) => match e.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Rule => StatusCode::CONFLICT,
        ErrorKind::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
      },
      AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
      let body = if detail_exposed() {
        json!({"error": "An internal error occurred", "detail": self.to_string()})
      } else {
        json!({"error": "An internal error occurred"})
      };
      return HttpResponse::build(status).json(body);
    }
    tracing::warn!(application_error = %self, status = status.as_u16(), "Request refused");
    HttpResponse::build(status).json(json!({"error": self.to_string()}))
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;
