// apps/storefront/src/errors.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::json;
use shopflow::FlowError;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Field name -> messages, rendered as the `fields` object of a 400 response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&mut self, field: &str, message: impl Into<String>) {
    self.0.entry(field.to_string()).or_default().push(message.into());
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn get(&self, field: &str) -> Option<&[String]> {
    self.0.get(field).map(Vec::as_slice)
  }

  /// `Ok(())` when nothing was recorded, otherwise `AppError::Invalid(self)`.
  pub fn into_result(self) -> Result<()> {
    if self.is_empty() {
      Ok(())
    } else {
      Err(AppError::Invalid(self))
    }
  }
}

impl fmt::Display for FieldErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for (field, messages) in &self.0 {
      if !first {
        f.write_str("; ")?;
      }
      first = false;
      write!(f, "{}: {}", field, messages.join(", "))?;
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortageReason {
  InsufficientStock,
  Inactive,
  Missing,
}

/// One checkout line that could not be fulfilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockShortage {
  pub product_id: Uuid,
  pub sku: Option<String>,
  pub available: i32,
  pub requested: i32,
  pub reason: ShortageReason,
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Validation failed: {0}")]
  Invalid(FieldErrors),

  #[error("Cart is empty")]
  EmptyCart,

  #[error("Insufficient stock for {} line(s)", .0.len())]
  StockConflict(Vec<StockShortage>),

  #[error("Cart changed during checkout")]
  CartChanged,

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),

  #[error("Pipeline execution was halted by a handler.")]
  PipelineHaltedByHandler,
}

impl AppError {
  pub fn field(field: &str, message: impl Into<String>) -> Self {
    let mut errors = FieldErrors::new();
    errors.add(field, message);
    AppError::Invalid(errors)
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    let err = match err.downcast::<AppError>() {
      Ok(app_err) => return app_err,
      Err(other) => other,
    };
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(other) => AppError::Internal(other.to_string()),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::Invalid(_) | AppError::EmptyCart | AppError::StockConflict(_) => {
        StatusCode::BAD_REQUEST
      }
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::CartChanged | AppError::PipelineHaltedByHandler => StatusCode::CONFLICT,
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Responding with error");
    }

    let body = match self {
      AppError::Validation(m) | AppError::Auth(m) | AppError::Forbidden(m) | AppError::NotFound(m) => {
        json!({"error": m})
      }
      AppError::Invalid(fields) => json!({"error": "Validation failed", "fields": fields}),
      AppError::EmptyCart => json!({"error": "Cart is empty"}),
      AppError::CartChanged => json!({"error": "Cart changed during checkout, please retry"}),
      AppError::StockConflict(shortages) => {
        json!({"error": "Insufficient stock", "shortages": shortages})
      }
      AppError::Config(m) => json!({"error": "Configuration issue", "detail": m}),
      AppError::Sqlx(_) => json!({"error": "Database operation failed"}),
      AppError::Workflow { source } => {
        tracing::error!(flow_error_source = ?source, "Workflow error details");
        json!({"error": "Workflow processing error", "detail": source.to_string()})
      }
      AppError::Internal(m) => json!({"error": "An internal error occurred", "detail": m}),
      AppError::PipelineHaltedByHandler => json!({"error": "Process halted as expected by business logic."}),
    };
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
