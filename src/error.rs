//! Error type returned by JSON handlers.
//!
//! Every variant maps to a status code and a `{"error": "..."}` body.
//! Internal details are logged, not sent to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::db::DbLockError;
use crate::services::{LlmError, MailError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error("Database error: {0}")]
  Database(#[from] rusqlite::Error),
  #[error(transparent)]
  Lock(#[from] DbLockError),
  #[error("{0}")]
  BadRequest(String),
  #[error("{0}")]
  NotFound(String),
  #[error("Authentication required")]
  Unauthorized,
  #[error("Admin access required")]
  Forbidden,
  #[error("{0}")]
  Conflict(String),
  /// Failure reported by an external API, passed through with its status
  #[error("{message}")]
  Upstream { status: StatusCode, message: String },
  #[error("{0}")]
  Internal(String),
}

impl AppError {
  pub fn bad_request(message: impl Into<String>) -> Self {
    Self::BadRequest(message.into())
  }

  pub fn not_found(message: impl Into<String>) -> Self {
    Self::NotFound(message.into())
  }

  /// Map an LLM failure for an action such as "generate hint"
  pub fn from_llm(err: LlmError, action: &str) -> Self {
    match err {
      LlmError::MissingApiKey => Self::Internal(LlmError::MissingApiKey.to_string()),
      LlmError::Upstream { status, ref message } => {
        tracing::error!("OpenAI API error ({}): {}", status, message);
        Self::Upstream {
          status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
          message: format!("Failed to {} with OpenAI", action),
        }
      }
      LlmError::Transport(e) => {
        tracing::error!("OpenAI request failed: {}", e);
        Self::Internal("Internal server error".to_string())
      }
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::Database(_) | Self::Lock(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::Unauthorized => StatusCode::UNAUTHORIZED,
      Self::Forbidden => StatusCode::FORBIDDEN,
      Self::Conflict(_) => StatusCode::CONFLICT,
      Self::Upstream { status, .. } => *status,
    }
  }

  /// Message safe to show to the user
  pub fn public_message(&self) -> String {
    match self {
      Self::Database(e) => {
        tracing::error!("Database error: {}", e);
        "Database error".to_string()
      }
      other => other.to_string(),
    }
  }
}

impl From<MailError> for AppError {
  fn from(err: MailError) -> Self {
    tracing::error!("Error sending email: {}", err);
    Self::Internal("Failed to send email".to_string())
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    (self.status(), Json(json!({ "error": self.public_message() }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_mapping() {
    assert_eq!(AppError::bad_request("x").status(), StatusCode::BAD_REQUEST);
    assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
    assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
    assert_eq!(AppError::from(DbLockError).status(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[test]
  fn test_missing_key_message() {
    let err = AppError::from_llm(LlmError::MissingApiKey, "generate hint");
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.public_message(), "OpenAI API key is not configured");
  }

  #[test]
  fn test_upstream_status_passed_through() {
    let err = AppError::from_llm(
      LlmError::Upstream { status: 429, message: "Rate limit".into() },
      "generate hint",
    );
    assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(err.public_message(), "Failed to generate hint with OpenAI");
  }

  #[test]
  fn test_database_errors_are_not_leaked() {
    let err = AppError::from(rusqlite::Error::QueryReturnedNoRows);
    assert_eq!(err.public_message(), "Database error");
  }

  #[test]
  fn test_mail_error_message() {
    let err = AppError::from(MailError::MissingApiKey);
    assert_eq!(err.public_message(), "Failed to send email");
  }
}
