//! Error types for the license server

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};

use crate::envelope;

/// License states that forbid a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Policy {
  #[error("License has been revoked")]
  Revoked,
  #[error("License has expired")]
  Expired,
  #[error("License is bound to a different hardware ID")]
  HardwareMismatch,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("Configuration error: {0}")]
  Config(String),

  #[error(transparent)]
  Envelope(#[from] envelope::Error),

  #[error("{0}")]
  Validation(String),

  #[error("Invalid license key")]
  LicenseNotFound,

  #[error("User not found")]
  UserNotFound,

  #[error("A user with this username already exists")]
  UsernameTaken,

  #[error("Revoked licenses cannot be edited")]
  LicenseRevoked,

  #[error(transparent)]
  Policy(#[from] Policy),

  #[error("Unauthorized")]
  Unauthorized,

  #[error("Database error: {0}")]
  Database(#[from] sea_orm::DbErr),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl Error {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Error::Envelope(_) | Error::Validation(_) => StatusCode::BAD_REQUEST,
      Error::LicenseNotFound | Error::UserNotFound => StatusCode::NOT_FOUND,
      Error::UsernameTaken | Error::LicenseRevoked => StatusCode::CONFLICT,
      Error::Policy(_) => StatusCode::FORBIDDEN,
      Error::Unauthorized => StatusCode::UNAUTHORIZED,
      Error::Config(_) | Error::Database(_) | Error::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  /// Message safe to hand back to a caller. Store and internal failures
  /// collapse into one generic text.
  pub fn public_message(&self) -> String {
    match self {
      Error::Envelope(_) => "Invalid encrypted data".into(),
      Error::Config(_) | Error::Database(_) | Error::Internal(_) => {
        "An unexpected error occurred".into()
      }
      other => other.to_string(),
    }
  }
}

impl From<JsonRejection> for Error {
  fn from(rejection: JsonRejection) -> Self {
    Self::Validation(rejection.body_text())
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!("Request failed: {self}");
    }

    let body = json::json!({
      "success": false,
      "error": self.public_message(),
    });

    (status, Json(body)).into_response()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
