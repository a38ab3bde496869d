//! Encrypted license verification.
//!
//! A deployed product posts a sealed `{licenseKey, hardwareId?}` and gets a
//! sealed answer back. Every reply except the empty-body one is sealed, so
//! failures look like successes on the wire apart from status and size.

use axum::{
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
  binding::{self, Rejection, Resolution},
  entity::{LicenseStatus, license, user},
  envelope::Envelope,
  prelude::*,
  sv,
};

/// A lost binding race costs one re-read; more than that means the row keeps
/// changing under us.
const BIND_ATTEMPTS: usize = 3;

/// Decrypted `{licenseKey, hardwareId?}`.
#[derive(Debug, Default)]
pub struct VerifyRequest {
  pub license_key: Option<String>,
  pub hardware_id: Option<String>,
}

impl VerifyRequest {
  /// Reads each field on its own. Only an object can carry a key, and a
  /// non-string field counts as absent without spoiling the others.
  pub fn from_value(value: &json::Value) -> Result<Self> {
    let fields = value
      .as_object()
      .ok_or_else(|| Error::validation("License key is required"))?;
    let text = |name: &str| {
      fields.get(name).and_then(json::Value::as_str).map(str::to_string)
    };

    Ok(Self {
      license_key: text("licenseKey"),
      hardware_id: text("hardwareId"),
    })
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verified {
  pub valid: bool,
  pub license_key: String,
  pub username: String,
  pub software_name: String,
  pub expiration_date: chrono::DateTime<Utc>,
  pub hardware_binding_enabled: bool,
  pub status: LicenseStatus,
}

impl Verified {
  fn new(license: license::Model, user: user::Model) -> Self {
    Self {
      valid: true,
      license_key: license.license_key,
      username: user.username,
      software_name: license.software_name,
      expiration_date: license.expires_at.and_utc(),
      hardware_binding_enabled: license.hardware_binding_enabled,
      status: license.status,
    }
  }
}

#[derive(Serialize)]
struct Failure<'a> {
  error: &'a str,
}

#[derive(Debug)]
pub struct Reply {
  pub status: StatusCode,
  pub body: String,
  pub sealed: bool,
}

impl Reply {
  fn plain(status: StatusCode, error: &str) -> Self {
    let body = json::json!({ "error": error }).to_string();
    Self { status, body, sealed: false }
  }
}

impl IntoResponse for Reply {
  fn into_response(self) -> Response {
    let content_type =
      if self.sealed { "text/plain" } else { "application/json" };
    (self.status, [(header::CONTENT_TYPE, content_type)], self.body)
      .into_response()
  }
}

pub struct Verifier<'a> {
  db: &'a DatabaseConnection,
  envelope: &'a Envelope,
}

impl<'a> Verifier<'a> {
  pub fn new(db: &'a DatabaseConnection, envelope: &'a Envelope) -> Self {
    Self { db, envelope }
  }

  pub async fn handle(&self, body: &[u8]) -> Reply {
    self.handle_at(body, Utc::now().naive_utc()).await
  }

  pub async fn handle_at(&self, body: &[u8], now: DateTime) -> Reply {
    // nothing to protect yet, so this one goes out in the clear
    if body.is_empty() {
      return Reply::plain(StatusCode::BAD_REQUEST, "Missing encrypted data");
    }

    let request = match self.open(body) {
      Ok(request) => request,
      Err(err) => return self.failure(err),
    };

    match self.check(&request, now).await {
      Ok(verified) => {
        debug!("License {} verified", verified.license_key);
        self.reply(StatusCode::OK, &verified)
      }
      Err(err) => self.failure(err),
    }
  }

  fn open(&self, body: &[u8]) -> Result<VerifyRequest> {
    let text = std::str::from_utf8(body).map_err(|_| {
      crate::envelope::Error::Decryption("request body is not UTF-8")
    })?;

    let value: json::Value = self.envelope.open(text)?;
    VerifyRequest::from_value(&value)
  }

  /// Decision procedure on an already decrypted request.
  pub async fn check(
    &self,
    request: &VerifyRequest,
    now: DateTime,
  ) -> Result<Verified> {
    let key = request
      .license_key
      .as_deref()
      .filter(|key| !key.is_empty())
      .ok_or_else(|| Error::validation("License key is required"))?;

    if !utils::is_license_key(key) {
      return Err(Error::LicenseNotFound);
    }

    let licenses = sv::License::new(self.db);
    let (mut license, user) = licenses
      .by_key_with_user(key)
      .await?
      .ok_or(Error::LicenseNotFound)?;

    if license.is_revoked() {
      return Err(Policy::Revoked.into());
    }

    if license.is_expired_at(now) {
      return Err(Policy::Expired.into());
    }

    let supplied = request.hardware_id.as_deref();
    for _ in 0..BIND_ATTEMPTS {
      let resolution = binding::resolve(
        license.hardware_binding_enabled,
        supplied,
        license.hardware_id.as_deref(),
      );

      match resolution {
        Resolution::Accept => return Ok(Verified::new(license, user)),
        Resolution::Reject(Rejection::HardwareIdRequired) => {
          return Err(Error::validation(
            "Hardware ID is required for this license",
          ));
        }
        Resolution::Reject(Rejection::HardwareMismatch) => {
          return Err(Policy::HardwareMismatch.into());
        }
        Resolution::Bind(hardware_id) => {
          if licenses.bind_hardware(&license.id, &hardware_id).await? {
            info!(
              "License {} bound to hardware {}",
              license.id,
              utils::redact(&hardware_id)
            );
            license.hardware_id = Some(hardware_id);
            return Ok(Verified::new(license, user));
          }

          debug!("License {} bound concurrently, re-reading", license.id);
          license =
            licenses.by_id(&license.id).await?.ok_or(Error::LicenseNotFound)?;
        }
      }
    }

    Err(Error::Internal(format!(
      "hardware binding for license {} did not settle",
      license.id
    )))
  }

  fn failure(&self, err: Error) -> Reply {
    let status = err.status();
    if status.is_server_error() {
      error!("License verification failed: {err}");
    } else {
      debug!("License verification rejected: {err}");
    }

    let message = err.public_message();
    self.reply(status, &Failure { error: &message })
  }

  fn reply<T: Serialize>(&self, status: StatusCode, payload: &T) -> Reply {
    match self.envelope.seal(payload) {
      Ok(body) => Reply { status, body, sealed: true },
      Err(err) => {
        error!("Failed to seal verification reply: {err}");
        Reply::plain(
          StatusCode::INTERNAL_SERVER_ERROR,
          "An unexpected error occurred",
        )
      }
    }
  }
}
