use std::sync::Arc;

use axum::{
  extract::FromRequestParts,
  http::{header, request::Parts},
};
use subtle::ConstantTimeEq;

use crate::{entity::user, prelude::*, state::AppState};

fn bearer_token(parts: &Parts) -> Option<&str> {
  let raw = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = raw.trim().split_once(' ')?;
  if !scheme.eq_ignore_ascii_case("bearer") {
    return None;
  }

  let token = token.trim();
  (!token.is_empty()).then_some(token)
}

/// Caller presented the configured admin token.
pub struct Admin;

impl FromRequestParts<Arc<AppState>> for Admin {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    app: &Arc<AppState>,
  ) -> Result<Self> {
    let expected =
      app.config.admin_token.as_deref().ok_or(Error::Unauthorized)?;
    let token = bearer_token(parts).ok_or(Error::Unauthorized)?;

    if bool::from(token.as_bytes().ct_eq(expected.as_bytes())) {
      Ok(Admin)
    } else {
      warn!("Rejected admin request with a wrong token");
      Err(Error::Unauthorized)
    }
  }
}

/// End user authenticated by their user hash.
pub struct Portal(pub user::Model);

impl FromRequestParts<Arc<AppState>> for Portal {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    app: &Arc<AppState>,
  ) -> Result<Self> {
    let token = bearer_token(parts).ok_or(Error::Unauthorized)?;
    match app.sv().user.by_hash(token).await? {
      Some(user) => Ok(Portal(user)),
      None => Err(Error::Unauthorized),
    }
  }
}
