use std::sync::Arc;

use axum::{
  Json,
  extract::{FromRequest, Path, State},
  http::StatusCode,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::auth::Admin;
use crate::{
  entity::{LicenseStatus, license, user},
  prelude::*,
  state::AppState,
  sv::{LicensePatch, NewLicense, stats::Dashboard},
};

/// JSON body whose rejections use the API error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct Payload<T>(pub T);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseView {
  pub id: String,
  pub license_key: String,
  pub user_id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub username: Option<String>,
  pub software_name: String,
  pub expiration_date: chrono::DateTime<Utc>,
  pub hardware_binding_enabled: bool,
  pub hardware_id: Option<String>,
  pub status: LicenseStatus,
  pub created_at: chrono::DateTime<Utc>,
  pub updated_at: chrono::DateTime<Utc>,
}

impl LicenseView {
  pub fn new(license: license::Model, owner: Option<&user::Model>) -> Self {
    Self {
      id: license.id,
      license_key: license.license_key,
      user_id: license.user_id,
      username: owner.map(|user| user.username.clone()),
      software_name: license.software_name,
      expiration_date: license.expires_at.and_utc(),
      hardware_binding_enabled: license.hardware_binding_enabled,
      hardware_id: license.hardware_id,
      status: license.status,
      created_at: license.created_at.and_utc(),
      updated_at: license.updated_at.and_utc(),
    }
  }
}

async fn with_owner(
  app: &AppState,
  license: license::Model,
) -> Result<LicenseView> {
  let owner = app.sv().user.by_id(&license.user_id).await?;
  Ok(LicenseView::new(license, owner.as_ref()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
  pub id: String,
  pub username: String,
  pub user_hash: String,
  pub created_at: chrono::DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub license_count: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub licenses: Option<Vec<LicenseView>>,
}

impl UserView {
  fn new(user: user::Model) -> Self {
    Self {
      id: user.id,
      username: user.username,
      user_hash: user.user_hash,
      created_at: user.created_at.and_utc(),
      license_count: None,
      licenses: None,
    }
  }
}

/// Accepts RFC 3339 timestamps or a bare `YYYY-MM-DD` (midnight UTC).
fn parse_expiration(raw: &str) -> Result<DateTime> {
  let raw = raw.trim();
  if let Ok(at) = chrono::DateTime::parse_from_rfc3339(raw) {
    return Ok(at.naive_utc());
  }

  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .and_then(|day| day.and_hms_opt(0, 0, 0))
    .ok_or_else(|| Error::validation("Invalid expiration date"))
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
  #[serde(default)]
  pub username: String,
}

pub async fn users(
  _: Admin,
  State(app): State<Arc<AppState>>,
) -> Result<Json<Vec<UserView>>> {
  let users = app.sv().user.all_with_license_counts().await?;

  let views = users
    .into_iter()
    .map(|(user, count)| UserView {
      license_count: Some(count),
      ..UserView::new(user)
    })
    .collect();

  Ok(Json(views))
}

pub async fn create_user(
  _: Admin,
  State(app): State<Arc<AppState>>,
  Payload(req): Payload<CreateUser>,
) -> Result<(StatusCode, Json<UserView>)> {
  let user = app.sv().user.create(&req.username).await?;
  Ok((StatusCode::CREATED, Json(UserView::new(user))))
}

pub async fn user(
  _: Admin,
  State(app): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<UserView>> {
  let (user, licenses) =
    app.sv().user.with_licenses(&id).await?.ok_or(Error::UserNotFound)?;

  let licenses: Vec<_> = licenses
    .into_iter()
    .map(|license| LicenseView::new(license, Some(&user)))
    .collect();

  Ok(Json(UserView {
    license_count: Some(licenses.len()),
    licenses: Some(licenses),
    ..UserView::new(user)
  }))
}

pub async fn delete_user(
  _: Admin,
  State(app): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<json::Value>> {
  app.sv().user.delete(&id).await?;
  Ok(Json(json::json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLicense {
  pub user_id: Option<String>,
  pub software_name: Option<String>,
  pub expiration_date: Option<String>,
  #[serde(default)]
  pub hardware_binding_enabled: bool,
}

pub async fn licenses(
  _: Admin,
  State(app): State<Arc<AppState>>,
) -> Result<Json<Vec<LicenseView>>> {
  let licenses = app.sv().license.all_with_users().await?;

  let views = licenses
    .into_iter()
    .map(|(license, user)| LicenseView::new(license, Some(&user)))
    .collect();

  Ok(Json(views))
}

pub async fn create_license(
  _: Admin,
  State(app): State<Arc<AppState>>,
  Payload(req): Payload<CreateLicense>,
) -> Result<(StatusCode, Json<LicenseView>)> {
  let (Some(user_id), Some(software_name), Some(expiration)) =
    (req.user_id, req.software_name, req.expiration_date)
  else {
    return Err(Error::validation(
      "User, software name, and expiration date are required",
    ));
  };

  let license = app
    .sv()
    .license
    .create(NewLicense {
      user_id,
      software_name,
      expires_at: parse_expiration(&expiration)?,
      hardware_binding_enabled: req.hardware_binding_enabled,
    })
    .await?;

  let view = with_owner(&app, license).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

pub async fn license(
  _: Admin,
  State(app): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<LicenseView>> {
  let (license, user) = app
    .sv()
    .license
    .by_id_with_user(&id)
    .await?
    .ok_or(Error::LicenseNotFound)?;

  Ok(Json(LicenseView::new(license, Some(&user))))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLicense {
  pub software_name: Option<String>,
  pub expiration_date: Option<String>,
  pub hardware_binding_enabled: Option<bool>,
  #[serde(default)]
  pub reset_hardware_id: bool,
  #[serde(default)]
  pub revoke: bool,
}

impl UpdateLicense {
  fn patch(&self) -> Result<LicensePatch> {
    let expires_at =
      self.expiration_date.as_deref().map(parse_expiration).transpose()?;

    Ok(LicensePatch {
      software_name: self.software_name.clone(),
      expires_at,
      hardware_binding_enabled: self.hardware_binding_enabled,
      reset_hardware_id: self.reset_hardware_id,
    })
  }
}

/// Field edits are applied before revocation so a combined request keeps
/// both.
pub async fn update_license(
  _: Admin,
  State(app): State<Arc<AppState>>,
  Path(id): Path<String>,
  Payload(req): Payload<UpdateLicense>,
) -> Result<Json<LicenseView>> {
  let sv = app.sv();
  let patch = req.patch()?;

  let mut license = if patch.is_empty() {
    sv.license.by_id(&id).await?.ok_or(Error::LicenseNotFound)?
  } else {
    sv.license.edit(&id, patch).await?
  };

  if req.revoke {
    license = sv.license.revoke(&id).await?;
  }

  Ok(Json(with_owner(&app, license).await?))
}

pub async fn dashboard(
  _: Admin,
  State(app): State<Arc<AppState>>,
) -> Result<Json<Dashboard>> {
  let now = Utc::now().naive_utc();
  Ok(Json(app.sv().stats.dashboard(now).await?))
}
