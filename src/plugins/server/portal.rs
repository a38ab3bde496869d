use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};

use super::{admin::LicenseView, auth::Portal};
use crate::{prelude::*, state::AppState};

pub async fn licenses(
  Portal(user): Portal,
  State(app): State<Arc<AppState>>,
) -> Result<Json<Vec<LicenseView>>> {
  let licenses = app.sv().license.by_user(&user.id).await?;

  let views = licenses
    .into_iter()
    .map(|license| LicenseView::new(license, Some(&user)))
    .collect();

  Ok(Json(views))
}

/// Another user's license answers exactly like a missing one.
pub async fn license(
  Portal(user): Portal,
  State(app): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<LicenseView>> {
  match app.sv().license.by_id(&id).await? {
    Some(license) if license.user_id == user.id => {
      Ok(Json(LicenseView::new(license, Some(&user))))
    }
    _ => Err(Error::LicenseNotFound),
  }
}
