use uuid::Uuid;

use crate::{
  entity::{LicenseStatus, license, user},
  prelude::*,
};

/// Collisions on a 128-bit random key are not expected, but the unique index
/// still gets the final say.
const KEY_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct NewLicense {
  pub user_id: String,
  pub software_name: String,
  pub expires_at: DateTime,
  pub hardware_binding_enabled: bool,
}

/// Admin edit. Every field is optional and applied on its own.
#[derive(Debug, Default, Clone)]
pub struct LicensePatch {
  pub software_name: Option<String>,
  pub expires_at: Option<DateTime>,
  pub hardware_binding_enabled: Option<bool>,
  pub reset_hardware_id: bool,
}

impl LicensePatch {
  pub fn is_empty(&self) -> bool {
    self.software_name.is_none()
      && self.expires_at.is_none()
      && self.hardware_binding_enabled.is_none()
      && !self.reset_hardware_id
  }
}

pub struct License<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> License<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(&self, new: NewLicense) -> Result<license::Model> {
    let software_name = new.software_name.trim();
    if software_name.is_empty() {
      return Err(Error::validation("Software name is required"));
    }

    let now = Utc::now().naive_utc();
    if new.expires_at <= now {
      return Err(Error::validation("Expiration date must be in the future"));
    }

    user::Entity::find_by_id(&new.user_id)
      .one(self.db)
      .await?
      .ok_or(Error::UserNotFound)?;

    let license_key = self.unused_key().await?;

    let license = license::ActiveModel {
      id: Set(Uuid::new_v4().to_string()),
      license_key: Set(license_key),
      user_id: Set(new.user_id),
      software_name: Set(software_name.to_string()),
      expires_at: Set(new.expires_at),
      hardware_binding_enabled: Set(new.hardware_binding_enabled),
      hardware_id: Set(None),
      status: Set(LicenseStatus::Active),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(self.db)
    .await?;

    info!(
      "License {} created for user {} ({})",
      license.id, license.user_id, license.software_name
    );
    Ok(license)
  }

  async fn unused_key(&self) -> Result<String> {
    for _ in 0..KEY_ATTEMPTS {
      let key = utils::generate_license_key();
      if self.by_key(&key).await?.is_none() {
        return Ok(key);
      }
      warn!("License key collision, regenerating");
    }
    Err(Error::Internal("Failed to generate a unique license key".into()))
  }

  pub async fn by_id(&self, id: &str) -> Result<Option<license::Model>> {
    Ok(license::Entity::find_by_id(id).one(self.db).await?)
  }

  pub async fn by_key(&self, key: &str) -> Result<Option<license::Model>> {
    let license = license::Entity::find()
      .filter(license::Column::LicenseKey.eq(key))
      .one(self.db)
      .await?;
    Ok(license)
  }

  /// License joined with its owner, as the verification flow needs it.
  pub async fn by_key_with_user(
    &self,
    key: &str,
  ) -> Result<Option<(license::Model, user::Model)>> {
    let found = license::Entity::find()
      .filter(license::Column::LicenseKey.eq(key))
      .find_also_related(user::Entity)
      .one(self.db)
      .await?;

    Ok(found.and_then(|(license, user)| user.map(|user| (license, user))))
  }

  pub async fn by_id_with_user(
    &self,
    id: &str,
  ) -> Result<Option<(license::Model, user::Model)>> {
    let found = license::Entity::find_by_id(id)
      .find_also_related(user::Entity)
      .one(self.db)
      .await?;

    Ok(found.and_then(|(license, user)| user.map(|user| (license, user))))
  }

  pub async fn by_user(&self, user_id: &str) -> Result<Vec<license::Model>> {
    let licenses = license::Entity::find()
      .filter(license::Column::UserId.eq(user_id))
      .order_by_desc(license::Column::CreatedAt)
      .all(self.db)
      .await?;
    Ok(licenses)
  }

  /// Newest first, each with its owner.
  pub async fn all_with_users(
    &self,
  ) -> Result<Vec<(license::Model, user::Model)>> {
    let rows = license::Entity::find()
      .order_by_desc(license::Column::CreatedAt)
      .find_also_related(user::Entity)
      .all(self.db)
      .await?;

    Ok(
      rows
        .into_iter()
        .filter_map(|(license, user)| user.map(|user| (license, user)))
        .collect(),
    )
  }

  pub async fn edit(
    &self,
    id: &str,
    patch: LicensePatch,
  ) -> Result<license::Model> {
    let txn = self.db.begin().await?;

    let license = license::Entity::find_by_id(id)
      .one(&txn)
      .await?
      .ok_or(Error::LicenseNotFound)?;

    if license.is_revoked() {
      return Err(Error::LicenseRevoked);
    }

    let mut active: license::ActiveModel = license.into();

    if let Some(name) = patch.software_name {
      let name = name.trim();
      if name.is_empty() {
        return Err(Error::validation("Software name cannot be empty"));
      }
      active.software_name = Set(name.to_string());
    }

    if let Some(expires_at) = patch.expires_at {
      active.expires_at = Set(expires_at);
    }

    if let Some(enabled) = patch.hardware_binding_enabled {
      active.hardware_binding_enabled = Set(enabled);
      // an unbound license keeps no hardware id
      if !enabled {
        active.hardware_id = Set(None);
      }
    }

    if patch.reset_hardware_id {
      active.hardware_id = Set(None);
    }

    active.updated_at = Set(Utc::now().naive_utc());
    let license = active.update(&txn).await?;

    txn.commit().await?;
    Ok(license)
  }

  /// One-way. Revoking twice is a no-op.
  pub async fn revoke(&self, id: &str) -> Result<license::Model> {
    let result = license::Entity::update_many()
      .set(license::ActiveModel {
        status: Set(LicenseStatus::Revoked),
        updated_at: Set(Utc::now().naive_utc()),
        ..Default::default()
      })
      .filter(license::Column::Id.eq(id))
      .filter(license::Column::Status.eq(LicenseStatus::Active))
      .exec(self.db)
      .await?;

    if result.rows_affected > 0 {
      info!("License {id} revoked");
    }

    self.by_id(id).await?.ok_or(Error::LicenseNotFound)
  }

  /// Captures `hardware_id` only if the license has none yet.
  ///
  /// Returns `false` when another caller bound the license first (or binding
  /// got disabled meanwhile); the caller must re-read and decide again.
  pub async fn bind_hardware(
    &self,
    id: &str,
    hardware_id: &str,
  ) -> Result<bool> {
    let result = license::Entity::update_many()
      .set(license::ActiveModel {
        hardware_id: Set(Some(hardware_id.to_string())),
        updated_at: Set(Utc::now().naive_utc()),
        ..Default::default()
      })
      .filter(license::Column::Id.eq(id))
      .filter(license::Column::HardwareId.is_null())
      .filter(license::Column::HardwareBindingEnabled.eq(true))
      .exec(self.db)
      .await?;

    Ok(result.rows_affected == 1)
  }

  pub async fn count(&self) -> Result<u64> {
    Ok(license::Entity::find().count(self.db).await?)
  }

  pub async fn count_active(&self, now: DateTime) -> Result<u64> {
    let count = license::Entity::find()
      .filter(license::Column::Status.eq(LicenseStatus::Active))
      .filter(license::Column::ExpiresAt.gt(now))
      .count(self.db)
      .await?;
    Ok(count)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::testing::{self, setup_test_db};

  #[tokio::test]
  async fn test_create_license() {
    let db = setup_test_db().await;
    let alice = testing::user(&db, "alice").await;

    let license = testing::license(&db, &alice, 30, false).await;

    assert_eq!(license.user_id, alice.id);
    assert_eq!(license.software_name, "Tool");
    assert_eq!(license.status, LicenseStatus::Active);
    assert!(!license.hardware_binding_enabled);
    assert!(license.hardware_id.is_none());
    assert!(utils::is_license_key(&license.license_key));
  }

  #[tokio::test]
  async fn test_create_requires_existing_user() {
    let db = setup_test_db().await;

    let result = License::new(&db)
      .create(NewLicense {
        user_id: "nobody".into(),
        software_name: "Tool".into(),
        expires_at: Utc::now().naive_utc() + TimeDelta::days(1),
        hardware_binding_enabled: false,
      })
      .await;

    assert!(matches!(result, Err(Error::UserNotFound)));
  }

  #[tokio::test]
  async fn test_create_validates_input() {
    let db = setup_test_db().await;
    let alice = testing::user(&db, "alice").await;
    let sv = License::new(&db);

    let past = sv
      .create(NewLicense {
        user_id: alice.id.clone(),
        software_name: "Tool".into(),
        expires_at: Utc::now().naive_utc() - TimeDelta::days(1),
        hardware_binding_enabled: false,
      })
      .await;
    assert!(matches!(past, Err(Error::Validation(_))));

    let unnamed = sv
      .create(NewLicense {
        user_id: alice.id,
        software_name: "   ".into(),
        expires_at: Utc::now().naive_utc() + TimeDelta::days(1),
        hardware_binding_enabled: false,
      })
      .await;
    assert!(matches!(unnamed, Err(Error::Validation(_))));
  }

  #[tokio::test]
  async fn test_lookup_with_owner() {
    let db = setup_test_db().await;
    let alice = testing::user(&db, "alice").await;
    let license = testing::license(&db, &alice, 30, false).await;
    let sv = License::new(&db);

    let (found, owner) =
      sv.by_key_with_user(&license.license_key).await.unwrap().unwrap();
    assert_eq!(found.id, license.id);
    assert_eq!(owner.username, "alice");

    assert!(sv.by_key_with_user("missing").await.unwrap().is_none());
    assert!(sv.by_id(&license.id).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn test_edit_applies_fields_independently() {
    let db = setup_test_db().await;
    let alice = testing::user(&db, "alice").await;
    let license = testing::license(&db, &alice, 30, false).await;
    let sv = License::new(&db);

    let renamed = sv
      .edit(&license.id, LicensePatch {
        software_name: Some("Tool Pro".into()),
        ..Default::default()
      })
      .await
      .unwrap();
    assert_eq!(renamed.software_name, "Tool Pro");
    assert_eq!(renamed.expires_at, license.expires_at);
    assert!(!renamed.hardware_binding_enabled);

    let bound = sv
      .edit(&license.id, LicensePatch {
        hardware_binding_enabled: Some(true),
        ..Default::default()
      })
      .await
      .unwrap();
    assert_eq!(bound.software_name, "Tool Pro");
    assert!(bound.hardware_binding_enabled);
  }

  #[tokio::test]
  async fn test_reset_and_disable_clear_hardware_id() {
    let db = setup_test_db().await;
    let alice = testing::user(&db, "alice").await;
    let license = testing::license(&db, &alice, 30, true).await;
    let sv = License::new(&db);

    assert!(sv.bind_hardware(&license.id, "H1").await.unwrap());
    let reset = sv
      .edit(&license.id, LicensePatch {
        reset_hardware_id: true,
        ..Default::default()
      })
      .await
      .unwrap();
    assert_eq!(reset.hardware_id, None);
    assert!(reset.hardware_binding_enabled);

    assert!(sv.bind_hardware(&license.id, "H2").await.unwrap());
    let disabled = sv
      .edit(&license.id, LicensePatch {
        hardware_binding_enabled: Some(false),
        ..Default::default()
      })
      .await
      .unwrap();
    assert_eq!(disabled.hardware_id, None);
  }

  #[tokio::test]
  async fn test_bind_hardware_only_once() {
    let db = setup_test_db().await;
    let alice = testing::user(&db, "alice").await;
    let license = testing::license(&db, &alice, 30, true).await;
    let sv = License::new(&db);

    assert!(sv.bind_hardware(&license.id, "H1").await.unwrap());
    assert!(!sv.bind_hardware(&license.id, "H2").await.unwrap());

    let stored = sv.by_id(&license.id).await.unwrap().unwrap();
    assert_eq!(stored.hardware_id.as_deref(), Some("H1"));
  }

  #[tokio::test]
  async fn test_bind_requires_binding_enabled() {
    let db = setup_test_db().await;
    let alice = testing::user(&db, "alice").await;
    let license = testing::license(&db, &alice, 30, false).await;
    let sv = License::new(&db);

    assert!(!sv.bind_hardware(&license.id, "H1").await.unwrap());
    let stored = sv.by_id(&license.id).await.unwrap().unwrap();
    assert_eq!(stored.hardware_id, None);
  }

  #[tokio::test]
  async fn test_revoke_is_terminal() {
    let db = setup_test_db().await;
    let alice = testing::user(&db, "alice").await;
    let license = testing::license(&db, &alice, 30, false).await;
    let sv = License::new(&db);

    let revoked = sv.revoke(&license.id).await.unwrap();
    assert_eq!(revoked.status, LicenseStatus::Revoked);

    // second revoke is harmless
    let again = sv.revoke(&license.id).await.unwrap();
    assert_eq!(again.status, LicenseStatus::Revoked);

    let edit = sv
      .edit(&license.id, LicensePatch {
        software_name: Some("Other".into()),
        ..Default::default()
      })
      .await;
    assert!(matches!(edit, Err(Error::LicenseRevoked)));

    let stored = sv.by_id(&license.id).await.unwrap().unwrap();
    assert_eq!(stored.software_name, "Tool");
    assert_eq!(stored.status, LicenseStatus::Revoked);
  }

  #[tokio::test]
  async fn test_revoke_unknown_license() {
    let db = setup_test_db().await;
    let result = License::new(&db).revoke("missing").await;
    assert!(matches!(result, Err(Error::LicenseNotFound)));
  }

  #[tokio::test]
  async fn test_counts() {
    let db = setup_test_db().await;
    let alice = testing::user(&db, "alice").await;
    let sv = License::new(&db);

    let a = testing::license(&db, &alice, 30, false).await;
    let b = testing::license(&db, &alice, 30, false).await;
    let c = testing::license(&db, &alice, 30, false).await;
    sv.revoke(&b.id).await.unwrap();
    testing::force_expiration(
      &db,
      &c,
      Utc::now().naive_utc() - TimeDelta::days(1),
    )
    .await;

    let now = Utc::now().naive_utc();
    assert_eq!(sv.count().await.unwrap(), 3);
    assert_eq!(sv.count_active(now).await.unwrap(), 1);
    assert_eq!(sv.by_user(&alice.id).await.unwrap().len(), 3);
    assert!(sv.by_id(&a.id).await.unwrap().is_some());
  }
}
