pub mod license;
pub mod stats;
pub mod user;

pub use license::{License, LicensePatch, NewLicense};
pub use stats::Stats;
pub use user::User;

#[cfg(test)]
pub(crate) mod testing {
  use migration::{Migrator, MigratorTrait};
  use sea_orm::Database;

  use super::{License, NewLicense, User};
  use crate::{
    entity::{license, user},
    prelude::*,
  };

  pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
  }

  pub async fn user(db: &DatabaseConnection, name: &str) -> user::Model {
    User::new(db).create(name).await.unwrap()
  }

  pub async fn license(
    db: &DatabaseConnection,
    owner: &user::Model,
    days: i64,
    hardware_binding_enabled: bool,
  ) -> license::Model {
    License::new(db)
      .create(NewLicense {
        user_id: owner.id.clone(),
        software_name: "Tool".into(),
        expires_at: Utc::now().naive_utc() + TimeDelta::days(days),
        hardware_binding_enabled,
      })
      .await
      .unwrap()
  }

  /// Moves the expiration date directly, bypassing lifecycle checks.
  pub async fn force_expiration(
    db: &DatabaseConnection,
    license: &license::Model,
    expires_at: DateTime,
  ) {
    license::ActiveModel {
      expires_at: Set(expires_at),
      ..license.clone().into()
    }
    .update(db)
    .await
    .unwrap();
  }
}
