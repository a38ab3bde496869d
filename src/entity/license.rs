use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Revocation is one-way: nothing moves a license back to `Active`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
  #[sea_orm(string_value = "active")]
  #[default]
  Active,
  #[sea_orm(string_value = "revoked")]
  Revoked,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "licenses")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  #[sea_orm(unique)]
  pub license_key: String,
  pub user_id: String,
  pub software_name: String,
  pub expires_at: DateTime,
  pub hardware_binding_enabled: bool,
  pub hardware_id: Option<String>,
  pub status: LicenseStatus,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

impl Model {
  pub fn is_revoked(&self) -> bool {
    self.status == LicenseStatus::Revoked
  }

  /// A license is still usable at the exact moment of expiration.
  pub fn is_expired_at(&self, now: DateTime) -> bool {
    self.expires_at < now
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::user::Entity",
    from = "Column::UserId",
    to = "super::user::Column::Id",
    on_delete = "Cascade"
  )]
  User,
}

impl Related<super::user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::User.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
