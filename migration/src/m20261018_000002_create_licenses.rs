use sea_orm_migration::prelude::*;

use super::m20261018_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Licenses::Table)
          .if_not_exists()
          .col(ColumnDef::new(Licenses::Id).string().not_null().primary_key())
          .col(
            ColumnDef::new(Licenses::LicenseKey)
              .string()
              .not_null()
              .unique_key(),
          )
          .col(ColumnDef::new(Licenses::UserId).string().not_null())
          .col(ColumnDef::new(Licenses::SoftwareName).string().not_null())
          .col(ColumnDef::new(Licenses::ExpiresAt).date_time().not_null())
          .col(
            ColumnDef::new(Licenses::HardwareBindingEnabled)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(Licenses::HardwareId).string().null())
          .col(
            ColumnDef::new(Licenses::Status)
              .string()
              .not_null()
              .default("active"),
          )
          .col(ColumnDef::new(Licenses::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Licenses::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_licenses_user")
              .from(Licenses::Table, Licenses::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_licenses_user")
          .table(Licenses::Table)
          .col(Licenses::UserId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Licenses::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Licenses {
  Table,
  Id,
  LicenseKey,
  UserId,
  SoftwareName,
  ExpiresAt,
  HardwareBindingEnabled,
  HardwareId,
  Status,
  CreatedAt,
  UpdatedAt,
}
