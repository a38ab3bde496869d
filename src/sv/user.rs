use sea_orm::ModelTrait;
use uuid::Uuid;

use crate::{
  entity::{license, user},
  prelude::*,
};

pub struct User<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> User<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(&self, username: &str) -> Result<user::Model> {
    let username = username.trim();
    if username.is_empty() {
      return Err(Error::validation("Username is required"));
    }

    let taken = user::Entity::find()
      .filter(user::Column::Username.eq(username))
      .one(self.db)
      .await?;
    if taken.is_some() {
      return Err(Error::UsernameTaken);
    }

    let user = user::ActiveModel {
      id: Set(Uuid::new_v4().to_string()),
      username: Set(username.to_string()),
      user_hash: Set(utils::generate_user_hash()),
      created_at: Set(Utc::now().naive_utc()),
    }
    .insert(self.db)
    .await?;

    info!("User {} created ({})", user.id, user.username);
    Ok(user)
  }

  pub async fn by_id(&self, id: &str) -> Result<Option<user::Model>> {
    Ok(user::Entity::find_by_id(id).one(self.db).await?)
  }

  pub async fn by_hash(&self, user_hash: &str) -> Result<Option<user::Model>> {
    let user = user::Entity::find()
      .filter(user::Column::UserHash.eq(user_hash))
      .one(self.db)
      .await?;
    Ok(user)
  }

  pub async fn with_licenses(
    &self,
    id: &str,
  ) -> Result<Option<(user::Model, Vec<license::Model>)>> {
    let Some(user) = self.by_id(id).await? else {
      return Ok(None);
    };

    let licenses = user
      .find_related(license::Entity)
      .order_by_desc(license::Column::CreatedAt)
      .all(self.db)
      .await?;

    Ok(Some((user, licenses)))
  }

  /// Newest first, each with the number of licenses owned.
  pub async fn all_with_license_counts(
    &self,
  ) -> Result<Vec<(user::Model, usize)>> {
    let users = user::Entity::find()
      .order_by_desc(user::Column::CreatedAt)
      .find_with_related(license::Entity)
      .all(self.db)
      .await?;

    Ok(
      users
        .into_iter()
        .map(|(user, licenses)| (user, licenses.len()))
        .collect(),
    )
  }

  /// Removes the user together with every license they own.
  pub async fn delete(&self, id: &str) -> Result<()> {
    let txn = self.db.begin().await?;

    let user = user::Entity::find_by_id(id)
      .one(&txn)
      .await?
      .ok_or(Error::UserNotFound)?;

    let licenses = license::Entity::delete_many()
      .filter(license::Column::UserId.eq(id))
      .exec(&txn)
      .await?;

    user.delete(&txn).await?;
    txn.commit().await?;

    info!(
      "User {id} deleted with {} license(s)",
      licenses.rows_affected
    );
    Ok(())
  }

  pub async fn count(&self) -> Result<u64> {
    Ok(user::Entity::find().count(self.db).await?)
  }
}
