use serde::Serialize;

use crate::{
  entity::{LicenseStatus, license},
  prelude::*,
  sv,
};

const EXPIRING_WINDOW_DAYS: i64 = 30;
const ACTIVITY_DAYS: i64 = 7;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DayActivity {
  pub date: String,
  pub licenses: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
  pub total_users: u64,
  pub total_licenses: u64,
  pub active_licenses: u64,
  pub active_users: u64,
  pub active_users_percent: u64,
  pub expiring_soon_licenses: u64,
  pub recent_activity: Vec<DayActivity>,
}

pub struct Stats<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Stats<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn dashboard(&self, now: DateTime) -> Result<Dashboard> {
    let total_users = sv::User::new(self.db).count().await?;
    let licenses = sv::License::new(self.db);
    let total_licenses = licenses.count().await?;
    let active_licenses = licenses.count_active(now).await?;

    let active_users = self.active_users(now).await?;
    let active_users_percent = if total_users > 0 {
      (active_users as f64 / total_users as f64 * 100.0).round() as u64
    } else {
      0
    };

    let expiring_soon_licenses = license::Entity::find()
      .filter(license::Column::Status.eq(LicenseStatus::Active))
      .filter(license::Column::ExpiresAt.gt(now))
      .filter(
        license::Column::ExpiresAt
          .lte(now + TimeDelta::days(EXPIRING_WINDOW_DAYS)),
      )
      .count(self.db)
      .await?;

    Ok(Dashboard {
      total_users,
      total_licenses,
      active_licenses,
      active_users,
      active_users_percent,
      expiring_soon_licenses,
      recent_activity: self.recent_activity(now).await?,
    })
  }

  /// Users owning at least one unrevoked, unexpired license.
  async fn active_users(&self, now: DateTime) -> Result<u64> {
    let owners: Vec<String> = license::Entity::find()
      .select_only()
      .column(license::Column::UserId)
      .distinct()
      .filter(license::Column::Status.eq(LicenseStatus::Active))
      .filter(license::Column::ExpiresAt.gt(now))
      .into_tuple()
      .all(self.db)
      .await?;
    Ok(owners.len() as u64)
  }

  /// Licenses created per calendar day, oldest day first, zero-filled.
  async fn recent_activity(&self, now: DateTime) -> Result<Vec<DayActivity>> {
    let today = now.date();
    let first_day = today - TimeDelta::days(ACTIVITY_DAYS - 1);
    let since = first_day.and_hms_opt(0, 0, 0).unwrap_or(now);

    let created: Vec<DateTime> = license::Entity::find()
      .select_only()
      .column(license::Column::CreatedAt)
      .filter(license::Column::CreatedAt.gte(since))
      .into_tuple()
      .all(self.db)
      .await?;

    let activity = (0..ACTIVITY_DAYS)
      .map(|offset| {
        let day = first_day + TimeDelta::days(offset);
        let licenses =
          created.iter().filter(|at| at.date() == day).count() as u64;
        DayActivity {
          date: utils::format_day(day),
          licenses,
        }
      })
      .collect();

    Ok(activity)
  }
}
