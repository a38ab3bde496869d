use migration::{Migrator, MigratorTrait};
use sea_orm::Database;

use crate::{
  config::Config, envelope::Envelope, prelude::*, sv, verify::Verifier,
};

pub struct Services<'a> {
  pub user: sv::User<'a>,
  pub license: sv::License<'a>,
  pub stats: sv::Stats<'a>,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub envelope: Envelope,
  pub config: Config,
}

impl AppState {
  /// Fails before anything is served if the envelope secret is missing or
  /// the database cannot be prepared.
  pub async fn new(config: Config) -> Result<Self> {
    let envelope = Envelope::new(&config.envelope_secret)
      .ok_or_else(|| Error::Config("Envelope secret is empty".into()))?;

    info!("Connecting to database...");
    let db = Database::connect(config.database_url.as_str()).await?;

    info!("Running migrations...");
    Migrator::up(&db, None).await?;

    Ok(Self::from_parts(db, envelope, config))
  }

  pub fn from_parts(
    db: DatabaseConnection,
    envelope: Envelope,
    config: Config,
  ) -> Self {
    Self { db, envelope, config }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      user: sv::User::new(&self.db),
      license: sv::License::new(&self.db),
      stats: sv::Stats::new(&self.db),
    }
  }

  pub fn verifier(&self) -> Verifier<'_> {
    Verifier::new(&self.db, &self.envelope)
  }
}
