//! License Server
//!
//! Architecture:
//! - SeaORM for database access (SQLite)
//! - Axum for the HTTP API with rate limiting
//! - ChaCha20-Poly1305 envelopes for the verification endpoint
//! - Tokio for async runtime

mod binding;
mod config;
mod entity;
mod envelope;
mod error;
mod plugins;
mod prelude;
mod state;
mod sv;
mod utils;
mod verify;

use std::sync::Arc;

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{config::Config, plugins::App, prelude::*, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "licensor=debug,tower_http=debug,axum=trace,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::from_env().context("Invalid configuration")?;
  if config.admin_token.is_none() {
    warn!("ADMIN_TOKEN not set, admin API disabled");
  }

  info!("Starting License Server v{}", env!("CARGO_PKG_VERSION"));

  let app = Arc::new(
    AppState::new(config).await.context("Failed to initialize state")?,
  );

  let handles = App::new().register(plugins::server::Plugin).run(app);

  tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
  info!("Shutting down...");

  for handle in handles {
    handle.abort();
  }

  Ok(())
}
