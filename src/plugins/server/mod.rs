mod admin;
mod auth;
mod handlers;
mod portal;

use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{prelude::*, state::AppState};

const LIMITER_CLEANUP: Duration = Duration::from_secs(60);

pub fn router(app: Arc<AppState>) -> Router {
  let body_limit = app.config.max_body_bytes;

  Router::new()
    .route("/health", get(handlers::health))
    .route("/api/license-verification/verify", post(handlers::verify))
    .route("/api/admin/users", get(admin::users).post(admin::create_user))
    .route(
      "/api/admin/users/{id}",
      get(admin::user).delete(admin::delete_user),
    )
    .route(
      "/api/admin/licenses",
      get(admin::licenses).post(admin::create_license),
    )
    .route(
      "/api/admin/licenses/{id}",
      get(admin::license).patch(admin::update_license),
    )
    .route("/api/admin/dashboard/stats", get(admin::dashboard))
    .route("/api/user/licenses", get(portal::licenses))
    .route("/api/user/licenses/{id}", get(portal::license))
    .layer(
      ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
          CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        ),
    )
    .with_state(app)
}

pub struct Plugin;

#[async_trait]
impl super::Plugin for Plugin {
  fn name(&self) -> &'static str {
    "http"
  }

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let governor_conf = Arc::new(
      GovernorConfigBuilder::default()
        .per_second(app.config.rate_per_second)
        .burst_size(app.config.rate_burst)
        .finish()
        .context("Failed to build rate limiter config")?,
    );

    let limiter = governor_conf.limiter().clone();
    let addr = SocketAddr::from(([0, 0, 0, 0], app.config.port));

    let service = router(app)
      .layer(GovernorLayer::new(governor_conf))
      .into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(addr)
      .await
      .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP Server listening on {addr}");

    let limiter = async {
      loop {
        tokio::time::sleep(LIMITER_CLEANUP).await;
        limiter.retain_recent();
      }
    };

    let server = async {
      axum::serve(listener, service).await.context("Axum server error")
    };

    tokio::select! {
      result = server => {
        match &result {
          Ok(_) => info!("Server stopped gracefully"),
          Err(err) => error!("Server stopped with error: {err}"),
        }
        result
      }
      _ = limiter => {
        error!("Rate limiter cleaner stopped unexpectedly!");
        Ok(())
      }
    }
  }
}
