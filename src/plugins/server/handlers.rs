use std::sync::Arc;

use axum::{body::Bytes, extract::State};

use crate::{state::AppState, verify::Reply};

pub async fn health() -> &'static str {
  "OK"
}

/// Raw body: the payload is an opaque sealed string, not JSON.
pub async fn verify(State(app): State<Arc<AppState>>, body: Bytes) -> Reply {
  app.verifier().handle(&body).await
}
