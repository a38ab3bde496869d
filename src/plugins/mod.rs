pub mod server;

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::sleep};
use tracing::{error, info, warn};

use crate::state::AppState;

const RESTART_DELAY: Duration = Duration::from_secs(5);

#[async_trait::async_trait]
pub trait Plugin: Send + Sync {
  fn name(&self) -> &'static str {
    std::any::type_name::<Self>()
  }

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()>;
}

pub struct App {
  plugins: Vec<Arc<dyn Plugin>>,
}

impl App {
  pub fn new() -> Self {
    Self { plugins: Vec::new() }
  }

  pub fn register<P: Plugin + 'static>(mut self, plugin: P) -> Self {
    self.plugins.push(Arc::new(plugin));
    self
  }

  /// Spawns a supervisor per plugin that restarts it after a crash.
  pub fn run(self, app: Arc<AppState>) -> Vec<JoinHandle<()>> {
    self
      .plugins
      .into_iter()
      .map(|plugin| tokio::spawn(supervise(plugin, app.clone())))
      .collect()
  }
}

async fn supervise(plugin: Arc<dyn Plugin>, app: Arc<AppState>) {
  let name = plugin.name();
  info!("SYSTEM: Service `{name}` initialized");

  loop {
    let app = app.clone();
    let plugin = plugin.clone();

    let handle = tokio::spawn(async move { plugin.start(app).await });

    match handle.await {
      Ok(Ok(())) => {
        warn!("Service `{name}` stopped unexpectedly (Ok).");
      }
      Ok(Err(err)) => {
        error!("Service `{name}` crashed with error: {err:#}.");
      }
      Err(join_err) if join_err.is_cancelled() => {
        info!("Service `{name}` shutdown.");
        break;
      }
      Err(_) => {
        error!("Service `{name}` PANICKED!");
      }
    }

    sleep(RESTART_DELAY).await;
    info!("SYSTEM: Restarting service `{name}`...");
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;
  use crate::{
    config::Config, envelope::Envelope, sv::testing::setup_test_db,
  };

  struct Counting(Arc<AtomicUsize>);

  #[async_trait::async_trait]
  impl Plugin for Counting {
    fn name(&self) -> &'static str {
      "counting"
    }

    async fn start(&self, _app: Arc<AppState>) -> anyhow::Result<()> {
      self.0.fetch_add(1, Ordering::SeqCst);
      std::future::pending().await
    }
  }

  #[tokio::test]
  async fn test_run_starts_every_plugin() {
    let app = Arc::new(AppState::from_parts(
      setup_test_db().await,
      Envelope::new("secret").unwrap(),
      Config::default(),
    ));
    let started = Arc::new(AtomicUsize::new(0));

    let handles = App::new()
      .register(Counting(started.clone()))
      .register(Counting(started.clone()))
      .run(app);

    for _ in 0..100 {
      if started.load(Ordering::SeqCst) == 2 {
        break;
      }
      sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(started.load(Ordering::SeqCst), 2);
    for handle in handles {
      handle.abort();
    }
  }
}
