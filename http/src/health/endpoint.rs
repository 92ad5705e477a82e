use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

/// Readiness flag for the daemon.
///
/// "Ready" once the registry is built, destination tables exist and the
/// consumer loop has started; cleared again while draining at shutdown.
#[derive(Clone)]
pub struct HealthEndpoint {
  ready: Arc<AtomicBool>,
}

impl HealthEndpoint {
  pub fn new() -> Self {
    Self {
      ready: Arc::new(AtomicBool::new(false)),
    }
  }

  pub fn set_ready(&self) {
    self.ready.store(true, Ordering::Release);
    info!(status = %self.status_json(), "health: daemon is ready");
  }

  pub fn set_not_ready(&self) {
    self.ready.store(false, Ordering::Release);
    info!(status = %self.status_json(), "health: daemon is draining");
  }

  pub fn is_ready(&self) -> bool {
    self.ready.load(Ordering::Acquire)
  }

  pub fn status_json(&self) -> String {
    serde_json::json!({ "ready": self.is_ready() }).to_string()
  }
}

impl Default for HealthEndpoint {
  fn default() -> Self {
    Self::new()
  }
}
