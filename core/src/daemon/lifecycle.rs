use tokio::signal;
use tracing::{info, warn};

/// Tracks the daemon through startup, steady state and shutdown.
pub struct Lifecycle {
  state: LifecycleState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
  /// Loading config, building the registry, creating destination tables.
  Initializing,
  /// Consuming change events.
  Running,
  /// Input closed or signal received; flushing stream buffers.
  ShuttingDown,
  Stopped,
}

impl Lifecycle {
  pub fn new() -> Self {
    Self {
      state: LifecycleState::Initializing,
    }
  }

  pub fn transition(&mut self, new_state: LifecycleState) {
    info!(
      from = ?self.state,
      to = ?new_state,
      "lifecycle state transition"
    );
    self.state = new_state;
  }

  pub fn state(&self) -> LifecycleState {
    self.state
  }

  /// Whether new events should still be consumed.
  pub fn is_running(&self) -> bool {
    self.state == LifecycleState::Running
  }

  /// Wait for a shutdown signal (SIGINT or SIGTERM).
  ///
  /// If a handler cannot be installed the corresponding branch never
  /// completes, so the other signal still works.
  pub async fn wait_for_shutdown() {
    let ctrl_c = async {
      if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
      }
    };

    #[cfg(unix)]
    let terminate = async {
      match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sig) => {
          sig.recv().await;
        }
        Err(e) => {
          warn!(error = %e, "failed to install SIGTERM handler");
          std::future::pending::<()>().await;
        }
      }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
      _ = ctrl_c => info!("received SIGINT"),
      _ = terminate => info!("received SIGTERM"),
    }
  }
}

impl Default for Lifecycle {
  fn default() -> Self {
    Self::new()
  }
}
