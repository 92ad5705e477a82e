use std::time::Duration;

use reqwest::StatusCode;

/// Exponential backoff retry policy for inserts into ClickHouse.
pub struct RetryPolicy {
  /// Maximum number of attempts (including the first).
  pub max_attempts: u32,
  pub initial_backoff: Duration,
  pub max_backoff: Duration,
  pub multiplier: f64,
}

impl RetryPolicy {
  pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
    Self {
      max_attempts,
      initial_backoff,
      max_backoff: Duration::from_secs(30),
      multiplier: 2.0,
    }
  }

  pub fn from_config(cfg: &shared::config::ClickHouseConfig) -> Self {
    Self::new(
      cfg.retry_max_attempts,
      Duration::from_millis(cfg.retry_initial_backoff_ms),
    )
  }

  /// Backoff before the retry that follows `attempt` (0-indexed).
  pub fn backoff_for(&self, attempt: u32) -> Duration {
    let backoff = self
      .initial_backoff
      .mul_f64(self.multiplier.powi(attempt as i32));
    backoff.min(self.max_backoff)
  }

  pub fn should_retry(&self, attempt: u32) -> bool {
    attempt + 1 < self.max_attempts
  }
}

/// Server-side and throttling failures are worth another attempt; other
/// client errors (bad SQL, schema mismatch) are not.
pub fn is_retryable_status(status: StatusCode) -> bool {
  status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}
