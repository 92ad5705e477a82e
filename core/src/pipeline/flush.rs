use std::time::{Duration, Instant};

/// Dual-threshold flush policy for a stream buffer.
///
/// Flushes when EITHER fires first:
/// 1. Accumulated rows reach `max_rows`
/// 2. The oldest pending row has waited `max_age`
pub struct FlushPolicy {
  max_rows: usize,
  max_age: Duration,
  current_rows: usize,
  last_flush: Instant,
  flush_count: u64,
}

impl FlushPolicy {
  pub fn new(max_rows: usize, max_age: Duration) -> Self {
    Self {
      max_rows,
      max_age,
      current_rows: 0,
      last_flush: Instant::now(),
      flush_count: 0,
    }
  }

  pub fn from_config(cfg: &shared::config::PipelineConfig) -> Self {
    Self::new(
      cfg.flush_max_rows,
      Duration::from_millis(cfg.flush_max_age_ms),
    )
  }

  pub fn accumulate(&mut self, rows: usize) {
    self.current_rows += rows;
  }

  pub fn should_flush(&self) -> bool {
    if self.current_rows >= self.max_rows {
      return true;
    }
    self.current_rows > 0 && self.last_flush.elapsed() >= self.max_age
  }

  /// Rows still accepted before the size threshold fires.
  pub fn remaining(&self) -> usize {
    self.max_rows.saturating_sub(self.current_rows)
  }

  pub fn mark_flushed(&mut self) {
    self.current_rows = 0;
    self.last_flush = Instant::now();
    self.flush_count += 1;
  }

  pub fn current_rows(&self) -> usize {
    self.current_rows
  }

  pub fn flush_count(&self) -> u64 {
    self.flush_count
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn size_threshold() {
    let mut policy = FlushPolicy::new(3, Duration::from_secs(3600));
    policy.accumulate(2);
    assert!(!policy.should_flush());
    assert_eq!(policy.remaining(), 1);
    policy.accumulate(1);
    assert!(policy.should_flush());
    policy.mark_flushed();
    assert_eq!(policy.current_rows(), 0);
    assert_eq!(policy.flush_count(), 1);
  }

  #[test]
  fn age_threshold_needs_pending_rows() {
    let mut policy = FlushPolicy::new(100, Duration::ZERO);
    assert!(!policy.should_flush());
    policy.accumulate(1);
    assert!(policy.should_flush());
  }
}
