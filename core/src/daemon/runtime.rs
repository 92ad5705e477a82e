use tracing::info;

/// Tokio runtime settings for the daemon.
pub struct RuntimeConfig {
  pub worker_threads: usize,
  pub thread_name: String,
  pub thread_stack_size: usize,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      worker_threads: num_cpus(),
      thread_name: "ferry-worker".to_string(),
      thread_stack_size: 2 * 1024 * 1024, // 2 MiB
    }
  }
}

impl RuntimeConfig {
  /// One worker per stream flush task plus the consumer, capped by the
  /// available cores.
  pub fn for_streams(streams: usize) -> Self {
    Self {
      worker_threads: (streams + 1).clamp(1, num_cpus().max(1)),
      ..Self::default()
    }
  }

  pub fn build_runtime(&self) -> anyhow::Result<tokio::runtime::Runtime> {
    let rt = tokio::runtime::Builder::new_multi_thread()
      .worker_threads(self.worker_threads)
      .thread_name(&self.thread_name)
      .thread_stack_size(self.thread_stack_size)
      .enable_all()
      .build()?;

    info!(
      workers = self.worker_threads,
      stack_size = self.thread_stack_size,
      "tokio runtime configured"
    );

    Ok(rt)
  }
}

fn num_cpus() -> usize {
  std::thread::available_parallelism()
    .map(|n| n.get())
    .unwrap_or(4)
}
