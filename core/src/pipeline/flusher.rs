use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{error, info};

use super::batch::RowBatch;
use super::coordinator::StreamCoordinator;
use crate::metrics::MetricsRegistry;

/// Writes a batch of rows into a destination table of the OLAP store.
///
/// Retries, if any, belong to the implementation; a returned error means
/// the batch is given up on.
#[async_trait]
pub trait BatchWriter: Send + Sync {
  async fn write(&self, table: &str, batch: &RowBatch) -> anyhow::Result<()>;
}

/// Drive one stream's coordinator until `shutdown` flips to `true` (or its
/// sender is dropped), then flush whatever is still buffered.
pub async fn run_flush_loop(
  mut coordinator: StreamCoordinator,
  writer: Arc<dyn BatchWriter>,
  metrics: Arc<MetricsRegistry>,
  tick: Duration,
  mut shutdown: watch::Receiver<bool>,
) -> StreamCoordinator {
  let mut interval = tokio::time::interval(tick);
  interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

  loop {
    tokio::select! {
      _ = interval.tick() => {
        coordinator.drain_ring();
        while let Some(batch) = coordinator.maybe_flush() {
          write_batch(&coordinator, writer.as_ref(), &metrics, batch).await;
          coordinator.drain_ring();
        }
        metrics.observe_buffer(
          coordinator.stream(),
          coordinator.ring_len(),
          coordinator.ring_capacity(),
        );
      }
      changed = shutdown.changed() => {
        if changed.is_err() || *shutdown.borrow() {
          break;
        }
      }
    }
  }

  loop {
    coordinator.drain_ring();
    match coordinator.force_flush() {
      Some(batch) => write_batch(&coordinator, writer.as_ref(), &metrics, batch).await,
      None => break,
    }
  }
  metrics.observe_buffer(coordinator.stream(), 0, coordinator.ring_capacity());

  info!(
    stream = %coordinator.stream(),
    rows = coordinator.rows_drained(),
    batches = coordinator.batches_flushed(),
    "flush loop stopped"
  );
  coordinator
}

async fn write_batch(
  coordinator: &StreamCoordinator,
  writer: &dyn BatchWriter,
  metrics: &MetricsRegistry,
  batch: RowBatch,
) {
  let stream = coordinator.stream();
  let started = Instant::now();
  match writer.write(stream, &batch).await {
    Ok(()) => {
      metrics.flush_latency.observe(started.elapsed().as_secs_f64());
      metrics
        .rows_written
        .with_label_values(&[stream])
        .inc_by(batch.len() as u64);
    }
    Err(e) => {
      metrics.write_errors.with_label_values(&[stream]).inc();
      error!(
        stream,
        rows = batch.len(),
        min_lsn = %batch.min_position(),
        max_lsn = %batch.max_position(),
        error = %format!("{e:#}"),
        "batch write failed, rows dropped"
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pipeline::FlushPolicy;
  use crate::schema::AnalyticalRow;
  use serde_json::json;
  use shared::lsn::Lsn;
  use shared::queue::RingBuffer;
  use std::sync::Mutex;

  #[derive(Default)]
  struct Recording {
    writes: Mutex<Vec<(String, usize)>>,
  }

  #[async_trait]
  impl BatchWriter for Recording {
    async fn write(&self, table: &str, batch: &RowBatch) -> anyhow::Result<()> {
      self
        .writes
        .lock()
        .unwrap()
        .push((table.to_string(), batch.len()));
      Ok(())
    }
  }

  struct Failing;

  #[async_trait]
  impl BatchWriter for Failing {
    async fn write(&self, _table: &str, _batch: &RowBatch) -> anyhow::Result<()> {
      anyhow::bail!("connection refused")
    }
  }

  fn row(pos: u64) -> AnalyticalRow {
    AnalyticalRow {
      destination: "dim_product",
      position: Lsn::new(pos),
      deleted: false,
      data: json!({"id": pos}),
    }
  }

  fn setup(max_rows: usize, rows: u64) -> StreamCoordinator {
    let ring = RingBuffer::new(64);
    for i in 0..rows {
      ring.try_push(row(i)).unwrap();
    }
    let policy = FlushPolicy::new(max_rows, Duration::from_secs(3600));
    StreamCoordinator::new("dim_product", ring, policy)
  }

  #[tokio::test]
  async fn flushes_full_batches_and_remainder_on_shutdown() {
    let writer = Arc::new(Recording::default());
    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(run_flush_loop(
      setup(4, 10),
      writer.clone(),
      metrics.clone(),
      Duration::from_millis(5),
      rx,
    ));
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(true).unwrap();
    let coordinator = handle.await.unwrap();

    let writes = writer.writes.lock().unwrap().clone();
    let sizes: Vec<usize> = writes.iter().map(|(_, n)| *n).collect();
    assert_eq!(sizes, [4, 4, 2]);
    assert!(writes.iter().all(|(t, _)| t == "dim_product"));
    assert!(coordinator.is_idle());
    assert_eq!(
      metrics.rows_written.with_label_values(&["dim_product"]).get(),
      10
    );
  }

  #[tokio::test]
  async fn dropped_sender_stops_the_loop() {
    let writer = Arc::new(Recording::default());
    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let (tx, rx) = watch::channel(false);
    drop(tx);

    let coordinator = run_flush_loop(
      setup(100, 3),
      writer.clone(),
      metrics,
      Duration::from_millis(5),
      rx,
    )
    .await;
    assert!(coordinator.is_idle());
    assert_eq!(writer.writes.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn failed_writes_are_counted() {
    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    run_flush_loop(
      setup(2, 3),
      Arc::new(Failing),
      metrics.clone(),
      Duration::from_millis(5),
      rx,
    )
    .await;
    assert_eq!(
      metrics.write_errors.with_label_values(&["dim_product"]).get(),
      2
    );
  }
}
