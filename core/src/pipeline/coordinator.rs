use tracing::debug;

use shared::queue::RingBuffer;

use super::batch::RowBatch;
use super::flush::FlushPolicy;
use crate::schema::AnalyticalRow;

/// Drains one stream's ring buffer into row batches: ring buffer → batch →
/// flush.
///
/// Owned by the stream's flush task. Batches never exceed the policy's row
/// threshold; anything beyond it stays in the ring for the next batch.
pub struct StreamCoordinator {
  stream: String,
  ring: RingBuffer<AnalyticalRow>,
  flush_policy: FlushPolicy,
  current_batch: RowBatch,
  rows_drained: u64,
  batches_flushed: u64,
}

impl StreamCoordinator {
  pub fn new(
    stream: impl Into<String>,
    ring: RingBuffer<AnalyticalRow>,
    flush_policy: FlushPolicy,
  ) -> Self {
    Self {
      stream: stream.into(),
      ring,
      flush_policy,
      current_batch: RowBatch::new(),
      rows_drained: 0,
      batches_flushed: 0,
    }
  }

  pub fn stream(&self) -> &str {
    &self.stream
  }

  /// Move buffered rows into the current batch, up to the row threshold.
  ///
  /// Returns the number of rows moved.
  pub fn drain_ring(&mut self) -> usize {
    let mut count = 0;
    while count < self.flush_policy.remaining() {
      match self.ring.try_pop() {
        Some(row) => {
          self.current_batch.push(row);
          count += 1;
        }
        None => break,
      }
    }
    self.flush_policy.accumulate(count);
    self.rows_drained += count as u64;
    count
  }

  /// Take the current batch if the flush policy says so.
  pub fn maybe_flush(&mut self) -> Option<RowBatch> {
    if self.flush_policy.should_flush() {
      self.take_batch()
    } else {
      None
    }
  }

  /// Take the current batch regardless of the policy.
  pub fn force_flush(&mut self) -> Option<RowBatch> {
    self.take_batch()
  }

  fn take_batch(&mut self) -> Option<RowBatch> {
    if self.current_batch.is_empty() {
      return None;
    }
    let batch = std::mem::take(&mut self.current_batch);
    self.flush_policy.mark_flushed();
    self.batches_flushed += 1;

    debug!(
      stream = %self.stream,
      rows = batch.len(),
      deletes = batch.deletes(),
      min_lsn = %batch.min_position(),
      max_lsn = %batch.max_position(),
      "flushing batch"
    );

    Some(batch)
  }

  /// Nothing buffered and nothing pending.
  pub fn is_idle(&self) -> bool {
    self.current_batch.is_empty() && self.ring.is_empty()
  }

  pub fn rows_drained(&self) -> u64 {
    self.rows_drained
  }

  pub fn batches_flushed(&self) -> u64 {
    self.batches_flushed
  }

  pub fn ring_len(&self) -> usize {
    self.ring.len()
  }

  pub fn ring_capacity(&self) -> usize {
    self.ring.capacity()
  }
}
