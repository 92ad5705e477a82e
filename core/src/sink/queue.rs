use tracing::warn;

use shared::error::{FerryError, Result};
use shared::queue::RingBuffer;

use super::traits::Sink;
use crate::schema::AnalyticalRow;

/// Sink backed by a bounded ring buffer, drained by a stream's flush task.
///
/// A full buffer is reported as `SinkBackpressure` instead of waiting for
/// the flush task to catch up.
pub struct QueueSink {
  name: String,
  ring: RingBuffer<AnalyticalRow>,
}

impl QueueSink {
  pub fn new(name: impl Into<String>, capacity: usize) -> Self {
    Self {
      name: name.into(),
      ring: RingBuffer::new(capacity),
    }
  }

  /// Consumer handle for the flush task.
  pub fn buffer(&self) -> RingBuffer<AnalyticalRow> {
    self.ring.clone()
  }
}

impl Sink for QueueSink {
  fn name(&self) -> &str {
    &self.name
  }

  fn send(&self, row: AnalyticalRow) -> Result<()> {
    self.ring.try_push(row).map_err(|_| {
      warn!(stream = %self.name, pending = self.ring.len(), "sink buffer full");
      FerryError::SinkBackpressure {
        sink: self.name.clone(),
        pending: self.ring.len(),
      }
    })
  }
}
