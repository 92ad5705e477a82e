use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::warn;

use shared::error::{FerryError, Result};

use super::entry::DeadLetterEntry;

/// The fixed fallback destination for events that could not be routed.
pub trait DeadLetterSink: Send + Sync {
  fn send(&self, entry: DeadLetterEntry) -> Result<()>;
}

/// Bounded in-memory dead-letter queue.
///
/// Entries stay here for inspection or replay. When full, the oldest entry
/// is evicted.
pub struct DeadLetterQueue {
  inner: Mutex<QueueState>,
  max_size: usize,
}

struct QueueState {
  queue: VecDeque<DeadLetterEntry>,
  total_entries: u64,
}

impl DeadLetterQueue {
  pub fn new(max_size: usize) -> Self {
    Self {
      inner: Mutex::new(QueueState {
        queue: VecDeque::with_capacity(max_size.min(1024)),
        total_entries: 0,
      }),
      max_size,
    }
  }

  /// Drain all entries from the queue (for manual replay).
  pub fn drain_all(&self) -> Vec<DeadLetterEntry> {
    self.inner.lock().unwrap().queue.drain(..).collect()
  }

  /// Snapshot of the queued entries, oldest first.
  pub fn entries(&self) -> Vec<DeadLetterEntry> {
    self.inner.lock().unwrap().queue.iter().cloned().collect()
  }

  pub fn len(&self) -> usize {
    self.inner.lock().unwrap().queue.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Total entries ever added, including evicted ones.
  pub fn total_entries(&self) -> u64 {
    self.inner.lock().unwrap().total_entries
  }
}

impl DeadLetterSink for DeadLetterQueue {
  fn send(&self, entry: DeadLetterEntry) -> Result<()> {
    let mut state = self.inner.lock().unwrap();
    if state.queue.len() >= self.max_size {
      state.queue.pop_front();
      warn!("DLQ full, evicting oldest entry");
    }
    state.queue.push_back(entry);
    state.total_entries += 1;
    Ok(())
  }
}

/// Appends every entry as a JSON line to a file.
pub struct JsonLinesDeadLetter {
  out: Mutex<BufWriter<File>>,
}

impl JsonLinesDeadLetter {
  pub fn open(path: &Path) -> Result<Self> {
    let file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(path)
      .map_err(|e| FerryError::DeadLetterFailed(Box::new(e)))?;
    Ok(Self {
      out: Mutex::new(BufWriter::new(file)),
    })
  }
}

impl DeadLetterSink for JsonLinesDeadLetter {
  fn send(&self, entry: DeadLetterEntry) -> Result<()> {
    let mut out = self.out.lock().unwrap();
    serde_json::to_writer(&mut *out, &entry)
      .map_err(std::io::Error::from)
      .and_then(|_| out.write_all(b"\n"))
      .and_then(|_| out.flush())
      .map_err(|e| FerryError::DeadLetterFailed(Box::new(e)))
  }
}

/// Sends each entry to every inner sink; fails if any of them fails, after
/// trying all of them.
pub struct FanoutDeadLetter {
  sinks: Vec<Arc<dyn DeadLetterSink>>,
}

impl FanoutDeadLetter {
  pub fn new(sinks: Vec<Arc<dyn DeadLetterSink>>) -> Self {
    Self { sinks }
  }
}

impl DeadLetterSink for FanoutDeadLetter {
  fn send(&self, entry: DeadLetterEntry) -> Result<()> {
    let mut first_err = None;
    for sink in &self.sinks {
      if let Err(e) = sink.send(entry.clone()) {
        first_err.get_or_insert(e);
      }
    }
    first_err.map_or(Ok(()), Err)
  }
}
