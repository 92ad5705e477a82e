use std::sync::Mutex;

use shared::error::Result;

use super::traits::Sink;
use crate::schema::AnalyticalRow;

/// Collects every record it receives. Useful for tests and dry runs.
pub struct MemorySink {
  name: String,
  rows: Mutex<Vec<AnalyticalRow>>,
}

impl MemorySink {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      rows: Mutex::new(Vec::new()),
    }
  }

  /// Snapshot of the records received so far.
  pub fn rows(&self) -> Vec<AnalyticalRow> {
    self.rows.lock().unwrap().clone()
  }

  /// Remove and return all records.
  pub fn take(&self) -> Vec<AnalyticalRow> {
    std::mem::take(&mut *self.rows.lock().unwrap())
  }

  pub fn len(&self) -> usize {
    self.rows.lock().unwrap().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl Sink for MemorySink {
  fn name(&self) -> &str {
    &self.name
  }

  fn send(&self, row: AnalyticalRow) -> Result<()> {
    self.rows.lock().unwrap().push(row);
    Ok(())
  }
}
