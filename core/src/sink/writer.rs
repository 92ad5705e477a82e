use std::io::Write;
use std::sync::Mutex;

use serde_json::json;

use shared::error::{FerryError, Result};

use super::traits::Sink;
use crate::schema::AnalyticalRow;

/// Writes each record as one JSON line tagged with its destination table.
///
/// Used for the `stdout` sink kind when no OLAP store is attached.
pub struct JsonLinesSink<W: Write + Send> {
  name: String,
  out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
  pub fn new(name: impl Into<String>, out: W) -> Self {
    Self {
      name: name.into(),
      out: Mutex::new(out),
    }
  }

  pub fn into_inner(self) -> W {
    self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl<W: Write + Send> Sink for JsonLinesSink<W> {
  fn name(&self) -> &str {
    &self.name
  }

  fn send(&self, row: AnalyticalRow) -> Result<()> {
    let line = json!({ "table": row.destination, "row": row.data });
    let mut out = self.out.lock().unwrap();
    serde_json::to_writer(&mut *out, &line)
      .map_err(std::io::Error::from)
      .and_then(|_| out.write_all(b"\n"))
      .and_then(|_| out.flush())
      .map_err(|e| FerryError::SinkRejected {
        sink: self.name.clone(),
        reason: e.to_string(),
      })
  }
}
