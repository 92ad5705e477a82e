use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use shared::error::FerryError;
use shared::event::{OpType, RawCdcEvent};

/// A failed event as published to the dead-letter sink.
///
/// `event` is the original input exactly as received, never the partially
/// transformed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
  pub event: Value,
  /// `FerryError::kind` of the failure.
  pub error_kind: String,
  pub error: String,
  pub table: Option<String>,
  pub operation: Option<OpType>,
  pub failed_at: DateTime<Utc>,
}

impl DeadLetterEntry {
  /// Entry for an envelope that parsed but failed later.
  pub fn from_event(event: &RawCdcEvent, err: &FerryError) -> Self {
    Self {
      event: serde_json::to_value(event).unwrap_or(Value::Null),
      error_kind: err.kind().to_string(),
      error: error_chain(err),
      table: Some(event.table().to_string()),
      operation: Some(event.operation()),
      failed_at: Utc::now(),
    }
  }

  /// Replace the stored event with the input line it was decoded from, so
  /// a flattened envelope keeps its received shape.
  pub fn with_original(mut self, raw: &str) -> Self {
    if let Ok(value) = serde_json::from_str(raw) {
      self.event = value;
    }
    self
  }

  /// Entry for input that never became a valid envelope. JSON input is kept
  /// as decoded; anything else is kept as a string.
  pub fn from_raw(raw: &str, err: &FerryError) -> Self {
    let event = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Self {
      event,
      error_kind: err.kind().to_string(),
      error: error_chain(err),
      table: None,
      operation: None,
      failed_at: Utc::now(),
    }
  }

  /// The original event, if the entry holds a valid envelope.
  pub fn original(&self) -> Option<RawCdcEvent> {
    RawCdcEvent::from_value(self.event.clone()).ok()
  }
}

/// `Display` of the error followed by its sources.
fn error_chain(err: &FerryError) -> String {
  let mut msg = err.to_string();
  let mut source = std::error::Error::source(err);
  while let Some(cause) = source {
    msg.push_str(": ");
    msg.push_str(&cause.to_string());
    source = cause.source();
  }
  msg
}
