use std::sync::Arc;

use tracing::{error, warn};

use shared::error::FerryError;
use shared::event::RawCdcEvent;

use super::entry::DeadLetterEntry;
use super::queue::DeadLetterSink;
use crate::metrics::MetricsRegistry;

/// Failure path for a single event: log it, publish the original event to
/// the dead-letter sink, hand the error back.
///
/// A failure of the dead-letter sink itself is logged and counted but never
/// replaces the original error.
#[derive(Clone)]
pub struct Escalation {
  sink: Arc<dyn DeadLetterSink>,
  metrics: Arc<MetricsRegistry>,
}

impl Escalation {
  pub fn new(sink: Arc<dyn DeadLetterSink>, metrics: Arc<MetricsRegistry>) -> Self {
    Self { sink, metrics }
  }

  /// Escalate a failure for an envelope that parsed.
  pub fn escalate(&self, event: &RawCdcEvent, err: FerryError) -> FerryError {
    self.log_event(event, &err);
    self.publish(DeadLetterEntry::from_event(event, &err));
    err
  }

  /// Escalate a failure for an envelope decoded from `line`, keeping the
  /// line as the dead-lettered original.
  pub fn escalate_line(&self, line: &str, event: &RawCdcEvent, err: FerryError) -> FerryError {
    self.log_event(event, &err);
    self.publish(DeadLetterEntry::from_event(event, &err).with_original(line));
    err
  }

  fn log_event(&self, event: &RawCdcEvent, err: &FerryError) {
    error!(
      table = %event.table(),
      op = %event.operation(),
      lsn = %event.position(),
      payload = %event.payload,
      error = %err,
      "failed to process change event"
    );
  }

  /// Escalate a failure for input that never became an envelope.
  pub fn escalate_raw(&self, raw: &str, err: FerryError) -> FerryError {
    error!(input = %raw, error = %err, "failed to decode change event");
    self.publish(DeadLetterEntry::from_raw(raw, &err));
    err
  }

  fn publish(&self, entry: DeadLetterEntry) {
    let kind = entry.error_kind.clone();
    match self.sink.send(entry) {
      Ok(()) => {
        self
          .metrics
          .events_dead_lettered
          .with_label_values(&[kind.as_str()])
          .inc();
      }
      Err(e) => {
        self.metrics.dead_letter_failures.inc();
        warn!(error = %e, kind = %kind, "dead-letter publication failed");
      }
    }
  }
}
