use std::sync::Arc;

use tracing::trace;

use shared::error::{FerryError, Result};
use shared::event::RawCdcEvent;

use crate::deadletter::Escalation;
use crate::metrics::MetricsRegistry;
use crate::router::{Routed, Router};
use crate::transform::transform;

/// Top of per-event processing: transform, route, and on any failure
/// escalate to the dead-letter sink.
///
/// Each call runs start to finish on the caller's thread. The processor
/// holds no per-event state, so a single instance can be shared across
/// workers.
pub struct CdcProcessor {
  router: Arc<dyn Router>,
  escalation: Escalation,
  metrics: Arc<MetricsRegistry>,
}

impl CdcProcessor {
  pub fn new(
    router: Arc<dyn Router>,
    escalation: Escalation,
    metrics: Arc<MetricsRegistry>,
  ) -> Self {
    Self {
      router,
      escalation,
      metrics,
    }
  }

  /// Process one decoded envelope.
  ///
  /// On success exactly one record reached a destination sink and nothing
  /// went to the dead-letter sink. On failure the original event has been
  /// dead-lettered and no destination sink saw a record.
  pub fn process(&self, event: &RawCdcEvent) -> Result<Routed> {
    self.handle(event, None)
  }

  /// Decode one serialized envelope and process it.
  pub fn process_line(&self, line: &str) -> Result<Routed> {
    match RawCdcEvent::from_json_str(line) {
      Ok(event) => self.handle(&event, Some(line)),
      Err(err) => {
        self.metrics.events_received.inc();
        Err(self.escalation.escalate_raw(line, err))
      }
    }
  }

  fn handle(&self, event: &RawCdcEvent, line: Option<&str>) -> Result<Routed> {
    self.metrics.events_received.inc();
    match self.run(event) {
      Ok(routed) => {
        self
          .metrics
          .events_routed
          .with_label_values(&[routed.table.as_str()])
          .inc();
        Ok(routed)
      }
      Err(err) => {
        self.observe_failure(&err);
        Err(match line {
          Some(line) => self.escalation.escalate_line(line, event, err),
          None => self.escalation.escalate(event, err),
        })
      }
    }
  }

  fn run(&self, event: &RawCdcEvent) -> Result<Routed> {
    let transformed = transform(event)?;
    trace!(table = %transformed.table, op = %transformed.operation, "routing event");
    let (table, payload) = transformed.into_parts();
    self.router.route(&table, payload)
  }

  fn observe_failure(&self, err: &FerryError) {
    if let FerryError::SinkBackpressure { sink, .. } = err {
      self
        .metrics
        .sink_backpressure
        .with_label_values(&[sink.as_str()])
        .inc();
    }
  }
}
