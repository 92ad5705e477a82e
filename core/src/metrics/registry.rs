use prometheus::{
  Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};

use shared::metrics::labels::{LABEL_ERROR, LABEL_STREAM, LABEL_TABLE};

/// Central Prometheus metrics registry for the Ferry daemon.
pub struct MetricsRegistry {
  pub registry: Registry,
  // Processing metrics
  pub events_received: IntCounter,
  pub events_routed: IntCounterVec,
  pub events_dead_lettered: IntCounterVec,
  pub dead_letter_failures: IntCounter,
  pub sink_backpressure: IntCounterVec,
  // Egress metrics
  pub rows_written: IntCounterVec,
  pub write_errors: IntCounterVec,
  pub flush_latency: Histogram,
  // Buffer metrics
  pub ring_buffer_size: IntGaugeVec,
  pub ring_buffer_capacity: IntGaugeVec,
}

impl MetricsRegistry {
  pub fn new() -> anyhow::Result<Self> {
    let registry = Registry::new();

    let events_received = IntCounter::new(
      "ferry_events_received_total",
      "Total change events read from the source",
    )?;
    let events_routed = IntCounterVec::new(
      Opts::new(
        "ferry_events_routed_total",
        "Total records delivered to a destination stream",
      ),
      &[LABEL_TABLE],
    )?;
    let events_dead_lettered = IntCounterVec::new(
      Opts::new(
        "ferry_events_dead_lettered_total",
        "Total events sent to the dead-letter sink",
      ),
      &[LABEL_ERROR],
    )?;
    let dead_letter_failures = IntCounter::new(
      "ferry_dead_letter_failures_total",
      "Dead-letter publications that themselves failed",
    )?;
    let sink_backpressure = IntCounterVec::new(
      Opts::new(
        "ferry_sink_backpressure_total",
        "Records refused because a stream buffer was full",
      ),
      &[LABEL_STREAM],
    )?;

    let rows_written = IntCounterVec::new(
      Opts::new("ferry_rows_written_total", "Rows written to the OLAP store"),
      &[LABEL_STREAM],
    )?;
    let write_errors = IntCounterVec::new(
      Opts::new("ferry_write_errors_total", "Failed batch writes"),
      &[LABEL_STREAM],
    )?;
    let flush_latency = Histogram::with_opts(
      HistogramOpts::new("ferry_flush_latency_seconds", "Batch flush latency")
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
    )?;

    let ring_buffer_size = IntGaugeVec::new(
      Opts::new("ferry_ring_buffer_size", "Current stream buffer length"),
      &[LABEL_STREAM],
    )?;
    let ring_buffer_capacity = IntGaugeVec::new(
      Opts::new("ferry_ring_buffer_capacity", "Stream buffer capacity"),
      &[LABEL_STREAM],
    )?;

    registry.register(Box::new(events_received.clone()))?;
    registry.register(Box::new(events_routed.clone()))?;
    registry.register(Box::new(events_dead_lettered.clone()))?;
    registry.register(Box::new(dead_letter_failures.clone()))?;
    registry.register(Box::new(sink_backpressure.clone()))?;
    registry.register(Box::new(rows_written.clone()))?;
    registry.register(Box::new(write_errors.clone()))?;
    registry.register(Box::new(flush_latency.clone()))?;
    registry.register(Box::new(ring_buffer_size.clone()))?;
    registry.register(Box::new(ring_buffer_capacity.clone()))?;

    Ok(Self {
      registry,
      events_received,
      events_routed,
      events_dead_lettered,
      dead_letter_failures,
      sink_backpressure,
      rows_written,
      write_errors,
      flush_latency,
      ring_buffer_size,
      ring_buffer_capacity,
    })
  }

  /// Record the occupancy of one stream buffer.
  pub fn observe_buffer(&self, stream: &str, len: usize, capacity: usize) {
    self
      .ring_buffer_size
      .with_label_values(&[stream])
      .set(len as i64);
    self
      .ring_buffer_capacity
      .with_label_values(&[stream])
      .set(capacity as i64);
  }

  /// Encode all metrics in Prometheus text format.
  pub fn encode(&self) -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let families = self.registry.gather();
    let mut buf = Vec::new();
    encoder.encode(&families, &mut buf).unwrap_or_default();
    String::from_utf8(buf).unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn encodes_labelled_counters() {
    let metrics = MetricsRegistry::new().unwrap();
    metrics.events_received.inc();
    metrics
      .events_routed
      .with_label_values(&["customers"])
      .inc_by(2);
    metrics
      .events_dead_lettered
      .with_label_values(&["unknown_table"])
      .inc();
    metrics.observe_buffer("dim_customer", 3, 8);

    let text = metrics.encode();
    assert!(text.contains("ferry_events_received_total 1"));
    assert!(text.contains("ferry_events_routed_total{table=\"customers\"} 2"));
    assert!(text.contains("ferry_events_dead_lettered_total{error=\"unknown_table\"} 1"));
    assert!(text.contains("ferry_ring_buffer_size{stream=\"dim_customer\"} 3"));
  }
}
