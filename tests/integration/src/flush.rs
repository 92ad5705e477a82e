#![cfg(test)]
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::watch;

use ferry_core::deadletter::{DeadLetterQueue, Escalation};
use ferry_core::metrics::MetricsRegistry;
use ferry_core::pipeline::{
  run_flush_loop, BatchWriter, CdcProcessor, FlushPolicy, RowBatch, StreamCoordinator,
};
use ferry_core::router::{RegistryRouter, StreamRegistry};
use ferry_core::schema::{AnalyticalRecord, Customer, RecordKind};
use ferry_core::sink::QueueSink;

/// Keeps every JSONEachRow body it is handed, per table.
#[derive(Default)]
struct CapturingWriter {
  bodies: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl BatchWriter for CapturingWriter {
  async fn write(&self, table: &str, batch: &RowBatch) -> anyhow::Result<()> {
    let body = String::from_utf8(batch.to_json_each_row()?)?;
    self.bodies.lock().unwrap().push((table.to_string(), body));
    Ok(())
  }
}

fn customer_line(id: u64, op: &str) -> String {
  json!({
    "metadata": {"table": "customers", "operation": op, "lsn": format!("0/{id:X}")},
    "payload": {"id": id, "email": null, "name": "n", "country": "c", "city": "t",
                "createdAt": "2024-01-01T00:00:00Z"}
  })
  .to_string()
}

#[tokio::test]
async fn queued_rows_reach_the_writer_in_batches() {
  let name = Customer::table().name;
  let queue = Arc::new(QueueSink::new(name, 64));
  let mut builder = StreamRegistry::builder();
  builder
    .register(Customer::SOURCE_TABLE, queue.clone(), RecordKind::of::<Customer>())
    .unwrap();
  let metrics = Arc::new(MetricsRegistry::new().unwrap());
  let escalation = Escalation::new(Arc::new(DeadLetterQueue::new(8)), metrics.clone());
  let processor = CdcProcessor::new(
    Arc::new(RegistryRouter::new(Arc::new(builder.build()))),
    escalation,
    metrics.clone(),
  );

  let writer = Arc::new(CapturingWriter::default());
  let (tx, rx) = watch::channel(false);
  let coordinator = StreamCoordinator::new(
    name,
    queue.buffer(),
    FlushPolicy::new(3, Duration::from_secs(3600)),
  );
  let handle = tokio::spawn(run_flush_loop(
    coordinator,
    writer.clone(),
    metrics.clone(),
    Duration::from_millis(5),
    rx,
  ));

  for id in 1..=7 {
    let op = if id == 7 { "delete" } else { "insert" };
    processor.process_line(&customer_line(id, op)).unwrap();
  }
  tokio::time::sleep(Duration::from_millis(50)).await;
  tx.send(true).unwrap();
  handle.await.unwrap();

  let bodies = writer.bodies.lock().unwrap().clone();
  assert!(bodies.iter().all(|(table, _)| table == "dim_customer"));
  let rows: Vec<Value> = bodies
    .iter()
    .flat_map(|(_, body)| body.lines().map(|l| serde_json::from_str(l).unwrap()))
    .collect();
  assert_eq!(rows.len(), 7);
  assert!(bodies.iter().all(|(_, body)| body.lines().count() <= 3));

  let last = rows.iter().find(|r| r["id"] == 7).unwrap();
  assert_eq!(last["isDeleted"], 1);
  assert_eq!(last["email"], "");
  assert_eq!(last["position"], 7);
  assert_eq!(
    metrics.rows_written.with_label_values(&[name]).get(),
    7
  );
}
