#![cfg(test)]
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;

use ferry_core::deadletter::{
  DeadLetterQueue, DeadLetterSink, FanoutDeadLetter, JsonLinesDeadLetter,
};
use ferry_core::schema::{Customer, OrderItem, Product};
use shared::error::FerryError;
use shared::event::RawCdcEvent;

use crate::harness::{Harness, Mode};

fn envelope(table: &str, op: &str, lsn: &str, payload: Value) -> RawCdcEvent {
  RawCdcEvent::from_value(json!({
    "metadata": {"table": table, "operation": op, "lsn": lsn},
    "payload": payload,
  }))
  .unwrap()
}

#[test]
fn customer_delete_fills_defaults_and_sets_flag() {
  let h = Harness::new(Mode::Registry);
  let event = envelope(
    "customers",
    "delete",
    "0/5",
    json!({
      "id": 42, "email": null, "name": null, "country": null, "city": null,
      "createdAt": null
    }),
  );

  let routed = h.processor.process(&event).unwrap();
  assert_eq!(routed.destination, "dim_customer");
  assert!(routed.deleted);

  let rows = h.customers.rows();
  assert_eq!(rows.len(), 1);
  assert_eq!(
    rows[0].data,
    json!({
      "id": 42, "email": "", "name": "", "country": "", "city": "",
      "createdAt": "1970-01-01T00:00:00.000Z", "isDeleted": 1, "position": 5
    })
  );
  let customer: Customer = rows[0].decode().unwrap();
  assert_eq!(customer.created_at, Utc.timestamp_opt(0, 0).unwrap());
  assert!(h.dlq.is_empty());
}

#[test]
fn product_insert_keeps_business_fields() {
  let h = Harness::new(Mode::Registry);
  let event = envelope(
    "products",
    "insert",
    "1/A",
    json!({
      "id": 3, "name": "Desk", "category": "office", "price": "249.90",
      "createdAt": "2024-05-01 08:15:00"
    }),
  );

  let routed = h.processor.process(&event).unwrap();
  assert_eq!(routed.position.get(), 0x1_0000_000A);

  let product: Product = h.products.rows()[0].decode().unwrap();
  assert_eq!(product.id, 3);
  assert_eq!(product.name, "Desk");
  assert_eq!(product.category, "office");
  assert_eq!(product.price, Decimal::from_str("249.90").unwrap());
  assert_eq!(
    product.created_at,
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 15, 0).unwrap()
  );
  assert_eq!(product.cdc.is_deleted, 0);
  assert_eq!(product.cdc.position, 0x1_0000_000A);
  assert_eq!(h.typed_total(), 1);
}

#[test]
fn unknown_table_goes_only_to_dead_letter() {
  for mode in [Mode::Registry, Mode::Static] {
    let h = Harness::new(mode);
    let event = envelope("warehouses", "insert", "0/10", json!({"id": 1, "name": "north"}));

    let err = h.processor.process(&event).unwrap_err();
    assert!(matches!(err, FerryError::UnknownTable(ref t) if t == "warehouses"));

    let entries = h.dlq.drain_all();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].original(), Some(event));
    assert_eq!(entries[0].error_kind, "unknown_table");
    assert_eq!(h.typed_total(), 0);
  }
}

#[test]
fn malformed_position_is_dead_lettered_untouched() {
  let h = Harness::new(Mode::Registry);
  let payload = json!({"id": 9, "customerId": 1, "orderDate": "2024-01-01T00:00:00Z", "total": "5"});
  let event = envelope("orders", "update", "0/5G", payload.clone());

  let err = h.processor.process(&event).unwrap_err();
  assert_eq!(err.kind(), "malformed_position");
  let entry = &h.dlq.drain_all()[0];
  assert_eq!(entry.event["payload"], payload);
  assert!(entry.event["payload"].get("isDeleted").is_none());
  assert_eq!(h.typed_total(), 0);
}

#[test]
fn schema_violation_is_dead_lettered() {
  let h = Harness::new(Mode::Static);
  let line = json!({
    "metadata": {"table": "order_items", "operation": "insert", "lsn": "0/1"},
    "payload": {"id": 1, "orderId": 2, "productId": 3, "quantity": "many", "price": "1.00"}
  })
  .to_string();

  let err = h.processor.process_line(&line).unwrap_err();
  assert_eq!(err.kind(), "schema_validation");
  assert_eq!(h.dlq.len(), 1);
  assert!(h.order_items.is_empty());
}

#[test]
fn both_routing_modes_produce_the_same_records() {
  let lines: Vec<String> = vec![
    json!({"metadata": {"table": "customers", "operation": "read", "lsn": "0/1"},
           "payload": {"id": 1, "email": "a@b.c", "name": "Ann", "country": "NO",
                       "city": "Oslo", "createdAt": "2023-01-01T00:00:00Z"}}),
    json!({"metadata": {"table": "orders", "operation": "insert", "lsn": "0/2"},
           "payload": {"id": 5, "customerId": 1, "orderDate": "2023-02-01T10:00:00Z",
                       "total": "12.50"}}),
    json!({"_metadata": {"table": "order_items", "operation": "update", "lsn": "0/3"},
           "id": 6, "orderId": 5, "productId": 3, "quantity": 2, "price": "6.25"}),
    json!({"metadata": {"table": "products", "operation": "delete", "lsn": "0/4"},
           "payload": {"id": 3}}),
    json!({"metadata": {"table": "warehouses", "operation": "insert", "lsn": "0/5"},
           "payload": {}}),
  ]
  .into_iter()
  .map(|v| v.to_string())
  .collect();

  let registry = Harness::new(Mode::Registry);
  let fixed = Harness::new(Mode::Static);
  for line in &lines {
    let a = registry.processor.process_line(line).map_err(|e| e.kind());
    let b = fixed.processor.process_line(line).map_err(|e| e.kind());
    assert_eq!(a, b);
  }

  for sink in ["dim_customer", "dim_product", "dim_order", "fact_order_item"] {
    let a: Vec<Value> = registry.sink(sink).rows().into_iter().map(|r| r.data).collect();
    let b: Vec<Value> = fixed.sink(sink).rows().into_iter().map(|r| r.data).collect();
    assert_eq!(a, b, "{sink}");
  }
  assert_eq!(registry.typed_total(), 3);
  assert_eq!(registry.dlq.len(), 2);

  let order_item: OrderItem = registry.order_items.rows()[0].decode().unwrap();
  assert_eq!(order_item.quantity, 2);
  assert_eq!(order_item.cdc.position, 3);
}

#[test]
fn reprocessing_yields_identical_records() {
  let h = Harness::new(Mode::Registry);
  let event = envelope(
    "customers",
    "update",
    "A/0",
    json!({"id": 7, "email": "x@y.z", "name": "Xi", "country": "SE", "city": "Lund",
           "createdAt": "2022-06-01T00:00:00Z"}),
  );
  h.processor.process(&event).unwrap();
  h.processor.process(&event).unwrap();

  let rows = h.customers.take();
  assert_eq!(rows.len(), 2);
  assert_eq!(rows[0], rows[1]);
  assert_eq!(rows[0].data["position"], json!(0xA_0000_0000u64));
}

#[test]
fn concurrent_workers_share_one_processor() {
  let h = Arc::new(Harness::new(Mode::Registry));
  std::thread::scope(|scope| {
    for worker in 0..4u64 {
      let h = h.clone();
      scope.spawn(move || {
        for i in 0..50u64 {
          let id = worker * 1000 + i;
          let table = if i % 2 == 0 { "customers" } else { "warehouses" };
          let event = envelope(
            table,
            "insert",
            &format!("0/{:X}", id + 1),
            json!({"id": id, "email": "e", "name": "n", "country": "c", "city": "t",
                   "createdAt": "2024-01-01T00:00:00Z"}),
          );
          let _ = h.processor.process(&event);
        }
      });
    }
  });

  assert_eq!(h.customers.len(), 100);
  assert_eq!(h.dlq.len(), 100);
  assert_eq!(h.metrics.events_received.get(), 200);
  assert_eq!(
    h.metrics
      .events_dead_lettered
      .with_label_values(&["unknown_table"])
      .get(),
    100
  );
}

#[test]
fn dead_letter_file_receives_original_line() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("dead_letter.jsonl");
  let dlq = Arc::new(DeadLetterQueue::new(8));
  let memory: Arc<dyn DeadLetterSink> = dlq.clone();
  let file: Arc<dyn DeadLetterSink> = Arc::new(JsonLinesDeadLetter::open(&path).unwrap());
  let h = Harness::with_dead_letter(
    Mode::Registry,
    dlq.clone(),
    Arc::new(FanoutDeadLetter::new(vec![memory, file])),
  );

  assert!(h.processor.process_line("{\"metadata\": 3}").is_err());
  assert!(h.processor.process_line("").is_err());

  let written = std::fs::read_to_string(&path).unwrap();
  let entries: Vec<Value> = written
    .lines()
    .map(|l| serde_json::from_str(l).unwrap())
    .collect();
  assert_eq!(entries.len(), 2);
  assert_eq!(entries[0]["event"], json!({"metadata": 3}));
  assert_eq!(entries[0]["error_kind"], "invalid_envelope");
  assert_eq!(entries[1]["event"], json!(""));
  assert_eq!(dlq.len(), 2);
}
