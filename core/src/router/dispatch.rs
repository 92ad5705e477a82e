use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use shared::error::{FerryError, Result};
use shared::lsn::Lsn;

use super::registry::StreamRegistry;
use crate::schema::{
  build_record, AnalyticalRecord, AnalyticalRow, Customer, Order, OrderItem, Product, RecordKind,
};
use crate::sink::Sink;

/// Outcome of a successful route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
  pub table: String,
  pub destination: &'static str,
  pub stream: String,
  pub position: Lsn,
  pub deleted: bool,
}

/// Resolves a table name to a destination, builds the typed record and
/// publishes it.
pub trait Router: Send + Sync {
  /// Route one annotated payload.
  ///
  /// Fails with `UnknownTable` when nothing is registered for `table`,
  /// `SchemaValidation` when the normalized payload does not satisfy the
  /// record type, or whatever the sink reports when it refuses the record.
  fn route(&self, table: &str, payload: Map<String, Value>) -> Result<Routed>;
}

fn publish(table: &str, sink: &dyn Sink, row: AnalyticalRow) -> Result<Routed> {
  let routed = Routed {
    table: table.to_string(),
    destination: row.destination,
    stream: sink.name().to_string(),
    position: row.position,
    deleted: row.deleted,
  };
  sink.send(row)?;
  debug!(
    table,
    stream = %routed.stream,
    lsn = %routed.position,
    deleted = routed.deleted,
    "routed record"
  );
  Ok(routed)
}

// ── Registry lookup ────────────────────────────────────────────

/// Routes through the startup [`StreamRegistry`]; new tables only need a
/// new binding.
pub struct RegistryRouter {
  registry: Arc<StreamRegistry>,
}

impl RegistryRouter {
  pub fn new(registry: Arc<StreamRegistry>) -> Self {
    Self { registry }
  }

  pub fn registry(&self) -> &StreamRegistry {
    &self.registry
  }
}

impl Router for RegistryRouter {
  fn route(&self, table: &str, payload: Map<String, Value>) -> Result<Routed> {
    let dest = self
      .registry
      .lookup(table)
      .ok_or_else(|| FerryError::UnknownTable(table.to_string()))?;
    let row = dest.kind.build(table, payload)?;
    publish(table, dest.sink.as_ref(), row)
  }
}

// ── Static dispatch ────────────────────────────────────────────

/// Sinks for the fixed set of built-in tables.
#[derive(Clone)]
pub struct StaticSinks {
  pub customers: Arc<dyn Sink>,
  pub products: Arc<dyn Sink>,
  pub orders: Arc<dyn Sink>,
  pub order_items: Arc<dyn Sink>,
}

/// Exhaustive match over the built-in source tables.
pub struct StaticRouter {
  sinks: StaticSinks,
}

impl StaticRouter {
  pub fn new(sinks: StaticSinks) -> Self {
    Self { sinks }
  }

  fn deliver<T: AnalyticalRecord>(
    &self,
    table: &str,
    sink: &dyn Sink,
    payload: Map<String, Value>,
  ) -> Result<Routed> {
    let record: T = build_record(table, payload)?;
    publish(table, sink, AnalyticalRow::from_record(&record)?)
  }
}

impl Router for StaticRouter {
  fn route(&self, table: &str, payload: Map<String, Value>) -> Result<Routed> {
    match table {
      "customers" => self.deliver::<Customer>(table, self.sinks.customers.as_ref(), payload),
      "products" => self.deliver::<Product>(table, self.sinks.products.as_ref(), payload),
      "orders" => self.deliver::<Order>(table, self.sinks.orders.as_ref(), payload),
      "order_items" => self.deliver::<OrderItem>(table, self.sinks.order_items.as_ref(), payload),
      other => Err(FerryError::UnknownTable(other.to_string())),
    }
  }
}

impl StaticSinks {
  /// The sink for a built-in table, if `kind` is one of them.
  pub fn for_kind(&self, kind: &RecordKind) -> Option<Arc<dyn Sink>> {
    match kind.table().name {
      n if n == Customer::table().name => Some(self.customers.clone()),
      n if n == Product::table().name => Some(self.products.clone()),
      n if n == Order::table().name => Some(self.orders.clone()),
      n if n == OrderItem::table().name => Some(self.order_items.clone()),
      _ => None,
    }
  }
}
