use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use shared::error::{FerryError, Result};

use crate::schema::{RecordKind, StreamBinding};
use crate::sink::Sink;

/// A registered destination: where records for a source table go and which
/// record type they are validated against.
#[derive(Clone)]
pub struct Destination {
  pub sink: Arc<dyn Sink>,
  pub kind: RecordKind,
}

/// Source table name → destination.
///
/// Built once at startup through [`StreamRegistryBuilder`] and read-only
/// afterwards, so lookups from concurrent workers need no locking. Names
/// are matched exactly and case-sensitively.
pub struct StreamRegistry {
  streams: HashMap<String, Destination>,
}

impl StreamRegistry {
  pub fn builder() -> StreamRegistryBuilder {
    StreamRegistryBuilder {
      streams: HashMap::new(),
    }
  }

  /// Register every binding, asking `sink_for` for its sink.
  pub fn from_bindings<F>(bindings: &[StreamBinding], mut sink_for: F) -> Result<Self>
  where
    F: FnMut(&StreamBinding) -> Result<Arc<dyn Sink>>,
  {
    let mut builder = Self::builder();
    for binding in bindings {
      let sink = sink_for(binding)?;
      builder.register(binding.source_table, sink, binding.kind)?;
    }
    Ok(builder.build())
  }

  /// Look up the destination for a source table.
  pub fn lookup(&self, table: &str) -> Option<&Destination> {
    self.streams.get(table)
  }

  /// Registered source tables, sorted.
  pub fn table_names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.streams.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }

  pub fn len(&self) -> usize {
    self.streams.len()
  }

  pub fn is_empty(&self) -> bool {
    self.streams.is_empty()
  }
}

/// Startup-only mutable view of a [`StreamRegistry`].
pub struct StreamRegistryBuilder {
  streams: HashMap<String, Destination>,
}

impl StreamRegistryBuilder {
  /// Register a destination for `table`. Registering the same table twice
  /// is an error.
  pub fn register(
    &mut self,
    table: &str,
    sink: Arc<dyn Sink>,
    kind: RecordKind,
  ) -> Result<&mut Self> {
    if self.streams.contains_key(table) {
      return Err(FerryError::DuplicateStream(table.to_string()));
    }
    debug!(
      table,
      stream = sink.name(),
      record = kind.name(),
      "registered stream"
    );
    self
      .streams
      .insert(table.to_string(), Destination { sink, kind });
    Ok(self)
  }

  pub fn build(self) -> StreamRegistry {
    info!(streams = self.streams.len(), "stream registry sealed");
    StreamRegistry {
      streams: self.streams,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::{bindings, Customer};
  use crate::sink::MemorySink;

  #[test]
  fn registers_all_bindings() {
    let registry = StreamRegistry::from_bindings(&bindings(), |b| {
      Ok(Arc::new(MemorySink::new(b.kind.table().name)) as Arc<dyn Sink>)
    })
    .unwrap();
    assert_eq!(
      registry.table_names(),
      ["customers", "order_items", "orders", "products"]
    );
    let dest = registry.lookup("order_items").unwrap();
    assert_eq!(dest.sink.name(), "fact_order_item");
    assert_eq!(dest.kind.name(), "OrderItem");
  }

  #[test]
  fn lookup_is_exact() {
    let registry = StreamRegistry::from_bindings(&bindings(), |_| {
      Ok(Arc::new(MemorySink::new("s")) as Arc<dyn Sink>)
    })
    .unwrap();
    assert!(registry.lookup("warehouses").is_none());
    assert!(registry.lookup("Customers").is_none());
    assert!(registry.lookup("customers ").is_none());
  }

  #[test]
  fn duplicate_registration_fails() {
    let sink: Arc<dyn Sink> = Arc::new(MemorySink::new("s"));
    let mut builder = StreamRegistry::builder();
    builder
      .register("customers", sink.clone(), RecordKind::of::<Customer>())
      .unwrap();
    let err = builder
      .register("customers", sink, RecordKind::of::<Customer>())
      .err()
      .unwrap();
    assert!(matches!(err, FerryError::DuplicateStream(t) if t == "customers"));
  }
}
