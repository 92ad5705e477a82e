mod flush;
mod pipeline;
mod settings;

/// Shared wiring for the end-to-end tests.
#[cfg(test)]
pub(crate) mod harness {
  use std::sync::Arc;

  use ferry_core::deadletter::{DeadLetterQueue, DeadLetterSink, Escalation};
  use ferry_core::metrics::MetricsRegistry;
  use ferry_core::pipeline::CdcProcessor;
  use ferry_core::router::{RegistryRouter, Router, StaticRouter, StaticSinks, StreamRegistry};
  use ferry_core::schema::{bindings, AnalyticalRecord, Customer, Order, OrderItem, Product};
  use ferry_core::sink::MemorySink;
  use shared::error::FerryError;

  pub struct Harness {
    pub customers: Arc<MemorySink>,
    pub products: Arc<MemorySink>,
    pub orders: Arc<MemorySink>,
    pub order_items: Arc<MemorySink>,
    pub dlq: Arc<DeadLetterQueue>,
    pub metrics: Arc<MetricsRegistry>,
    pub processor: CdcProcessor,
  }

  #[derive(Clone, Copy)]
  pub enum Mode {
    Registry,
    Static,
  }

  impl Harness {
    pub fn new(mode: Mode) -> Self {
      let dlq = Arc::new(DeadLetterQueue::new(1024));
      Self::with_dead_letter(mode, dlq.clone(), dlq)
    }

    pub fn with_dead_letter(
      mode: Mode,
      dlq: Arc<DeadLetterQueue>,
      dead_letter: Arc<dyn DeadLetterSink>,
    ) -> Self {
      let customers = Arc::new(MemorySink::new(Customer::table().name));
      let products = Arc::new(MemorySink::new(Product::table().name));
      let orders = Arc::new(MemorySink::new(Order::table().name));
      let order_items = Arc::new(MemorySink::new(OrderItem::table().name));
      let sinks = StaticSinks {
        customers: customers.clone(),
        products: products.clone(),
        orders: orders.clone(),
        order_items: order_items.clone(),
      };

      let router: Arc<dyn Router> = match mode {
        Mode::Static => Arc::new(StaticRouter::new(sinks)),
        Mode::Registry => {
          let registry = StreamRegistry::from_bindings(&bindings(), |b| {
            sinks
              .for_kind(&b.kind)
              .ok_or_else(|| FerryError::UnknownTable(b.source_table.to_string()))
          })
          .unwrap();
          Arc::new(RegistryRouter::new(Arc::new(registry)))
        }
      };

      let metrics = Arc::new(MetricsRegistry::new().unwrap());
      let escalation = Escalation::new(dead_letter, metrics.clone());
      let processor = CdcProcessor::new(router, escalation, metrics.clone());

      Self {
        customers,
        products,
        orders,
        order_items,
        dlq,
        metrics,
        processor,
      }
    }

    pub fn typed_total(&self) -> usize {
      self.customers.len() + self.products.len() + self.orders.len() + self.order_items.len()
    }

    pub fn sink(&self, name: &str) -> &MemorySink {
      match name {
        "dim_customer" => &self.customers,
        "dim_product" => &self.products,
        "dim_order" => &self.orders,
        "fact_order_item" => &self.order_items,
        other => panic!("no sink named {other}"),
      }
    }
  }
}
