//! The built-in destination records for the shop database: customer,
//! product and order dimensions plus the order-item fact.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::field::{ColumnRange, FieldSpec, FieldType, RecordSchema};
use super::record::{timestamp, AnalyticalRecord, CdcAnnotation, RecordKind};
use super::table::DestinationTable;

const DATETIME: &str = "DateTime64(3, 'UTC')";
const LOW_CARDINALITY: &str = "LowCardinality(String)";

const fn timestamp_field(name: &'static str) -> FieldSpec {
  FieldSpec::required(name, FieldType::Timestamp, DATETIME).with_range(ColumnRange::DateTime64)
}

const fn money_field(name: &'static str, column_type: &'static str, precision: u32) -> FieldSpec {
  FieldSpec::required(name, FieldType::Decimal, column_type)
    .with_range(ColumnRange::Decimal { precision, scale: 2 })
}

// ── Customer ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
  pub id: u64,
  pub email: String,
  pub name: String,
  pub country: String,
  pub city: String,
  #[serde(with = "timestamp")]
  pub created_at: DateTime<Utc>,
  #[serde(flatten)]
  pub cdc: CdcAnnotation,
}

const CUSTOMER_FIELDS: [FieldSpec; 6] = [
  FieldSpec::required("id", FieldType::Integer, "UInt64"),
  FieldSpec::required("email", FieldType::Text, "String"),
  FieldSpec::required("name", FieldType::Text, "String"),
  FieldSpec::required("country", FieldType::Text, LOW_CARDINALITY),
  FieldSpec::required("city", FieldType::Text, "String"),
  timestamp_field("createdAt"),
];

static CUSTOMER_SCHEMA: RecordSchema = RecordSchema {
  name: "Customer",
  fields: &CUSTOMER_FIELDS,
};

static DIM_CUSTOMER: DestinationTable = DestinationTable {
  name: "dim_customer",
  order_by: &["id"],
};

impl AnalyticalRecord for Customer {
  const SOURCE_TABLE: &'static str = "customers";

  fn schema() -> &'static RecordSchema {
    &CUSTOMER_SCHEMA
  }

  fn table() -> &'static DestinationTable {
    &DIM_CUSTOMER
  }

  fn cdc(&self) -> &CdcAnnotation {
    &self.cdc
  }
}

// ── Product ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: u64,
  pub name: String,
  pub category: String,
  pub price: Decimal,
  #[serde(with = "timestamp")]
  pub created_at: DateTime<Utc>,
  #[serde(flatten)]
  pub cdc: CdcAnnotation,
}

const PRODUCT_FIELDS: [FieldSpec; 5] = [
  FieldSpec::required("id", FieldType::Integer, "UInt64"),
  FieldSpec::required("name", FieldType::Text, "String"),
  FieldSpec::required("category", FieldType::Text, LOW_CARDINALITY),
  money_field("price", "Decimal(10, 2)", 10),
  timestamp_field("createdAt"),
];

static PRODUCT_SCHEMA: RecordSchema = RecordSchema {
  name: "Product",
  fields: &PRODUCT_FIELDS,
};

static DIM_PRODUCT: DestinationTable = DestinationTable {
  name: "dim_product",
  order_by: &["id"],
};

impl AnalyticalRecord for Product {
  const SOURCE_TABLE: &'static str = "products";

  fn schema() -> &'static RecordSchema {
    &PRODUCT_SCHEMA
  }

  fn table() -> &'static DestinationTable {
    &DIM_PRODUCT
  }

  fn cdc(&self) -> &CdcAnnotation {
    &self.cdc
  }
}

// ── Order ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: u64,
  pub customer_id: u64,
  #[serde(with = "timestamp")]
  pub order_date: DateTime<Utc>,
  /// Orders are created as `pending`; the column may be left out of the row.
  #[serde(default = "default_order_status")]
  pub status: String,
  pub total: Decimal,
  #[serde(flatten)]
  pub cdc: CdcAnnotation,
}

fn default_order_status() -> String {
  "pending".to_string()
}

const ORDER_FIELDS: [FieldSpec; 5] = [
  FieldSpec::required("id", FieldType::Integer, "UInt64"),
  FieldSpec::required("customerId", FieldType::Integer, "UInt64"),
  timestamp_field("orderDate"),
  FieldSpec::required("status", FieldType::Text, LOW_CARDINALITY),
  money_field("total", "Decimal(12, 2)", 12),
];

static ORDER_SCHEMA: RecordSchema = RecordSchema {
  name: "Order",
  fields: &ORDER_FIELDS,
};

static DIM_ORDER: DestinationTable = DestinationTable {
  name: "dim_order",
  order_by: &["id"],
};

impl AnalyticalRecord for Order {
  const SOURCE_TABLE: &'static str = "orders";

  fn schema() -> &'static RecordSchema {
    &ORDER_SCHEMA
  }

  fn table() -> &'static DestinationTable {
    &DIM_ORDER
  }

  fn cdc(&self) -> &CdcAnnotation {
    &self.cdc
  }
}

// ── OrderItem ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub id: u64,
  pub order_id: u64,
  pub product_id: u64,
  pub quantity: u8,
  pub price: Decimal,
  #[serde(flatten)]
  pub cdc: CdcAnnotation,
}

const ORDER_ITEM_FIELDS: [FieldSpec; 5] = [
  FieldSpec::required("id", FieldType::Integer, "UInt64"),
  FieldSpec::required("orderId", FieldType::Integer, "UInt64"),
  FieldSpec::required("productId", FieldType::Integer, "UInt64"),
  FieldSpec::required("quantity", FieldType::Integer, "UInt8"),
  money_field("price", "Decimal(10, 2)", 10),
];

static ORDER_ITEM_SCHEMA: RecordSchema = RecordSchema {
  name: "OrderItem",
  fields: &ORDER_ITEM_FIELDS,
};

static FACT_ORDER_ITEM: DestinationTable = DestinationTable {
  name: "fact_order_item",
  order_by: &["id", "orderId", "productId"],
};

impl AnalyticalRecord for OrderItem {
  const SOURCE_TABLE: &'static str = "order_items";

  fn schema() -> &'static RecordSchema {
    &ORDER_ITEM_SCHEMA
  }

  fn table() -> &'static DestinationTable {
    &FACT_ORDER_ITEM
  }

  fn cdc(&self) -> &CdcAnnotation {
    &self.cdc
  }
}

// ── Bindings ───────────────────────────────────────────────────

/// One row of the startup routing table: source table → record type.
#[derive(Debug, Clone, Copy)]
pub struct StreamBinding {
  pub source_table: &'static str,
  pub kind: RecordKind,
}

impl StreamBinding {
  pub fn of<T: AnalyticalRecord>() -> Self {
    Self {
      source_table: T::SOURCE_TABLE,
      kind: RecordKind::of::<T>(),
    }
  }
}

/// Every built-in destination, in registration order.
pub fn bindings() -> [StreamBinding; 4] {
  [
    StreamBinding::of::<Customer>(),
    StreamBinding::of::<Product>(),
    StreamBinding::of::<Order>(),
    StreamBinding::of::<OrderItem>(),
  ]
}
