//! Typed analytical records and their type-erased handle.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use shared::error::{FerryError, Result};
use shared::lsn::Lsn;

use super::field::{FieldSpec, FieldType, RecordSchema};
use super::normalize::normalize;
use super::table::DestinationTable;

/// CDC columns carried by every analytical record.
///
/// The destination keeps the row with the highest `position` per key and
/// hides rows whose `isDeleted` is 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdcAnnotation {
  #[serde(rename = "isDeleted")]
  pub is_deleted: u8,
  pub position: u64,
}

impl CdcAnnotation {
  /// Payload key of the soft-delete flag.
  pub const DELETED_KEY: &'static str = "isDeleted";
  /// Payload key of the decoded log position.
  pub const POSITION_KEY: &'static str = "position";

  pub const FIELDS: [FieldSpec; 2] = [
    FieldSpec::required(Self::DELETED_KEY, FieldType::Integer, "UInt8"),
    FieldSpec::required(Self::POSITION_KEY, FieldType::Integer, "UInt64"),
  ];

  pub fn lsn(&self) -> Lsn {
    Lsn::new(self.position)
  }

  pub fn is_deleted(&self) -> bool {
    self.is_deleted == 1
  }
}

/// A destination record type: business columns plus a flattened
/// [`CdcAnnotation`].
pub trait AnalyticalRecord: Serialize + DeserializeOwned + Send + 'static {
  /// Source table whose change events produce this record.
  const SOURCE_TABLE: &'static str;

  /// Business columns, used by the normalizer and for DDL.
  fn schema() -> &'static RecordSchema;

  /// Destination table this record is written to.
  fn table() -> &'static DestinationTable;

  fn cdc(&self) -> &CdcAnnotation;
}

/// Normalize `fields` against `T`'s schema and construct the record.
///
/// Any field still missing, of the wrong type or out of range for its column
/// fails with `SchemaValidation`.
pub fn build_record<T: AnalyticalRecord>(table: &str, fields: Map<String, Value>) -> Result<T> {
  let normalized = normalize(T::schema(), fields);
  for field in T::schema().fields {
    match normalized.get(field.name) {
      Some(value) if !value.is_null() => {
        field.range.check(value).map_err(|reason| {
          FerryError::schema_validation(table, format!("field `{}`: {reason}", field.name))
        })?;
      }
      _ => {}
    }
  }
  serde_json::from_value(Value::Object(normalized))
    .map_err(|e| FerryError::schema_validation(table, e))
}

/// A validated record in the shape its destination expects, as handed to a
/// sink.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticalRow {
  /// Destination table name.
  pub destination: &'static str,
  pub position: Lsn,
  pub deleted: bool,
  /// The record serialized field-for-field from its typed form.
  pub data: Value,
}

impl AnalyticalRow {
  pub fn from_record<T: AnalyticalRecord>(record: &T) -> Result<Self> {
    let data = serde_json::to_value(record).map_err(|e| FerryError::Internal(e.into()))?;
    Ok(Self {
      destination: T::table().name,
      position: record.cdc().lsn(),
      deleted: record.cdc().is_deleted(),
      data,
    })
  }

  /// Deserialize the row back into its typed record.
  pub fn decode<T: AnalyticalRecord>(&self) -> Result<T> {
    serde_json::from_value(self.data.clone()).map_err(|e| FerryError::Internal(e.into()))
  }
}

/// Type-erased handle to an [`AnalyticalRecord`] implementation, stored in
/// the stream registry next to the destination sink.
#[derive(Clone, Copy)]
pub struct RecordKind {
  name: &'static str,
  schema: fn() -> &'static RecordSchema,
  table: fn() -> &'static DestinationTable,
  build: fn(&str, Map<String, Value>) -> Result<AnalyticalRow>,
}

impl RecordKind {
  pub fn of<T: AnalyticalRecord>() -> Self {
    Self {
      name: T::schema().name,
      schema: T::schema,
      table: T::table,
      build: build_row::<T>,
    }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  pub fn schema(&self) -> &'static RecordSchema {
    (self.schema)()
  }

  pub fn table(&self) -> &'static DestinationTable {
    (self.table)()
  }

  /// Normalize, validate and serialize an annotated payload.
  pub fn build(&self, table: &str, fields: Map<String, Value>) -> Result<AnalyticalRow> {
    (self.build)(table, fields)
  }
}

impl std::fmt::Debug for RecordKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RecordKind")
      .field("name", &self.name)
      .field("table", &self.table().name)
      .finish()
  }
}

fn build_row<T: AnalyticalRecord>(table: &str, fields: Map<String, Value>) -> Result<AnalyticalRow> {
  let record = build_record::<T>(table, fields)?;
  AnalyticalRow::from_record(&record)
}

/// Serde adapter for timestamp columns.
///
/// Accepts RFC 3339 and the naive `YYYY-MM-DD[T ]HH:MM:SS[.f]` forms
/// (read as UTC); writes RFC 3339 with millisecond precision.
pub mod timestamp {
  use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
  use serde::{de, Deserialize, Deserializer, Serializer};

  pub fn parse(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
      return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
      .iter()
      .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
      .map(|naive| naive.and_utc())
  }

  pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let s = String::deserialize(d)?;
    parse(&s).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{s}'")))
  }
}
