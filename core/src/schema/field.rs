use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use super::record::timestamp;

/// Unix epoch rendered the way timestamp columns are parsed back.
pub const EPOCH_TIMESTAMP: &str = "1970-01-01T00:00:00Z";

/// Value category of a destination column.
///
/// Picked at schema-definition time; the null-default normalizer switches on
/// it instead of inspecting the Rust type of the record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
  Text,
  Integer,
  Float,
  Boolean,
  Timestamp,
  Decimal,
}

impl FieldType {
  /// The zero value substituted for an explicit null.
  pub fn zero_value(&self) -> Value {
    match self {
      FieldType::Text => Value::String(String::new()),
      FieldType::Integer => Value::from(0u64),
      FieldType::Float => Value::from(0.0f64),
      FieldType::Boolean => Value::Bool(false),
      FieldType::Timestamp => Value::String(EPOCH_TIMESTAMP.to_string()),
      FieldType::Decimal => Value::String("0".to_string()),
    }
  }
}

/// Values a destination column can hold beyond what its Rust type accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRange {
  Unbounded,
  /// `Decimal(precision, scale)`: at most `precision - scale` integer digits.
  Decimal { precision: u32, scale: u32 },
  /// `DateTime64`: 1900-01-01 up to the end of 2299.
  DateTime64,
}

impl ColumnRange {
  /// Check a present, non-null value against the column's range.
  ///
  /// Values that do not parse as the column's type are left for record
  /// decoding to reject.
  pub fn check(&self, value: &Value) -> Result<(), String> {
    match *self {
      ColumnRange::Unbounded => Ok(()),
      ColumnRange::Decimal { precision, scale } => {
        let Some(d) = decimal_of(value) else {
          return Ok(());
        };
        let limit = Decimal::from(10u64.pow(precision.saturating_sub(scale)));
        if d.abs() >= limit {
          return Err(format!("{d} does not fit Decimal({precision}, {scale})"));
        }
        Ok(())
      }
      ColumnRange::DateTime64 => {
        let Some(dt) = value.as_str().and_then(timestamp::parse) else {
          return Ok(());
        };
        let (min, max) = datetime64_span();
        if dt < min || dt > max {
          return Err(format!("{dt} is outside the DateTime64 range"));
        }
        Ok(())
      }
    }
  }
}

fn decimal_of(value: &Value) -> Option<Decimal> {
  let text = match value {
    Value::String(s) => s.clone(),
    Value::Number(n) => n.to_string(),
    _ => return None,
  };
  Decimal::from_str(&text)
    .or_else(|_| Decimal::from_scientific(&text))
    .ok()
}

fn datetime64_span() -> (DateTime<Utc>, DateTime<Utc>) {
  let min = Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).single();
  let max = Utc.with_ymd_and_hms(2299, 12, 31, 23, 59, 59).single();
  (
    min.unwrap_or(DateTime::<Utc>::MIN_UTC),
    max.unwrap_or(DateTime::<Utc>::MAX_UTC),
  )
}

/// Metadata for a single column of a destination record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
  pub name: &'static str,
  pub ty: FieldType,
  pub nullable: bool,
  /// ClickHouse column type used when generating DDL.
  pub column_type: &'static str,
  pub range: ColumnRange,
}

impl FieldSpec {
  pub const fn required(name: &'static str, ty: FieldType, column_type: &'static str) -> Self {
    Self {
      name,
      ty,
      nullable: false,
      column_type,
      range: ColumnRange::Unbounded,
    }
  }

  pub const fn nullable(name: &'static str, ty: FieldType, column_type: &'static str) -> Self {
    Self {
      name,
      ty,
      nullable: true,
      column_type,
      range: ColumnRange::Unbounded,
    }
  }

  pub const fn with_range(self, range: ColumnRange) -> Self {
    Self { range, ..self }
  }

  /// Column type as it appears in `CREATE TABLE`.
  pub fn ddl_type(&self) -> String {
    if self.nullable {
      format!("Nullable({})", self.column_type)
    } else {
      self.column_type.to_string()
    }
  }
}

/// Business columns of a destination record type.
#[derive(Debug, Clone, Copy)]
pub struct RecordSchema {
  /// Record type name (e.g. `"Customer"`).
  pub name: &'static str,
  pub fields: &'static [FieldSpec],
}

impl RecordSchema {
  /// Look up a field by name.
  pub fn field(&self, name: &str) -> Option<&FieldSpec> {
    self.fields.iter().find(|f| f.name == name)
  }

  pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.fields.iter().map(|f| f.name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_values_per_tag() {
    assert_eq!(FieldType::Text.zero_value(), Value::from(""));
    assert_eq!(FieldType::Integer.zero_value(), Value::from(0));
    assert_eq!(FieldType::Float.zero_value().as_f64(), Some(0.0));
    assert_eq!(FieldType::Boolean.zero_value(), Value::Bool(false));
    assert_eq!(FieldType::Timestamp.zero_value(), Value::from(EPOCH_TIMESTAMP));
    assert_eq!(FieldType::Decimal.zero_value(), Value::from("0"));
  }

  #[test]
  fn nullable_columns_wrap_ddl_type() {
    let f = FieldSpec::nullable("note", FieldType::Text, "String");
    assert_eq!(f.ddl_type(), "Nullable(String)");
    let f = FieldSpec::required("id", FieldType::Integer, "UInt64");
    assert_eq!(f.ddl_type(), "UInt64");
  }

  #[test]
  fn decimal_range_follows_precision_and_scale() {
    let range = ColumnRange::Decimal {
      precision: 10,
      scale: 2,
    };
    assert!(range.check(&Value::from("99999999.99")).is_ok());
    assert!(range.check(&Value::from(-12.5)).is_ok());
    assert!(range.check(&Value::from("100000000")).is_err());
    assert!(range.check(&Value::from("123456789012345.678")).is_err());
    assert!(range.check(&Value::from(1e12)).is_err());
    assert!(range.check(&Value::from("abc")).is_ok());
  }

  #[test]
  fn datetime64_range_rejects_far_dates() {
    let range = ColumnRange::DateTime64;
    assert!(range.check(&Value::from("2024-03-01T10:00:00Z")).is_ok());
    assert!(range.check(&Value::from(EPOCH_TIMESTAMP)).is_ok());
    assert!(range.check(&Value::from("9999-01-01T00:00:00Z")).is_err());
    assert!(range.check(&Value::from("1850-06-01 00:00:00")).is_err());
  }
}
