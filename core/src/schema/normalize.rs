use serde_json::{Map, Value};
use tracing::trace;

use super::field::RecordSchema;

/// Replace explicit nulls in non-nullable fields with the field type's zero
/// value.
///
/// Delete events from the source carry the primary key and null for every
/// other column, while the destination columns are non-nullable. Only keys
/// that are present with a `null` value are touched: absent keys are left
/// for the record type's own defaults, and every non-null value (including
/// `""`, `0` and `false`) is kept as supplied. Keys the schema does not
/// declare pass through unchanged.
pub fn normalize(schema: &RecordSchema, mut fields: Map<String, Value>) -> Map<String, Value> {
  for spec in schema.fields.iter().filter(|f| !f.nullable) {
    if let Some(value) = fields.get_mut(spec.name) {
      if value.is_null() {
        trace!(record = schema.name, field = spec.name, "null replaced with type default");
        *value = spec.ty.zero_value();
      }
    }
  }
  fields
}
