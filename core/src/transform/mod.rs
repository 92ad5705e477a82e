//! Classify a raw change event and annotate its payload with CDC columns.

use serde_json::{Map, Value};
use tracing::trace;

use shared::error::Result;
use shared::event::{OpType, RawCdcEvent};
use shared::lsn::Lsn;

use crate::schema::CdcAnnotation;

/// A payload ready for routing.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
  /// Source table, copied verbatim from the envelope.
  pub table: String,
  pub operation: OpType,
  pub position: Lsn,
  /// Shallow copy of the business payload with `isDeleted` and `position`
  /// set.
  pub payload: Map<String, Value>,
}

impl Transformed {
  pub fn into_parts(self) -> (String, Map<String, Value>) {
    (self.table, self.payload)
  }
}

/// Decode the log position and annotate a copy of the payload.
///
/// The event itself is left untouched, so calling this twice on the same
/// event yields equal results. Business fields are not validated here; a
/// payload that is not a mapping is replaced by an empty one.
pub fn transform(event: &RawCdcEvent) -> Result<Transformed> {
  let table = event.table();
  let operation = event.operation();
  let position = Lsn::decode(event.position())?;

  let mut payload = match &event.payload {
    Value::Object(map) => map.clone(),
    _ => Map::new(),
  };

  payload.insert(
    CdcAnnotation::DELETED_KEY.to_string(),
    Value::from(operation.is_deleted_flag()),
  );
  payload.insert(
    CdcAnnotation::POSITION_KEY.to_string(),
    Value::from(position.get()),
  );

  trace!(table, op = %operation, lsn = %position, "transformed event");

  Ok(Transformed {
    table: table.to_string(),
    operation,
    position,
    payload,
  })
}
