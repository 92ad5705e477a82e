use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::types::{CdcMetadata, OpType};
use crate::error::{FerryError, Result};

/// Key under which the flattened connector variant carries its metadata.
const FLAT_METADATA_KEY: &str = "_metadata";

/// An untransformed change event as received from the CDC stream.
///
/// Wire shape:
///
/// ```json
/// { "metadata": { "table": "customers", "operation": "delete", "lsn": "0/5" },
///   "payload": { "id": 42, "email": null } }
/// ```
///
/// The processor never mutates a `RawCdcEvent`; the dead-letter path relies
/// on being able to publish it exactly as it arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCdcEvent {
    pub metadata: CdcMetadata,

    /// Business row. A mapping for well-formed events; delete events carry
    /// the primary key with every other column null or absent.
    #[serde(default)]
    pub payload: Value,
}

impl RawCdcEvent {
    pub fn new(metadata: CdcMetadata, payload: Value) -> Self {
        Self { metadata, payload }
    }

    #[inline]
    pub fn table(&self) -> &str {
        &self.metadata.table
    }

    #[inline]
    pub fn operation(&self) -> OpType {
        self.metadata.operation
    }

    #[inline]
    pub fn position(&self) -> &str {
        &self.metadata.position
    }

    /// Parse and structurally validate one serialized envelope.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s).map_err(FerryError::invalid_envelope)?;
        Self::from_value(value)
    }

    /// Validate an already-decoded envelope.
    ///
    /// Besides the canonical `{metadata, payload}` shape, accepts the
    /// flattened form some connectors emit, where the row columns sit at
    /// the top level next to a `_metadata` object.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut obj = match value {
            Value::Object(obj) => obj,
            other => {
                return Err(FerryError::invalid_envelope(format!(
                    "expected an object, got {}",
                    json_type_name(&other)
                )))
            }
        };

        if !obj.contains_key("metadata") {
            if let Some(meta) = obj.remove(FLAT_METADATA_KEY) {
                let metadata: CdcMetadata =
                    serde_json::from_value(meta).map_err(FerryError::invalid_envelope)?;
                return Ok(Self::new(metadata, Value::Object(obj)));
            }
        }

        serde_json::from_value(Value::Object(obj)).map_err(FerryError::invalid_envelope)
    }

    /// The payload as a mapping, if it is one.
    pub fn payload_map(&self) -> Option<&Map<String, Value>> {
        self.payload.as_object()
    }
}

pub(crate) fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
