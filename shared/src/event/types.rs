use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of change carried by a CDC envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpType {
    Insert,
    Update,
    Delete,
    /// Row emitted by the connector's initial snapshot.
    Read,
}

impl OpType {
    /// Returns the wire tag used by the CDC connector.
    pub fn as_str(&self) -> &'static str {
        match self {
            OpType::Insert => "insert",
            OpType::Update => "update",
            OpType::Delete => "delete",
            OpType::Read => "read",
        }
    }

    /// Soft-delete flag written to the analytical record.
    #[inline]
    pub fn is_deleted_flag(&self) -> u8 {
        match self {
            OpType::Delete => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope header attached by the CDC connector to every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdcMetadata {
    /// Source table name (e.g. `"customers"`), matched case-sensitively.
    pub table: String,
    /// The type of operation.
    pub operation: OpType,
    /// Hex-encoded log position, `X/Y` or a single hex string.
    #[serde(rename = "lsn")]
    pub position: String,
}
