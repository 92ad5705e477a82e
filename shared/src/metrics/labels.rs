// Prometheus metric label constants.
//
// Centralizing label names prevents typo-induced cardinality explosions.

/// Label for the source table name.
pub const LABEL_TABLE: &str = "table";

/// Label for the destination stream name.
pub const LABEL_STREAM: &str = "stream";

/// Label for the error category (`FerryError::kind`).
pub const LABEL_ERROR: &str = "error";
