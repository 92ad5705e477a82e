use thiserror::Error;

use crate::lsn::LsnParseError;

/// Top-level error type for Ferry.
///
/// Each variant corresponds to a stage boundary. Every variant raised on the
/// event-processing path is recoverable: the processor dead-letters the
/// original event and hands the error back to the consumer loop.
#[derive(Debug, Error)]
pub enum FerryError {
    // ── Envelope ───────────────────────────────────────────────
    #[error("envelope: malformed CDC envelope: {reason}")]
    InvalidEnvelope { reason: String },

    // ── Transform ──────────────────────────────────────────────
    #[error("transform: malformed log position")]
    MalformedPosition(#[from] LsnParseError),

    // ── Routing ────────────────────────────────────────────────
    #[error("routing: no stream registered for table '{0}'")]
    UnknownTable(String),

    #[error("routing: record for table '{table}' failed schema validation: {reason}")]
    SchemaValidation { table: String, reason: String },

    #[error("routing: stream '{0}' registered more than once")]
    DuplicateStream(String),

    // ── Sinks ──────────────────────────────────────────────────
    #[error("sink: '{sink}' rejected record: {reason}")]
    SinkRejected { sink: String, reason: String },

    #[error("sink: '{sink}' buffer full, {pending} records pending")]
    SinkBackpressure { sink: String, pending: usize },

    #[error("dead-letter: failed to record event")]
    DeadLetterFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    // ── Config ─────────────────────────────────────────────────
    #[error("config: failed to load configuration")]
    ConfigLoadFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("config: invalid value for '{key}': {reason}")]
    ConfigInvalid { key: String, reason: String },

    // ── Generic ────────────────────────────────────────────────
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl FerryError {
    /// Stable, low-cardinality label for metrics and dead-letter entries.
    pub fn kind(&self) -> &'static str {
        match self {
            FerryError::InvalidEnvelope { .. } => "invalid_envelope",
            FerryError::MalformedPosition(_) => "malformed_position",
            FerryError::UnknownTable(_) => "unknown_table",
            FerryError::SchemaValidation { .. } => "schema_validation",
            FerryError::DuplicateStream(_) => "duplicate_stream",
            FerryError::SinkRejected { .. } => "sink_rejected",
            FerryError::SinkBackpressure { .. } => "sink_backpressure",
            FerryError::DeadLetterFailed(_) => "dead_letter_failed",
            FerryError::ConfigLoadFailed(_) => "config_load_failed",
            FerryError::ConfigInvalid { .. } => "config_invalid",
            FerryError::Internal(_) => "internal",
        }
    }

    pub fn schema_validation(table: impl Into<String>, reason: impl ToString) -> Self {
        FerryError::SchemaValidation {
            table: table.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_envelope(reason: impl ToString) -> Self {
        FerryError::InvalidEnvelope {
            reason: reason.to_string(),
        }
    }
}
