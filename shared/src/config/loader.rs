use serde::Deserialize;

use crate::error::{FerryError, Result};

/// Root configuration for the Ferry daemon.
///
/// Loaded from TOML files via the `config` crate with environment-variable
/// overrides (prefix: `FERRY_`).
#[derive(Debug, Clone, Deserialize)]
pub struct FerryConfig {
    /// Where raw CDC envelopes are read from.
    #[serde(default)]
    pub source: SourceConfig,
    /// Table → stream routing strategy.
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Destination sink settings.
    #[serde(default)]
    pub sink: SinkConfig,
    /// ClickHouse connection (required when `sink.kind = "clickhouse"`).
    pub clickhouse: Option<ClickHouseConfig>,
    /// Batching of routed records toward the OLAP store.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Dead-letter sink settings.
    #[serde(default)]
    pub dead_letter: DeadLetterConfig,
    /// Observability settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Input configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Path of a newline-delimited JSON file of envelopes; `-` is stdin.
    #[serde(default = "default_source_path")]
    pub path: String,
}

/// Routing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    /// `registry` (lookup in the startup registry) or `static` (fixed
    /// dispatch over the built-in tables).
    #[serde(default = "default_routing_mode")]
    pub mode: String,
}

/// How the router resolves a table name to a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingMode {
    Registry,
    Static,
}

/// Destination sink configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    /// `clickhouse` or `stdout`.
    #[serde(default = "default_sink_kind")]
    pub kind: String,
    /// Per-stream ring buffer capacity (records).
    #[serde(default = "default_ring_capacity")]
    pub ring_buffer_capacity: usize,
}

/// Where routed records end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    ClickHouse,
    Stdout,
}

/// ClickHouse HTTP interface configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClickHouseConfig {
    /// Base URL of the HTTP interface (e.g. `http://localhost:8123`).
    pub url: String,
    /// Target database.
    #[serde(default = "default_database")]
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Issue `CREATE TABLE IF NOT EXISTS` for every destination at startup.
    #[serde(default = "default_true")]
    pub auto_create_tables: bool,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retry policy: maximum attempts per insert.
    #[serde(default = "default_retry_max")]
    pub retry_max_attempts: u32,
    /// Retry policy: initial backoff in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_initial_backoff_ms: u64,
}

/// Batching configuration for queue-backed sinks.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Flush policy: max accumulated rows before flushing.
    #[serde(default = "default_flush_rows")]
    pub flush_max_rows: usize,
    /// Flush policy: max age in milliseconds before flushing.
    #[serde(default = "default_flush_age_ms")]
    pub flush_max_age_ms: u64,
    /// How often each stream's flush task polls its buffer.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

/// Dead-letter configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeadLetterConfig {
    /// Capacity of the in-memory dead-letter queue (oldest evicted).
    #[serde(default = "default_dlq_entries")]
    pub max_entries: usize,
    /// Optional JSON-lines file that receives every dead-lettered event.
    pub path: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level filter (e.g. `info`, `debug`, `trace`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl FerryConfig {
    /// Check cross-field constraints the deserializer cannot express.
    pub fn validate(&self) -> Result<()> {
        self.routing.mode()?;
        if self.sink.kind()? == SinkKind::ClickHouse && self.clickhouse.is_none() {
            return Err(FerryError::ConfigInvalid {
                key: "clickhouse".into(),
                reason: "required when sink.kind = \"clickhouse\"".into(),
            });
        }
        if self.sink.ring_buffer_capacity == 0 {
            return Err(invalid("sink.ring_buffer_capacity", "must be > 0"));
        }
        if self.pipeline.flush_max_rows == 0 {
            return Err(invalid("pipeline.flush_max_rows", "must be > 0"));
        }
        if self.pipeline.tick_ms == 0 {
            return Err(invalid("pipeline.tick_ms", "must be > 0"));
        }
        if self.dead_letter.max_entries == 0 {
            return Err(invalid("dead_letter.max_entries", "must be > 0"));
        }
        if let Some(ch) = &self.clickhouse {
            if ch.retry_max_attempts == 0 {
                return Err(invalid("clickhouse.retry_max_attempts", "must be > 0"));
            }
        }
        Ok(())
    }
}

impl RoutingConfig {
    pub fn mode(&self) -> Result<RoutingMode> {
        match self.mode.as_str() {
            "registry" => Ok(RoutingMode::Registry),
            "static" => Ok(RoutingMode::Static),
            other => Err(invalid(
                "routing.mode",
                format!("expected \"registry\" or \"static\", got {other:?}"),
            )),
        }
    }
}

impl SinkConfig {
    pub fn kind(&self) -> Result<SinkKind> {
        match self.kind.as_str() {
            "clickhouse" => Ok(SinkKind::ClickHouse),
            "stdout" => Ok(SinkKind::Stdout),
            other => Err(invalid(
                "sink.kind",
                format!("expected \"clickhouse\" or \"stdout\", got {other:?}"),
            )),
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> FerryError {
    FerryError::ConfigInvalid {
        key: key.to_string(),
        reason: reason.into(),
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            mode: default_routing_mode(),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: default_sink_kind(),
            ring_buffer_capacity: default_ring_capacity(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            flush_max_rows: default_flush_rows(),
            flush_max_age_ms: default_flush_age_ms(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl Default for DeadLetterConfig {
    fn default() -> Self {
        Self {
            max_entries: default_dlq_entries(),
            path: None,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ── Default value functions ─────────────────────────────────────────

fn default_source_path() -> String {
    "-".to_string()
}
fn default_routing_mode() -> String {
    "registry".to_string()
}
fn default_sink_kind() -> String {
    "stdout".to_string()
}
fn default_ring_capacity() -> usize {
    65_536
}
fn default_database() -> String {
    "default".to_string()
}
fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_retry_max() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    500
}
fn default_flush_rows() -> usize {
    10_000
}
fn default_flush_age_ms() -> u64 {
    1_000
}
fn default_tick_ms() -> u64 {
    100
}
fn default_dlq_entries() -> usize {
    10_000
}
fn default_log_level() -> String {
    "info".to_string()
}
