pub mod loader;

pub use loader::{
    ClickHouseConfig, DeadLetterConfig, FerryConfig, ObservabilityConfig, PipelineConfig,
    RoutingConfig, RoutingMode, SinkConfig, SinkKind, SourceConfig,
};

use std::path::Path;

/// Load configuration from a TOML file with environment-variable overrides.
///
/// Resolution order:
/// 1. `config/default.toml` — base configuration
/// 2. `config/{env}.toml` — environment overlay (development, testing, production)
/// 3. Environment variables with prefix `FERRY_` (double underscore for nesting)
///
/// # Example
///
/// `FERRY_CLICKHOUSE__URL=http://clickhouse:8123` overrides `clickhouse.url`.
pub fn load_config(config_dir: &Path, env: &str) -> anyhow::Result<FerryConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from(config_dir.join("default.toml")).required(true))
        .add_source(config::File::from(config_dir.join(format!("{}.toml", env))).required(false))
        .add_source(
            config::Environment::with_prefix("FERRY")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let cfg: FerryConfig = settings.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}
