#![cfg(test)]
use std::fs;

use shared::config::{load_config, RoutingMode, SinkKind};

const DEFAULT_TOML: &str = r#"
[source]
path = "events.jsonl"

[sink]
kind = "stdout"
ring_buffer_capacity = 128
"#;

#[test]
fn overlay_overrides_defaults() {
  let dir = tempfile::tempdir().unwrap();
  fs::write(dir.path().join("default.toml"), DEFAULT_TOML).unwrap();
  fs::write(
    dir.path().join("staging.toml"),
    r#"
[routing]
mode = "static"

[sink]
kind = "clickhouse"

[clickhouse]
url = "http://clickhouse:8123"
database = "analytics"
"#,
  )
  .unwrap();

  let cfg = load_config(dir.path(), "staging").unwrap();
  assert_eq!(cfg.source.path, "events.jsonl");
  assert_eq!(cfg.routing.mode().unwrap(), RoutingMode::Static);
  assert_eq!(cfg.sink.kind().unwrap(), SinkKind::ClickHouse);
  assert_eq!(cfg.sink.ring_buffer_capacity, 128);
  assert_eq!(cfg.clickhouse.unwrap().database, "analytics");
}

#[test]
fn missing_overlay_is_fine() {
  let dir = tempfile::tempdir().unwrap();
  fs::write(dir.path().join("default.toml"), DEFAULT_TOML).unwrap();
  let cfg = load_config(dir.path(), "nowhere").unwrap();
  assert_eq!(cfg.routing.mode().unwrap(), RoutingMode::Registry);
  assert_eq!(cfg.dead_letter.max_entries, 10_000);
}

#[test]
fn invalid_values_are_rejected() {
  let dir = tempfile::tempdir().unwrap();
  fs::write(
    dir.path().join("default.toml"),
    "[pipeline]\nflush_max_rows = 0\n",
  )
  .unwrap();
  let err = load_config(dir.path(), "development").unwrap_err();
  assert!(format!("{err:#}").contains("pipeline.flush_max_rows"));
}

#[test]
fn repo_default_config_loads() {
  let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config");
  let cfg = load_config(&dir, "development").unwrap();
  assert_eq!(cfg.sink.kind().unwrap(), SinkKind::Stdout);
  assert_eq!(cfg.source.path, "-");
}
