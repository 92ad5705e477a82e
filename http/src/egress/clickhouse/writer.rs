use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tracing::{debug, info, warn};

use ferry_core::pipeline::{BatchWriter, RowBatch};
use ferry_core::schema::RecordKind;
use shared::config::ClickHouseConfig;

use super::retry::{is_retryable_status, RetryPolicy};

/// Writes row batches into ClickHouse over its HTTP interface.
///
/// Each batch becomes one `INSERT ... FORMAT JSONEachRow` request. Failed
/// requests are retried with exponential backoff when the failure looks
/// transient (connection errors, 5xx, 429).
pub struct ClickHouseWriter {
  client: Client,
  url: String,
  database: String,
  user: Option<String>,
  password: Option<String>,
  retry: RetryPolicy,
}

struct AttemptError {
  retryable: bool,
  error: anyhow::Error,
}

impl ClickHouseWriter {
  pub fn new(cfg: &ClickHouseConfig) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(cfg.timeout_secs))
      .pool_max_idle_per_host(4)
      .pool_idle_timeout(Duration::from_secs(90))
      .tcp_keepalive(Duration::from_secs(30))
      .build()
      .context("failed to build ClickHouse HTTP client")?;

    Ok(Self {
      client,
      url: cfg.url.trim_end_matches('/').to_string(),
      database: cfg.database.clone(),
      user: cfg.user.clone(),
      password: cfg.password.clone(),
      retry: RetryPolicy::from_config(cfg),
    })
  }

  /// Create every destination table that does not exist yet.
  pub async fn create_tables(&self, kinds: &[RecordKind]) -> anyhow::Result<()> {
    if self.database != "default" {
      self
        .execute(&format!("CREATE DATABASE IF NOT EXISTS `{}`", self.database))
        .await?;
    }
    for kind in kinds {
      let table = kind.table();
      let ddl = table.create_table_sql(&self.database, kind.schema());
      self
        .execute(&ddl)
        .await
        .with_context(|| format!("failed to create table {}", table.name))?;
      info!(table = table.name, database = %self.database, "destination table ready");
    }
    Ok(())
  }

  /// Run a statement that takes no data.
  pub async fn execute(&self, sql: &str) -> anyhow::Result<()> {
    debug!(sql, "executing statement");
    self
      .with_retry("statement", || {
        self.request().body(sql.to_string())
      })
      .await
  }

  /// Insert a `JSONEachRow` body into `table`.
  pub async fn insert(&self, table: &str, body: Vec<u8>) -> anyhow::Result<()> {
    let query = format!(
      "INSERT INTO `{}`.`{}` FORMAT JSONEachRow",
      self.database, table
    );
    self
      .with_retry(table, || {
        self
          .request()
          .query(&[
            ("query", query.as_str()),
            ("date_time_input_format", "best_effort"),
          ])
          .header("Content-Type", "application/x-ndjson")
          .body(body.clone())
      })
      .await
  }

  fn request(&self) -> RequestBuilder {
    let mut req = self.client.post(format!("{}/", self.url));
    if let Some(user) = &self.user {
      req = req.header("X-ClickHouse-User", user);
    }
    if let Some(password) = &self.password {
      req = req.header("X-ClickHouse-Key", password);
    }
    req
  }

  async fn with_retry<F>(&self, target: &str, build: F) -> anyhow::Result<()>
  where
    F: Fn() -> RequestBuilder,
  {
    let mut attempt = 0;
    loop {
      match send_once(build()).await {
        Ok(()) => return Ok(()),
        Err(AttemptError { retryable, error }) => {
          if !retryable || !self.retry.should_retry(attempt) {
            return Err(error.context(format!(
              "ClickHouse request for {} failed after {} attempt(s)",
              target,
              attempt + 1
            )));
          }
          let backoff = self.retry.backoff_for(attempt);
          warn!(
            target_table = target,
            attempt = attempt + 1,
            backoff_ms = backoff.as_millis() as u64,
            error = %error,
            "ClickHouse request failed, retrying"
          );
          tokio::time::sleep(backoff).await;
          attempt += 1;
        }
      }
    }
  }
}

async fn send_once(req: RequestBuilder) -> Result<(), AttemptError> {
  let resp = req.send().await.map_err(|e| AttemptError {
    retryable: true,
    error: anyhow::Error::new(e),
  })?;

  let status = resp.status();
  if status.is_success() {
    return Ok(());
  }
  let text = resp.text().await.unwrap_or_default();
  Err(AttemptError {
    retryable: is_retryable_status(status),
    error: anyhow::anyhow!("ClickHouse returned HTTP {}: {}", status.as_u16(), text.trim()),
  })
}

#[async_trait]
impl BatchWriter for ClickHouseWriter {
  async fn write(&self, table: &str, batch: &RowBatch) -> anyhow::Result<()> {
    let body = batch.to_json_each_row()?;
    self.insert(table, body).await?;
    debug!(
      table,
      rows = batch.len(),
      max_lsn = %batch.max_position(),
      "batch inserted"
    );
    Ok(())
  }
}
