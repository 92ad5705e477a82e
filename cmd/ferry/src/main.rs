use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use ferry_core::daemon::{Lifecycle, LifecycleState, RuntimeConfig};
use ferry_core::deadletter::{
  DeadLetterQueue, DeadLetterSink, Escalation, FanoutDeadLetter, JsonLinesDeadLetter,
};
use ferry_core::metrics::MetricsRegistry;
use ferry_core::pipeline::{run_flush_loop, BatchWriter, CdcProcessor, FlushPolicy, StreamCoordinator};
use ferry_core::router::{RegistryRouter, Router, StaticRouter, StaticSinks};
use ferry_core::schema::{bindings, AnalyticalRecord, Customer, Order, OrderItem, Product};
use ferry_core::sink::{JsonLinesSink, QueueSink, Sink};
use ferry_http::egress::clickhouse::ClickHouseWriter;
use ferry_http::health::HealthEndpoint;
use shared::config::{self, FerryConfig, RoutingMode, SinkKind};

fn main() -> anyhow::Result<()> {
  let env = std::env::var("FERRY_ENV").unwrap_or_else(|_| "development".to_string());
  let config_dir =
    PathBuf::from(std::env::var("FERRY_CONFIG_DIR").unwrap_or_else(|_| "config".to_string()));
  let cfg = config::load_config(&config_dir, &env)?;

  init_logging(&cfg.observability.log_level);
  info!(env = %env, config_dir = %config_dir.display(), "ferry starting");

  let rt = RuntimeConfig::for_streams(bindings().len()).build_runtime()?;
  rt.block_on(async move { run_daemon(cfg).await })
}

async fn run_daemon(cfg: FerryConfig) -> anyhow::Result<()> {
  let mut lifecycle = Lifecycle::new();
  let health = HealthEndpoint::new();
  let metrics = Arc::new(MetricsRegistry::new()?);

  // Phase 1: Initialize
  let dlq = Arc::new(DeadLetterQueue::new(cfg.dead_letter.max_entries));
  let dead_letter = dead_letter_sink(&cfg, dlq.clone())?;
  let escalation = Escalation::new(dead_letter, metrics.clone());

  let (shutdown_tx, shutdown_rx) = watch::channel(false);
  let streams = build_streams(&cfg, metrics.clone(), shutdown_rx).await?;
  let router = build_router(&cfg, &streams.sinks)?;
  let processor = CdcProcessor::new(router, escalation, metrics.clone());

  // Phase 2: Running
  lifecycle.transition(LifecycleState::Running);
  health.set_ready();

  let input = open_source(&cfg.source.path).await?;
  tokio::select! {
    res = consume(input, &processor) => res?,
    _ = Lifecycle::wait_for_shutdown() => {}
  }

  // Phase 3: Shutdown
  lifecycle.transition(LifecycleState::ShuttingDown);
  health.set_not_ready();
  let _ = shutdown_tx.send(true);
  for handle in streams.flushers {
    if let Err(e) = handle.await {
      warn!(error = %e, "flush task panicked");
    }
  }

  info!(
    dead_lettered = dlq.total_entries(),
    retained = dlq.len(),
    "dead-letter queue summary"
  );
  info!(metrics = %metrics.encode(), "final metrics");

  lifecycle.transition(LifecycleState::Stopped);
  info!("ferry stopped");
  Ok(())
}

/// Feed every non-empty line to the processor until the input ends.
async fn consume(input: Source, processor: &CdcProcessor) -> anyhow::Result<()> {
  let mut lines = input.lines();
  let (mut routed, mut failed) = (0u64, 0u64);
  while let Some(line) = lines.next_line().await.context("failed to read input")? {
    let line = line.trim();
    if line.is_empty() {
      continue;
    }
    match processor.process_line(line) {
      Ok(r) => {
        routed += 1;
        debug!(table = %r.table, stream = %r.stream, lsn = %r.position, "event routed");
      }
      Err(e) => {
        // Already logged and dead-lettered.
        failed += 1;
        debug!(kind = e.kind(), "event failed");
      }
    }
  }
  info!(routed, failed, "input exhausted");
  Ok(())
}

type Source = Box<dyn AsyncBufRead + Unpin + Send>;

async fn open_source(path: &str) -> anyhow::Result<Source> {
  let source: Source = if path == "-" {
    info!("reading change events from stdin");
    Box::new(BufReader::new(tokio::io::stdin()))
  } else {
    let file = tokio::fs::File::open(path)
      .await
      .with_context(|| format!("failed to open source {path}"))?;
    info!(path, "reading change events from file");
    Box::new(BufReader::new(file))
  };
  Ok(source)
}

fn dead_letter_sink(
  cfg: &FerryConfig,
  dlq: Arc<DeadLetterQueue>,
) -> anyhow::Result<Arc<dyn DeadLetterSink>> {
  let memory: Arc<dyn DeadLetterSink> = dlq;
  let Some(path) = &cfg.dead_letter.path else {
    return Ok(memory);
  };
  let file: Arc<dyn DeadLetterSink> = Arc::new(
    JsonLinesDeadLetter::open(Path::new(path))
      .with_context(|| format!("failed to open dead-letter file {path}"))?,
  );
  info!(path, "dead-lettered events also appended to file");
  Ok(Arc::new(FanoutDeadLetter::new(vec![memory, file])))
}

struct Streams {
  /// Destination table name → sink.
  sinks: HashMap<&'static str, Arc<dyn Sink>>,
  flushers: Vec<JoinHandle<StreamCoordinator>>,
}

async fn build_streams(
  cfg: &FerryConfig,
  metrics: Arc<MetricsRegistry>,
  shutdown: watch::Receiver<bool>,
) -> anyhow::Result<Streams> {
  let mut streams = Streams {
    sinks: HashMap::new(),
    flushers: Vec::new(),
  };

  match cfg.sink.kind()? {
    SinkKind::Stdout => {
      for binding in bindings() {
        let name = binding.kind.table().name;
        let sink = JsonLinesSink::new(name, std::io::stdout());
        streams.sinks.insert(name, Arc::new(sink));
      }
    }
    SinkKind::ClickHouse => {
      let ch = cfg
        .clickhouse
        .as_ref()
        .context("clickhouse section missing")?;
      let writer = Arc::new(ClickHouseWriter::new(ch)?);
      if ch.auto_create_tables {
        let kinds: Vec<_> = bindings().iter().map(|b| b.kind).collect();
        writer.create_tables(&kinds).await?;
      }
      let writer: Arc<dyn BatchWriter> = writer;
      let tick = Duration::from_millis(cfg.pipeline.tick_ms);

      for binding in bindings() {
        let name = binding.kind.table().name;
        let sink = QueueSink::new(name, cfg.sink.ring_buffer_capacity);
        let coordinator =
          StreamCoordinator::new(name, sink.buffer(), FlushPolicy::from_config(&cfg.pipeline));
        streams.flushers.push(tokio::spawn(run_flush_loop(
          coordinator,
          writer.clone(),
          metrics.clone(),
          tick,
          shutdown.clone(),
        )));
        streams.sinks.insert(name, Arc::new(sink));
      }
      info!(
        streams = streams.flushers.len(),
        database = %ch.database,
        "ClickHouse flush tasks started"
      );
    }
  }
  Ok(streams)
}

fn build_router(
  cfg: &FerryConfig,
  sinks: &HashMap<&'static str, Arc<dyn Sink>>,
) -> anyhow::Result<Arc<dyn Router>> {
  let sink_for = |name: &str| {
    sinks
      .get(name)
      .cloned()
      .with_context(|| format!("no sink built for {name}"))
  };

  let router: Arc<dyn Router> = match cfg.routing.mode()? {
    RoutingMode::Registry => {
      let registry = ferry_core::router::StreamRegistry::from_bindings(&bindings(), |b| {
        sink_for(b.kind.table().name).map_err(Into::into)
      })?;
      Arc::new(RegistryRouter::new(Arc::new(registry)))
    }
    RoutingMode::Static => Arc::new(StaticRouter::new(StaticSinks {
      customers: sink_for(Customer::table().name)?,
      products: sink_for(Product::table().name)?,
      orders: sink_for(Order::table().name)?,
      order_items: sink_for(OrderItem::table().name)?,
    })),
  };
  info!(mode = %cfg.routing.mode, "router ready");
  Ok(router)
}

fn init_logging(level: &str) {
  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(level))
    .unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(true)
    .with_thread_ids(true)
    .with_writer(std::io::stderr)
    .init();
}
