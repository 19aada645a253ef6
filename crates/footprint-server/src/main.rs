//! footprint-server binary.
//!
//! Reads `footprint.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, loads the emission factor table once, and serves
//! the JSON API over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use footprint_core::FootprintEngine;
use footprint_server::{ServerConfig, app, expand_tilde, load_factor_table};
use footprint_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Carbon footprint server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "footprint.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = ServerConfig::load(&cli.config)?;

  let factors = load_factor_table(server_cfg.factor_table_path.as_deref())?;
  tracing::info!(version = factors.version(), factors = factors.len(), "factor table loaded");

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create store directory {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let engine = FootprintEngine::new(Arc::new(store), factors, server_cfg.engine.clone());
  let app = app(Arc::new(engine));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
