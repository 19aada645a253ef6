//! Wiring for the `footprint-server` binary: configuration, factor table
//! loading, and the HTTP application.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use footprint_core::{EngineConfig, FootprintEngine, factor::FactorTable, store::FootprintStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `footprint.toml` and
/// `FOOTPRINT_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  pub store_path:        PathBuf,
  /// JSON factor table file. The built-in table is used when unset.
  pub factor_table_path: Option<PathBuf>,
  pub engine:            EngineConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:              "127.0.0.1".into(),
      port:              8080,
      store_path:        PathBuf::from("~/.local/share/footprint/footprint.db"),
      factor_table_path: None,
      engine:            EngineConfig::default(),
    }
  }
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("FOOTPRINT")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read config file")?;

    let cfg: Self = settings.try_deserialize().context("failed to deserialise ServerConfig")?;
    cfg.validate()
  }

  fn validate(self) -> anyhow::Result<Self> {
    footprint_core::facility::check_window(self.engine.window_months)
      .context("invalid engine.window_months")?;
    Ok(self)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Factor table ─────────────────────────────────────────────────────────────

/// Read the factor table named by the config, or fall back to the built-in
/// edition.
pub fn load_factor_table(path: Option<&Path>) -> anyhow::Result<FactorTable> {
  let Some(path) = path else {
    return Ok(FactorTable::builtin());
  };
  let path = expand_tilde(path);
  let json = std::fs::read_to_string(&path)
    .with_context(|| format!("failed to read factor table {path:?}"))?;
  FactorTable::from_json(&json).with_context(|| format!("invalid factor table {path:?}"))
}

// ─── Application ──────────────────────────────────────────────────────────────

/// The API mounted under `/api`, with request tracing.
pub fn app<S: FootprintStore + 'static>(engine: Arc<FootprintEngine<S>>) -> Router {
  Router::new()
    .nest("/api", footprint_api::api_router(engine))
    .layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use footprint_core::{calculate::ElectricityMethod, reconcile::ResyncPolicy};

  use super::*;

  fn from_toml(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert!(cfg.factor_table_path.is_none());
    assert_eq!(cfg.engine, EngineConfig::default());
  }

  #[test]
  fn engine_section_overrides_policies() {
    let cfg = from_toml(
      r#"
      port = 9000

      [engine]
      window_months = 6
      resync_policy = "replace_automated"
      electricity_method = "location_based"

      [engine.quality]
      medium_max_missing = 1
      "#,
    );
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.engine.window_months, 6);
    assert_eq!(cfg.engine.resync_policy, ResyncPolicy::ReplaceAutomated);
    assert_eq!(cfg.engine.electricity_method, ElectricityMethod::LocationBased);
    assert_eq!(cfg.engine.quality.medium_max_missing, 1);
    assert_eq!(cfg.engine.quality.high_max_missing, 0);
  }

  #[test]
  fn window_months_must_be_in_range() {
    assert!(from_toml("[engine]\nwindow_months = 0").validate().is_err());
    assert!(from_toml("[engine]\nwindow_months = 121").validate().is_err());
    assert_eq!(from_toml("[engine]\nwindow_months = 24").validate().unwrap().engine.window_months, 24);
  }

  #[test]
  fn missing_factor_table_path_falls_back_to_builtin() {
    let table = load_factor_table(None).unwrap();
    assert_eq!(table.version(), "builtin-2024");
  }

  #[test]
  fn unreadable_factor_table_is_an_error() {
    assert!(load_factor_table(Some(Path::new("/nonexistent/factors.json"))).is_err());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    assert_eq!(expand_tilde(Path::new("/abs/x.db")), PathBuf::from("/abs/x.db"));
  }
}
