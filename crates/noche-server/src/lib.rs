//! HTTP server assembly for Noche.
//!
//! Wires the SQLite store, the swipe engine and the JSON API together, and
//! owns the background tasks that run beside the router: the detection
//! sweep and the match-event logger.

pub mod seed;
pub mod tasks;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{Router, routing::get};
use config::{ConfigError, Environment, File, builder::DefaultState};
use noche_api::ApiBackend;
use noche_core::engine::{EngineConfig, SwipeEngine};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `NOCHE__`-prefixed environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  #[serde(default)]
  pub engine:     EngineConfig,
  #[serde(default)]
  pub sweep:      SweepConfig,
}

/// Schedule of the detection reconciliation sweep.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SweepConfig {
  pub interval_secs: u64,
  pub batch_size:    usize,
}

impl Default for SweepConfig {
  fn default() -> Self { Self { interval_secs: 30, batch_size: 200 } }
}

/// A config builder preloaded with defaults for every required key.
pub fn config_builder() -> Result<config::ConfigBuilder<DefaultState>, ConfigError> {
  config::Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8080)?
    .set_default("store_path", "~/.local/share/noche/noche.db")
}

/// Load configuration from `path` (optional) and the environment.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
  config_builder()?
    .add_source(File::from(path).required(false))
    .add_source(
      Environment::with_prefix("NOCHE")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true),
    )
    .build()?
    .try_deserialize()
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

// ─── Router ──────────────────────────────────────────────────────────────────

/// The full application router: `/healthz` plus the API under `/api`.
pub fn app<S>(engine: Arc<SwipeEngine<S>>) -> Router
where
  S: ApiBackend,
{
  Router::new()
    .route("/healthz", get(|| async { "ok" }))
    .nest("/api", noche_api::api_router(engine))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use config::FileFormat;
  use noche_core::memory::MemoryStore;
  use tower::ServiceExt as _;

  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    config_builder()
      .unwrap()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn defaults_apply_to_empty_file() {
    let cfg = parse("");
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.engine, EngineConfig::default());
    assert_eq!(cfg.sweep, SweepConfig::default());
  }

  #[test]
  fn nested_sections_override_defaults() {
    let cfg = parse(
      r#"
        port       = 9000
        store_path = "/var/lib/noche/noche.db"

        [engine]
        max_page_size = 50

        [engine.retry]
        max_attempts = 5

        [sweep]
        interval_secs = 10
      "#,
    );
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/noche/noche.db"));
    assert_eq!(cfg.engine.max_page_size, 50);
    assert_eq!(cfg.engine.default_page_size, 20);
    assert_eq!(cfg.engine.retry.max_attempts, 5);
    assert_eq!(cfg.engine.retry.initial_backoff_ms, 25);
    assert_eq!(cfg.sweep.interval_secs, 10);
    assert_eq!(cfg.sweep.batch_size, 200);
  }

  #[test]
  fn tilde_expands_only_at_start() {
    let plain = Path::new("/tmp/noche.db");
    assert_eq!(expand_tilde(plain), plain);
    let odd = Path::new("data/~/noche.db");
    assert_eq!(expand_tilde(odd), odd);
  }

  #[tokio::test]
  async fn healthz_and_api_are_mounted() {
    let engine = Arc::new(SwipeEngine::new(
      Arc::new(MemoryStore::new()),
      EngineConfig::default(),
    ));
    let router = app(engine);

    let resp = router
      .clone()
      .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router
      .oneshot(
        Request::builder()
          .uri("/api/events/E1/matches")
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }
}
