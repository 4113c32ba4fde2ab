//! Resolution of client settings from flags, config file and defaults.

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::client::{ApiConfig, EnvToken, StaticToken, TokenProvider};

pub const DEFAULT_URL: &str = "http://localhost:8080";

/// Read on every request when no token is configured.
pub const TOKEN_ENV: &str = "NOCHE_TOKEN";

/// Shape of the optional TOML config file.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
pub struct ConfigFile {
  #[serde(default)]
  pub url:   Option<String>,
  #[serde(default)]
  pub token: Option<String>,
}

impl ConfigFile {
  pub fn load(path: &Path) -> Result<Self> {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")
  }
}

/// CLI flags override the config file, which overrides defaults. Without a
/// token from either, the token is taken from `NOCHE_TOKEN` at request time.
pub fn api_config(url: Option<String>, token: Option<String>, file: ConfigFile) -> ApiConfig {
  let base_url = url
    .or(file.url)
    .filter(|u| !u.is_empty())
    .unwrap_or_else(|| DEFAULT_URL.to_owned());

  let token_provider: Arc<dyn TokenProvider> = match token.or(file.token) {
    Some(token) if !token.is_empty() => Arc::new(StaticToken(token)),
    _ => Arc::new(EnvToken::new(TOKEN_ENV)),
  };

  ApiConfig { base_url, token_provider }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn file(url: Option<&str>, token: Option<&str>) -> ConfigFile {
    ConfigFile { url: url.map(str::to_owned), token: token.map(str::to_owned) }
  }

  #[test]
  fn flags_beat_file() {
    let cfg = api_config(
      Some("http://flag".into()),
      Some("flag-token".into()),
      file(Some("http://file"), Some("file-token")),
    );
    assert_eq!(cfg.base_url, "http://flag");
    assert_eq!(cfg.token_provider.token().unwrap().as_deref(), Some("flag-token"));
  }

  #[test]
  fn file_beats_defaults() {
    let cfg = api_config(None, None, file(Some("http://file"), Some("file-token")));
    assert_eq!(cfg.base_url, "http://file");
    assert_eq!(cfg.token_provider.token().unwrap().as_deref(), Some("file-token"));
  }

  #[test]
  fn defaults_when_nothing_is_set() {
    let cfg = api_config(None, None, ConfigFile::default());
    assert_eq!(cfg.base_url, DEFAULT_URL);
  }

  #[test]
  fn parses_toml() {
    let parsed: ConfigFile = toml::from_str("url = \"http://x:1\"\ntoken = \"t\"").unwrap();
    assert_eq!(parsed, file(Some("http://x:1"), Some("t")));
  }
}
