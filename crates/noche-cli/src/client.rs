//! Async HTTP client wrapping the Noche JSON API.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, anyhow};
use noche_core::{
  decision::DecisionKind,
  engine::{FeedPage, SwipeOutcome},
  matching::MatchEntry,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// Supplies the bearer token for each request.
pub trait TokenProvider: Send + Sync {
  /// `None` sends the request without credentials.
  fn token(&self) -> Result<Option<String>>;
}

/// A token fixed at startup.
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
  fn token(&self) -> Result<Option<String>> { Ok(Some(self.0.clone())) }
}

/// A token read from an environment variable on every request.
pub struct EnvToken {
  var: String,
}

impl EnvToken {
  pub fn new(var: impl Into<String>) -> Self { Self { var: var.into() } }
}

impl TokenProvider for EnvToken {
  fn token(&self) -> Result<Option<String>> {
    match std::env::var(&self.var) {
      Ok(token) if !token.is_empty() => Ok(Some(token)),
      Ok(_) | Err(std::env::VarError::NotPresent) => Ok(None),
      Err(e) => Err(anyhow!("reading {}: {e}", self.var)),
    }
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Connection settings for the Noche API.
#[derive(Clone)]
pub struct ApiConfig {
  pub base_url:       String,
  pub token_provider: Arc<dyn TokenProvider>,
}

/// Async HTTP client for the Noche JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
    Ok(match self.config.token_provider.token()? {
      Some(token) => req.bearer_auth(token),
      None => req,
    })
  }

  /// Decode a success body, or turn an error response into a readable error.
  async fn decode<T: DeserializeOwned>(what: &str, resp: Response) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
      return resp.json().await.with_context(|| format!("deserialising {what}"));
    }
    let message = resp
      .json::<serde_json::Value>()
      .await
      .ok()
      .and_then(|body| body["error"].as_str().map(str::to_owned))
      .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_owned());
    Err(anyhow!("{what} → {status}: {message}"))
  }

  /// `GET /api/events/{event_id}/feed[?limit=N]`
  pub async fn feed(&self, event_id: &str, limit: Option<usize>) -> Result<FeedPage> {
    let mut req = self.client.get(self.url(&format!("/events/{event_id}/feed")));
    if let Some(limit) = limit {
      req = req.query(&[("limit", limit)]);
    }
    let resp = self
      .auth(req)?
      .send()
      .await
      .context("GET feed failed")?;
    Self::decode("feed", resp).await
  }

  /// `POST /api/events/{event_id}/decisions`
  pub async fn decide(
    &self,
    event_id: &str,
    target: &str,
    kind: DecisionKind,
  ) -> Result<SwipeOutcome> {
    let req = self
      .client
      .post(self.url(&format!("/events/{event_id}/decisions")))
      .json(&json!({ "target": target, "kind": kind }));
    let resp = self
      .auth(req)?
      .send()
      .await
      .context("POST decision failed")?;
    Self::decode("decision", resp).await
  }

  /// `GET /api/events/{event_id}/matches`
  pub async fn matches(&self, event_id: &str) -> Result<Vec<MatchEntry>> {
    let req = self.client.get(self.url(&format!("/events/{event_id}/matches")));
    let resp = self
      .auth(req)?
      .send()
      .await
      .context("GET matches failed")?;
    Self::decode("matches", resp).await
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use noche_core::{
    engine::{EngineConfig, SwipeEngine},
    event::{EventInfo, EventStatus},
    id::{EventId, UserId},
    memory::MemoryStore,
    participant::ParticipantSnapshot,
  };
  use tokio::net::TcpListener;

  use super::*;

  /// Serve the API over a real socket on an ephemeral port.
  async fn spawn_server() -> String {
    let store = MemoryStore::new();
    store.upsert_event(EventInfo::new("E1", "E1", EventStatus::Current)).unwrap();
    for id in ["U1", "U2"] {
      store.upsert_profile(ParticipantSnapshot::new(id, format!("Name {id}"))).unwrap();
      store.add_participant(&EventId::from("E1"), &UserId::from(id)).unwrap();
      store.insert_token(format!("tok-{id}"), UserId::from(id)).unwrap();
    }
    let engine = Arc::new(SwipeEngine::new(Arc::new(store), EngineConfig::default()));
    let app = axum::Router::new().nest("/api", noche_api::api_router(engine));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}/")
  }

  fn client(base_url: &str, token: Option<&str>) -> ApiClient {
    let token_provider: Arc<dyn TokenProvider> = match token {
      Some(t) => Arc::new(StaticToken(t.to_owned())),
      None => Arc::new(EnvToken::new("NOCHE_TEST_TOKEN_THAT_IS_NEVER_SET")),
    };
    ApiClient::new(ApiConfig { base_url: base_url.to_owned(), token_provider }).unwrap()
  }

  #[test]
  fn url_joins_without_double_slash() {
    let c = client("http://localhost:8080/", None);
    assert_eq!(c.url("/events/E1/feed"), "http://localhost:8080/api/events/E1/feed");
  }

  #[test]
  fn missing_env_token_sends_no_credentials() {
    let provider = EnvToken::new("NOCHE_TEST_TOKEN_THAT_IS_NEVER_SET");
    assert_eq!(provider.token().unwrap(), None);
  }

  #[tokio::test]
  async fn swipe_flow_over_http() {
    let base = spawn_server().await;
    let u1 = client(&base, Some("tok-U1"));
    let u2 = client(&base, Some("tok-U2"));

    let page = u1.feed("E1", Some(10)).await.unwrap();
    assert_eq!(page.participants.len(), 1);
    assert_eq!(page.participants[0].user_id.as_str(), "U2");

    let first = u1.decide("E1", "U2", DecisionKind::Like).await.unwrap();
    assert!(!first.matched);
    let second = u2.decide("E1", "U1", DecisionKind::Like).await.unwrap();
    assert!(second.matched);
    assert_eq!(second.matched_display_name.as_deref(), Some("Name U1"));

    let matches = u1.matches("E1").await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].partner.as_str(), "U2");
  }

  #[tokio::test]
  async fn api_errors_carry_server_message() {
    let base = spawn_server().await;

    let err = client(&base, None).feed("E1", None).await.unwrap_err();
    assert!(err.to_string().contains("401"), "{err}");

    let err = client(&base, Some("tok-U1"))
      .decide("E1", "U1", DecisionKind::Like)
      .await
      .unwrap_err();
    assert!(err.to_string().contains("cannot swipe on yourself"), "{err}");
  }
}
