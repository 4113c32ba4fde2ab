//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use noche_core::{
  engine::{EngineConfig, SwipeEngine},
  event::{EventInfo, EventStatus},
  id::{EventId, UserId},
  participant::ParticipantSnapshot,
};
use noche_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

struct Harness {
  app:     Router,
  u1:      String,
  u2:      String,
  outside: String,
}

async fn harness() -> Harness {
  let store = SqliteStore::open_in_memory().await.unwrap();
  store
    .upsert_event(&EventInfo::new("E1", "Friday at Nocturne", EventStatus::Current))
    .await
    .unwrap();
  store
    .upsert_event(&EventInfo::new("OLD", "Last month", EventStatus::Past))
    .await
    .unwrap();
  for id in ["U1", "U2", "U3"] {
    store
      .upsert_profile(&ParticipantSnapshot::new(id, format!("Name {id}")))
      .await
      .unwrap();
    store
      .add_participant(&EventId::from("E1"), &UserId::from(id))
      .await
      .unwrap();
  }

  let u1 = store.issue_token(&UserId::from("U1")).await.unwrap();
  let u2 = store.issue_token(&UserId::from("U2")).await.unwrap();
  let outside = store.issue_token(&UserId::from("U9")).await.unwrap();

  let engine = Arc::new(SwipeEngine::new(Arc::new(store), EngineConfig::default()));
  let app = Router::new().nest("/api", api_router(engine));
  Harness { app, u1, u2, outside }
}

async fn send(
  app: &Router,
  method: &str,
  uri: &str,
  token: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(token) = token {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  let req = match body {
    Some(body) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
  };
  (status, value)
}

async fn swipe(h: &Harness, token: &str, target: &str, kind: &str) -> (StatusCode, Value) {
  send(
    &h.app,
    "POST",
    "/api/events/E1/decisions",
    Some(token),
    Some(json!({ "target": target, "kind": kind })),
  )
  .await
}

// ─── Authentication ──────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_token_is_401_with_challenge() {
  let h = harness().await;
  let req = Request::builder()
    .uri("/api/events/E1/feed")
    .body(Body::empty())
    .unwrap();
  let resp = h.app.clone().oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(
    resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
    "Bearer realm=\"noche\""
  );
}

#[tokio::test]
async fn unknown_token_is_401() {
  let h = harness().await;
  let (status, body) = swipe(&h, "forged", "U2", "like").await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(body["error"].is_string());
}

// ─── Feed ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn feed_lists_undecided_participants() {
  let h = harness().await;
  let (status, body) = send(&h.app, "GET", "/api/events/E1/feed", Some(&h.u1), None).await;
  assert_eq!(status, StatusCode::OK);
  let ids: Vec<&str> = body["participants"]
    .as_array()
    .unwrap()
    .iter()
    .map(|p| p["user_id"].as_str().unwrap())
    .collect();
  assert_eq!(ids, ["U2", "U3"]);
  assert_eq!(body["participants"][0]["display_name"], "Name U2");
  assert_eq!(body["remaining"], 0);
}

#[tokio::test]
async fn feed_limit_is_honoured() {
  let h = harness().await;
  let (status, body) =
    send(&h.app, "GET", "/api/events/E1/feed?limit=1", Some(&h.u1), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["participants"].as_array().unwrap().len(), 1);
  assert_eq!(body["remaining"], 1);
}

#[tokio::test]
async fn feed_for_past_or_unknown_event_is_404() {
  let h = harness().await;
  for uri in ["/api/events/OLD/feed", "/api/events/nope/feed"] {
    let (status, _) = send(&h.app, "GET", uri, Some(&h.u1), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
  }
}

#[tokio::test]
async fn feed_for_outsider_is_403() {
  let h = harness().await;
  let (status, _) = send(&h.app, "GET", "/api/events/E1/feed", Some(&h.outside), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ─── Decisions ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn mutual_like_reports_match_once() {
  let h = harness().await;

  let (status, body) = swipe(&h, &h.u1, "U2", "like").await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["accepted"], true);
  assert_eq!(body["matched"], false);

  let (status, body) = swipe(&h, &h.u2, "U1", "like").await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["matched"], true);
  assert_eq!(body["matched_with"], "U1");
  assert_eq!(body["matched_display_name"], "Name U1");

  let (status, body) = swipe(&h, &h.u2, "U1", "like").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["replayed"], true);
  assert_eq!(body["matched"], false);

  let (status, body) = send(&h.app, "GET", "/api/events/E1/matches", Some(&h.u1), None).await;
  assert_eq!(status, StatusCode::OK);
  let entries = body.as_array().unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0]["partner"], "U2");
  assert_eq!(entries[0]["partner_name"], "Name U2");
}

#[tokio::test]
async fn changed_decision_is_409() {
  let h = harness().await;
  swipe(&h, &h.u1, "U3", "dislike").await;
  let (status, body) = swipe(&h, &h.u1, "U3", "like").await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body["error"].as_str().unwrap().contains("dislike"));
}

#[tokio::test]
async fn bad_targets_are_422() {
  let h = harness().await;
  let (status, _) = swipe(&h, &h.u1, "U1", "like").await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

  let (status, _) = swipe(&h, &h.u1, "stranger", "like").await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_kind_is_rejected() {
  let h = harness().await;
  let (status, _) = swipe(&h, &h.u1, "U2", "superlike").await;
  assert!(status.is_client_error());
  assert_ne!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn matches_for_past_event_are_still_served() {
  let h = harness().await;
  let (status, body) = send(&h.app, "GET", "/api/events/OLD/matches", Some(&h.u1), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!([]));
}
