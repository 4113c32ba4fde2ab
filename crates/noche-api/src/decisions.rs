//! Handler for swipe submission.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/events/{event_id}/decisions` | Body: `{"target":"U2","kind":"like"}` |
//!
//! Answers `201 Created` when the decision was written and `200 OK` when an
//! identical decision already existed.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use noche_core::{
  decision::DecisionKind,
  engine::{SwipeEngine, SwipeOutcome},
  id::{EventId, UserId},
};
use serde::Deserialize;

use crate::{ApiBackend, auth::CallerIdentity, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
  pub target: UserId,
  pub kind:   DecisionKind,
}

/// `POST /events/{event_id}/decisions`
pub async fn create<S>(
  State(engine): State<Arc<SwipeEngine<S>>>,
  CallerIdentity(caller): CallerIdentity,
  Path(event_id): Path<EventId>,
  Json(body): Json<DecisionBody>,
) -> Result<(StatusCode, Json<SwipeOutcome>), ApiError>
where
  S: ApiBackend,
{
  let outcome = engine
    .submit_decision(&caller, &event_id, &body.target, body.kind)
    .await?;
  let status = if outcome.replayed { StatusCode::OK } else { StatusCode::CREATED };
  Ok((status, Json(outcome)))
}
