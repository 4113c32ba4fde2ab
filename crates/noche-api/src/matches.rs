//! Handler for listing a caller's matches.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/events/{event_id}/matches` | Also served for past events |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use noche_core::{engine::SwipeEngine, id::EventId, matching::MatchEntry};

use crate::{ApiBackend, auth::CallerIdentity, error::ApiError};

/// `GET /events/{event_id}/matches`
pub async fn list<S>(
  State(engine): State<Arc<SwipeEngine<S>>>,
  CallerIdentity(caller): CallerIdentity,
  Path(event_id): Path<EventId>,
) -> Result<Json<Vec<MatchEntry>>, ApiError>
where
  S: ApiBackend,
{
  let entries = engine.matches(&caller, &event_id).await?;
  Ok(Json(entries))
}
