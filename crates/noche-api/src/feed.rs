//! Handler for the participant feed.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/events/{event_id}/feed` | Optional `?limit=N`, clamped by config |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use noche_core::{
  engine::{FeedPage, SwipeEngine},
  id::EventId,
};
use serde::Deserialize;

use crate::{ApiBackend, auth::CallerIdentity, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct FeedParams {
  pub limit: Option<usize>,
}

/// `GET /events/{event_id}/feed[?limit=N]`
pub async fn handler<S>(
  State(engine): State<Arc<SwipeEngine<S>>>,
  CallerIdentity(caller): CallerIdentity,
  Path(event_id): Path<EventId>,
  Query(params): Query<FeedParams>,
) -> Result<Json<FeedPage>, ApiError>
where
  S: ApiBackend,
{
  let page = engine.feed_page(&caller, &event_id, params.limit).await?;
  Ok(Json(page))
}
