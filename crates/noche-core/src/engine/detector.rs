//! Mutual-like detection.

use crate::{
  Error, Result,
  decision::DecisionKind,
  error::TargetRejection,
  id::{EventId, PairKey, UserId},
  matching::{MatchInsert, MatchOutcome},
  retry::RetryPolicy,
  store::SwipeBackend,
};

/// Turns a committed like into a match when the reverse like exists.
///
/// Only the swipe engine calls this, and only after the like `liker -> liked`
/// is persisted. The existence check is a plain read; the creation step is
/// the store's atomic insert-if-absent on the canonical pair, so two likes
/// completing the same pair concurrently produce exactly one
/// [`MatchOutcome::Created`].
pub struct MatchDetector<'e, S> {
  backend: &'e S,
  retry:   &'e RetryPolicy,
}

impl<'e, S> MatchDetector<'e, S>
where
  S: SwipeBackend,
{
  pub fn new(backend: &'e S, retry: &'e RetryPolicy) -> Self { Self { backend, retry } }

  pub async fn try_create_match(
    &self,
    event_id: &EventId,
    liker: &UserId,
    liked: &UserId,
  ) -> Result<MatchOutcome> {
    let backend = self.backend;
    let reverse = self
      .retry
      .run("reverse decision lookup", move || backend.get(event_id, liked, liker))
      .await?;
    if !reverse.is_some_and(|d| d.kind == DecisionKind::Like) {
      return Ok(MatchOutcome::NoMatch);
    }

    let pair = PairKey::new(liker.clone(), liked.clone()).ok_or_else(|| {
      Error::InvalidTarget { target: liked.clone(), reason: TargetRejection::SelfSwipe }
    })?;
    let pair = &pair;
    let inserted = self
      .retry
      .run("match insert", move || backend.insert_match_if_absent(event_id, pair))
      .await?;

    Ok(match inserted {
      MatchInsert::Created(record) => {
        tracing::info!(
          event = %event_id,
          user_a = %record.user_a,
          user_b = %record.user_b,
          match_id = %record.match_id,
          "match created"
        );
        MatchOutcome::Created(record)
      }
      MatchInsert::Existing(record) => {
        tracing::debug!(event = %event_id, match_id = %record.match_id, "match already exists");
        MatchOutcome::AlreadyMatched(record)
      }
    })
  }
}
