//! Storage and collaborator traits.
//!
//! The traits are implemented by storage backends (e.g. `noche-store-sqlite`
//! and [`crate::memory::MemoryStore`]). The engine depends on these
//! abstractions, not on any concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  decision::{Decision, DecisionPut, NewDecision},
  event::EventInfo,
  id::{EventId, PairKey, UserId},
  matching::{Match, MatchInsert},
  participant::ParticipantSnapshot,
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Backend errors must say whether retrying the same call may succeed
/// (busy database, dropped connection) or not (corrupt row, constraint bug).
pub trait StorageError: std::error::Error + Send + Sync + 'static {
  fn is_transient(&self) -> bool;
}

/// Shared by every storage trait so one backend has one error type.
pub trait Backend: Send + Sync {
  type Error: StorageError;
}

// ─── Decisions ───────────────────────────────────────────────────────────────

/// Durable record of every swipe.
///
/// The store's only policy is pair uniqueness: at most one decision per
/// `(event_id, from_user, to_user)`, enforced atomically by the store itself.
pub trait DecisionStore: Backend {
  /// Insert `decision` unless one already exists for its triple, in which
  /// case the existing row is returned untouched as
  /// [`DecisionPut::Conflict`].
  fn put(
    &self,
    decision: NewDecision,
  ) -> impl Future<Output = Result<DecisionPut, Self::Error>> + Send + '_;

  fn get<'a>(
    &'a self,
    event_id: &'a EventId,
    from: &'a UserId,
    to: &'a UserId,
  ) -> impl Future<Output = Result<Option<Decision>, Self::Error>> + Send + 'a;

  fn exists<'a>(
    &'a self,
    event_id: &'a EventId,
    from: &'a UserId,
    to: &'a UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a {
    async move { Ok(self.get(event_id, from, to).await?.is_some()) }
  }

  /// Every user `from` has already liked or disliked in `event_id`.
  fn decided_targets<'a>(
    &'a self,
    event_id: &'a EventId,
    from: &'a UserId,
  ) -> impl Future<Output = Result<Vec<UserId>, Self::Error>> + Send + 'a;

  /// Record that match detection for the like `from -> to` has resolved.
  fn mark_detected<'a>(
    &'a self,
    event_id: &'a EventId,
    from: &'a UserId,
    to: &'a UserId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Likes created at or before `older_than` whose detection has not
  /// resolved, oldest first.
  fn pending_detections(
    &self,
    older_than: DateTime<Utc>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Decision>, Self::Error>> + Send + '_;
}

// ─── Matches ─────────────────────────────────────────────────────────────────

pub trait MatchStore: Backend {
  /// Atomically create the match for `(event_id, pair)` unless it exists.
  /// Exactly one of any number of concurrent callers sees
  /// [`MatchInsert::Created`].
  fn insert_match_if_absent<'a>(
    &'a self,
    event_id: &'a EventId,
    pair: &'a PairKey,
  ) -> impl Future<Output = Result<MatchInsert, Self::Error>> + Send + 'a;

  fn get_match<'a>(
    &'a self,
    event_id: &'a EventId,
    pair: &'a PairKey,
  ) -> impl Future<Output = Result<Option<Match>, Self::Error>> + Send + 'a;

  /// All matches in `event_id` involving `user`, oldest first.
  fn matches_for<'a>(
    &'a self,
    event_id: &'a EventId,
    user: &'a UserId,
  ) -> impl Future<Output = Result<Vec<Match>, Self::Error>> + Send + 'a;
}

// ─── External collaborators ──────────────────────────────────────────────────

/// Read-only view of the venue/event directory and profile service.
pub trait Directory: Backend {
  fn event<'a>(
    &'a self,
    event_id: &'a EventId,
  ) -> impl Future<Output = Result<Option<EventInfo>, Self::Error>> + Send + 'a;

  fn is_participant<'a>(
    &'a self,
    event_id: &'a EventId,
    user: &'a UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// The event roster in a stable order.
  fn roster<'a>(
    &'a self,
    event_id: &'a EventId,
  ) -> impl Future<Output = Result<Vec<UserId>, Self::Error>> + Send + 'a;

  /// Profiles for `users`, in the same order. Users without a profile are
  /// left out of the result rather than failing the call; the feed passes
  /// over them and fills the page from the next candidates.
  fn profiles<'a>(
    &'a self,
    users: &'a [UserId],
  ) -> impl Future<Output = Result<Vec<ParticipantSnapshot>, Self::Error>> + Send + 'a;
}

/// Resolves an opaque bearer credential to the user it was issued for.
pub trait Authenticator: Backend {
  /// `None` if the token is unknown or revoked.
  fn authenticate<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<UserId>, Self::Error>> + Send + 'a;
}

/// Everything the swipe engine needs from one backend.
pub trait SwipeBackend: DecisionStore + MatchStore + Directory {}

impl<T> SwipeBackend for T where T: DecisionStore + MatchStore + Directory {}
