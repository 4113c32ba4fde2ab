//! Error types for `noche-core`.

use thiserror::Error;

use crate::{
  decision::DecisionKind,
  id::{EventId, UserId},
};

/// Why a swipe target was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum TargetRejection {
  #[strum(to_string = "cannot swipe on yourself")]
  SelfSwipe,
  #[strum(to_string = "not on the event roster")]
  NotOnRoster,
}

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("caller is not authenticated")]
  Unauthenticated,

  #[error("event {0} is unknown or not open for swiping")]
  InvalidEvent(EventId),

  #[error("invalid target {target}: {reason}")]
  InvalidTarget {
    target: UserId,
    reason: TargetRejection,
  },

  #[error("caller is not a participant of event {0}")]
  NotParticipant(EventId),

  #[error("already decided {existing} on this participant, cannot change to {requested}")]
  ConflictingDecision {
    existing:  DecisionKind,
    requested: DecisionKind,
  },

  /// A like is committed but its match detection has not resolved. Never
  /// surfaced to clients; the reconciliation sweep picks it up.
  #[error("match detection pending for {from} -> {to} in event {event_id}")]
  DetectionPending {
    event_id: EventId,
    from:     UserId,
    to:       UserId,
  },

  #[error("storage unavailable after {attempts} attempt(s) during {op}: {source}")]
  StorageUnavailable {
    op:       &'static str,
    attempts: u32,
    #[source]
    source:   BoxedError,
  },

  #[error("storage error: {0}")]
  Storage(#[source] BoxedError),
}

impl Error {
  /// Whether a client may reasonably retry the same request later.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::StorageUnavailable { .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
