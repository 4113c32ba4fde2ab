//! Decisions: one user's like or dislike of another within one event.
//!
//! A decision is written once and never rewritten. The only column a store
//! may fill in later is the detection marker on likes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{EventId, UserId};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DecisionKind {
  Like,
  Dislike,
}

/// A persisted swipe. Unique per `(event_id, from_user, to_user)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
  pub event_id:    EventId,
  pub from_user:   UserId,
  pub to_user:     UserId,
  pub kind:        DecisionKind,
  /// Server-assigned; never changes after creation.
  pub created_at:  DateTime<Utc>,
  /// When match detection for this like last resolved. Always `None` for
  /// dislikes; `None` on a like means detection is still pending.
  pub detected_at: Option<DateTime<Utc>>,
}

impl Decision {
  pub fn is_like(&self) -> bool { self.kind == DecisionKind::Like }

  pub fn detection_pending(&self) -> bool {
    self.is_like() && self.detected_at.is_none()
  }
}

/// Input to [`crate::store::DecisionStore::put`]. `created_at` is always set
/// by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDecision {
  pub event_id:  EventId,
  pub from_user: UserId,
  pub to_user:   UserId,
  pub kind:      DecisionKind,
}

/// Result of a uniqueness-enforcing decision write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionPut {
  /// No decision existed for the triple; this one is now stored.
  Recorded(Decision),
  /// A decision already existed for the triple and was left untouched. It may
  /// or may not have the same kind as the rejected write.
  Conflict(Decision),
}
