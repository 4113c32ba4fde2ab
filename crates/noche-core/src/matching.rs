//! Matches: materialised mutual likes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::id::{EventId, PairKey, UserId};

/// Two users who liked each other within one event. `user_a < user_b`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
  pub match_id:   Uuid,
  pub event_id:   EventId,
  pub user_a:     UserId,
  pub user_b:     UserId,
  pub created_at: DateTime<Utc>,
}

impl Match {
  /// Build a fresh match row for a canonical pair.
  pub fn new(event_id: EventId, pair: &PairKey) -> Self {
    Self {
      match_id: Uuid::new_v4(),
      event_id,
      user_a: pair.low().clone(),
      user_b: pair.high().clone(),
      created_at: Utc::now(),
    }
  }

  pub fn involves(&self, user: &UserId) -> bool {
    &self.user_a == user || &self.user_b == user
  }

  pub fn partner_of(&self, user: &UserId) -> Option<&UserId> {
    if &self.user_a == user {
      Some(&self.user_b)
    } else if &self.user_b == user {
      Some(&self.user_a)
    } else {
      None
    }
  }
}

/// Result of an atomic insert-if-absent on `(event_id, pair)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchInsert {
  Created(Match),
  /// Another writer got there first; this is their row.
  Existing(Match),
}

/// What the match detector concluded for one like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
  /// The reverse like does not exist (yet).
  NoMatch,
  /// This call created the match and owns the match-created signal.
  Created(Match),
  /// The match already existed; no signal may be fired.
  AlreadyMatched(Match),
}

/// Broadcast exactly once per materialised match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCreated {
  #[serde(rename = "match")]
  pub record:       Match,
  /// The user whose like completed the pair.
  pub triggered_by: UserId,
}

/// A caller's view of one of their matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEntry {
  pub match_id:     Uuid,
  pub event_id:     EventId,
  pub partner:      UserId,
  pub partner_name: Option<String>,
  pub matched_at:   DateTime<Utc>,
}
