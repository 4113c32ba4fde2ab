//! [`MemoryStore`], an in-process implementation of every storage trait.
//!
//! Suitable for embedding and tests. All state sits behind one mutex, which
//! is never held across an `.await`; each trait call is a single critical
//! section, so conditional inserts are atomic.

use std::{
  collections::{BTreeMap, HashMap},
  sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
  decision::{Decision, DecisionPut, NewDecision},
  event::EventInfo,
  id::{EventId, PairKey, UserId},
  matching::{Match, MatchInsert},
  participant::ParticipantSnapshot,
  store::{Authenticator, Backend, DecisionStore, Directory, MatchStore, StorageError},
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("memory store lock poisoned")]
  Poisoned,
}

impl StorageError for MemoryError {
  fn is_transient(&self) -> bool { false }
}

type DecisionKey = (EventId, UserId, UserId);

#[derive(Default)]
struct State {
  events:    HashMap<EventId, EventInfo>,
  rosters:   HashMap<EventId, Vec<UserId>>,
  profiles:  HashMap<UserId, ParticipantSnapshot>,
  decisions: BTreeMap<DecisionKey, Decision>,
  matches:   HashMap<(EventId, PairKey), Match>,
  tokens:    HashMap<String, UserId>,
}

#[derive(Default)]
pub struct MemoryStore {
  state: Mutex<State>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> Result<MutexGuard<'_, State>, MemoryError> {
    self.state.lock().map_err(|_| MemoryError::Poisoned)
  }

  // ── Directory writes ──────────────────────────────────────────────────────

  pub fn upsert_event(&self, event: EventInfo) -> Result<(), MemoryError> {
    self.lock()?.events.insert(event.event_id.clone(), event);
    Ok(())
  }

  pub fn upsert_profile(&self, profile: ParticipantSnapshot) -> Result<(), MemoryError> {
    self.lock()?.profiles.insert(profile.user_id.clone(), profile);
    Ok(())
  }

  /// Append `user` to the roster of `event_id`; a no-op if already listed.
  pub fn add_participant(&self, event_id: &EventId, user: &UserId) -> Result<(), MemoryError> {
    let mut state = self.lock()?;
    let roster = state.rosters.entry(event_id.clone()).or_default();
    if !roster.contains(user) {
      roster.push(user.clone());
    }
    Ok(())
  }

  pub fn remove_participant(&self, event_id: &EventId, user: &UserId) -> Result<(), MemoryError> {
    if let Some(roster) = self.lock()?.rosters.get_mut(event_id) {
      roster.retain(|u| u != user);
    }
    Ok(())
  }

  pub fn insert_token(&self, token: impl Into<String>, user: UserId) -> Result<(), MemoryError> {
    self.lock()?.tokens.insert(token.into(), user);
    Ok(())
  }

  /// Number of stored decisions, across all events.
  pub fn decision_count(&self) -> Result<usize, MemoryError> { Ok(self.lock()?.decisions.len()) }

  /// Number of stored matches, across all events.
  pub fn match_count(&self) -> Result<usize, MemoryError> { Ok(self.lock()?.matches.len()) }
}

impl Backend for MemoryStore {
  type Error = MemoryError;
}

// ─── DecisionStore ───────────────────────────────────────────────────────────

impl DecisionStore for MemoryStore {
  async fn put(&self, decision: NewDecision) -> Result<DecisionPut, MemoryError> {
    let mut state = self.lock()?;
    let key = (decision.event_id.clone(), decision.from_user.clone(), decision.to_user.clone());
    if let Some(existing) = state.decisions.get(&key) {
      return Ok(DecisionPut::Conflict(existing.clone()));
    }
    let stored = Decision {
      event_id:    decision.event_id,
      from_user:   decision.from_user,
      to_user:     decision.to_user,
      kind:        decision.kind,
      created_at:  Utc::now(),
      detected_at: None,
    };
    state.decisions.insert(key, stored.clone());
    Ok(DecisionPut::Recorded(stored))
  }

  async fn get(
    &self,
    event_id: &EventId,
    from: &UserId,
    to: &UserId,
  ) -> Result<Option<Decision>, MemoryError> {
    let key = (event_id.clone(), from.clone(), to.clone());
    Ok(self.lock()?.decisions.get(&key).cloned())
  }

  async fn decided_targets(
    &self,
    event_id: &EventId,
    from: &UserId,
  ) -> Result<Vec<UserId>, MemoryError> {
    Ok(
      self
        .lock()?
        .decisions
        .values()
        .filter(|d| &d.event_id == event_id && &d.from_user == from)
        .map(|d| d.to_user.clone())
        .collect(),
    )
  }

  async fn mark_detected(
    &self,
    event_id: &EventId,
    from: &UserId,
    to: &UserId,
  ) -> Result<(), MemoryError> {
    let key = (event_id.clone(), from.clone(), to.clone());
    if let Some(d) = self.lock()?.decisions.get_mut(&key)
      && d.is_like()
    {
      d.detected_at = Some(Utc::now());
    }
    Ok(())
  }

  async fn pending_detections(
    &self,
    older_than: DateTime<Utc>,
    limit: usize,
  ) -> Result<Vec<Decision>, MemoryError> {
    let mut pending: Vec<Decision> = self
      .lock()?
      .decisions
      .values()
      .filter(|d| d.detection_pending() && d.created_at <= older_than)
      .cloned()
      .collect();
    pending.sort_by_key(|d| d.created_at);
    pending.truncate(limit);
    Ok(pending)
  }
}

// ─── MatchStore ──────────────────────────────────────────────────────────────

impl MatchStore for MemoryStore {
  async fn insert_match_if_absent(
    &self,
    event_id: &EventId,
    pair: &PairKey,
  ) -> Result<MatchInsert, MemoryError> {
    let mut state = self.lock()?;
    let key = (event_id.clone(), pair.clone());
    if let Some(existing) = state.matches.get(&key) {
      return Ok(MatchInsert::Existing(existing.clone()));
    }
    let record = Match::new(event_id.clone(), pair);
    state.matches.insert(key, record.clone());
    Ok(MatchInsert::Created(record))
  }

  async fn get_match(
    &self,
    event_id: &EventId,
    pair: &PairKey,
  ) -> Result<Option<Match>, MemoryError> {
    Ok(self.lock()?.matches.get(&(event_id.clone(), pair.clone())).cloned())
  }

  async fn matches_for(
    &self,
    event_id: &EventId,
    user: &UserId,
  ) -> Result<Vec<Match>, MemoryError> {
    let mut found: Vec<Match> = self
      .lock()?
      .matches
      .values()
      .filter(|m| &m.event_id == event_id && m.involves(user))
      .cloned()
      .collect();
    found.sort_by_key(|m| m.created_at);
    Ok(found)
  }
}

// ─── Directory ───────────────────────────────────────────────────────────────

impl Directory for MemoryStore {
  async fn event(&self, event_id: &EventId) -> Result<Option<EventInfo>, MemoryError> {
    Ok(self.lock()?.events.get(event_id).cloned())
  }

  async fn is_participant(&self, event_id: &EventId, user: &UserId) -> Result<bool, MemoryError> {
    Ok(
      self
        .lock()?
        .rosters
        .get(event_id)
        .is_some_and(|roster| roster.contains(user)),
    )
  }

  async fn roster(&self, event_id: &EventId) -> Result<Vec<UserId>, MemoryError> {
    Ok(self.lock()?.rosters.get(event_id).cloned().unwrap_or_default())
  }

  async fn profiles(&self, users: &[UserId]) -> Result<Vec<ParticipantSnapshot>, MemoryError> {
    let state = self.lock()?;
    Ok(users.iter().filter_map(|u| state.profiles.get(u).cloned()).collect())
  }
}

impl Authenticator for MemoryStore {
  async fn authenticate(&self, token: &str) -> Result<Option<UserId>, MemoryError> {
    Ok(self.lock()?.tokens.get(token).cloned())
  }
}
