//! The swipe engine, the session controller that ties decisions, match
//! detection and the participant feed together.
//!
//! [`SwipeEngine`] is the sole writer of decisions and the sole caller of the
//! [`MatchDetector`]. Every storage call goes through the configured
//! [`RetryPolicy`].

mod detector;
mod feed;
mod reconcile;


use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{
  Error, Result,
  decision::{Decision, DecisionKind, DecisionPut, NewDecision},
  error::TargetRejection,
  event::EventInfo,
  id::{EventId, UserId},
  matching::{Match, MatchCreated, MatchEntry, MatchOutcome},
  retry::RetryPolicy,
  store::SwipeBackend,
};

pub use detector::MatchDetector;
pub use feed::{Feed, FeedPage};
pub use reconcile::SweepReport;

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Feed page size when the caller does not ask for one.
  pub default_page_size: usize,
  /// Upper bound on any requested page size.
  pub max_page_size:     usize,
  pub retry:             RetryPolicy,
  /// The reconciliation sweep leaves likes younger than this alone, so it
  /// does not race requests that are still running their own detection.
  pub sweep_grace_ms:    u64,
  /// Buffer size of the match-created broadcast channel.
  pub event_capacity:    usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      default_page_size: 20,
      max_page_size:     100,
      retry:             RetryPolicy::default(),
      sweep_grace_ms:    5_000,
      event_capacity:    256,
    }
  }
}

impl EngineConfig {
  /// Clamp a requested page size into `1..=max_page_size`.
  pub fn page_size(&self, requested: Option<usize>) -> usize {
    requested
      .unwrap_or(self.default_page_size)
      .clamp(1, self.max_page_size.max(1))
  }
}

// ─── Caller ──────────────────────────────────────────────────────────────────

/// Who is making a request, as resolved by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
  Anonymous,
  User(UserId),
}

impl Caller {
  pub fn user(&self) -> Result<&UserId> {
    match self {
      Self::User(id) => Ok(id),
      Self::Anonymous => Err(Error::Unauthenticated),
    }
  }
}

impl From<Option<UserId>> for Caller {
  fn from(id: Option<UserId>) -> Self { id.map_or(Self::Anonymous, Self::User) }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Response to a swipe submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeOutcome {
  pub accepted:             bool,
  /// `true` if an identical decision already existed and nothing was written.
  pub replayed:             bool,
  /// `true` only on the call that created the match.
  pub matched:              bool,
  pub matched_with:         Option<UserId>,
  pub matched_display_name: Option<String>,
}

impl SwipeOutcome {
  fn accepted(replayed: bool) -> Self {
    Self {
      accepted: true,
      replayed,
      matched: false,
      matched_with: None,
      matched_display_name: None,
    }
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct SwipeEngine<S> {
  backend: Arc<S>,
  config:  EngineConfig,
  events:  broadcast::Sender<MatchCreated>,
}

impl<S> SwipeEngine<S>
where
  S: SwipeBackend,
{
  pub fn new(backend: Arc<S>, config: EngineConfig) -> Self {
    let (events, _) = broadcast::channel(config.event_capacity.max(1));
    Self { backend, config, events }
  }

  pub fn backend(&self) -> &Arc<S> { &self.backend }

  pub fn config(&self) -> &EngineConfig { &self.config }

  /// Receive a [`MatchCreated`] for every match materialised from now on.
  pub fn subscribe(&self) -> broadcast::Receiver<MatchCreated> {
    self.events.subscribe()
  }

  pub fn detector(&self) -> MatchDetector<'_, S> {
    MatchDetector::new(&self.backend, &self.config.retry)
  }

  // ── Swipes ────────────────────────────────────────────────────────────────

  /// Validate and record `caller`'s decision on `target`, then run match
  /// detection for likes.
  ///
  /// Checks run in order: authentication, event open for swiping, not a
  /// self-swipe, target on the roster, caller on the roster. Re-submitting
  /// the same kind is a no-op that still reports `accepted`; a different
  /// kind fails with [`Error::ConflictingDecision`].
  pub async fn submit_decision(
    &self,
    caller: &Caller,
    event_id: &EventId,
    target: &UserId,
    kind: DecisionKind,
  ) -> Result<SwipeOutcome> {
    let caller = caller.user()?;
    self.open_event(event_id).await?;

    if caller == target {
      return Err(Error::InvalidTarget {
        target: target.clone(),
        reason: TargetRejection::SelfSwipe,
      });
    }

    let backend = &*self.backend;
    let target_listed = self
      .config
      .retry
      .run("roster lookup", move || backend.is_participant(event_id, target))
      .await?;
    if !target_listed {
      return Err(Error::InvalidTarget {
        target: target.clone(),
        reason: TargetRejection::NotOnRoster,
      });
    }
    self.ensure_participant(event_id, caller).await?;

    let new_decision = NewDecision {
      event_id:  event_id.clone(),
      from_user: caller.clone(),
      to_user:   target.clone(),
      kind,
    };
    // The store's insert is conditional, so retrying a write that actually
    // committed comes back as a same-kind conflict.
    let put = self
      .config
      .retry
      .run("decision write", move || backend.put(new_decision.clone()))
      .await?;

    match put {
      DecisionPut::Recorded(decision) => {
        tracing::debug!(
          event = %event_id,
          from = %caller,
          to = %target,
          kind = %kind,
          "decision recorded"
        );
        if decision.is_like() {
          self.complete_like(&decision, SwipeOutcome::accepted(false)).await
        } else {
          Ok(SwipeOutcome::accepted(false))
        }
      }
      DecisionPut::Conflict(existing) if existing.kind == kind => {
        tracing::debug!(
          event = %event_id,
          from = %caller,
          to = %target,
          kind = %kind,
          "identical decision replayed"
        );
        if existing.detection_pending() {
          self.complete_like(&existing, SwipeOutcome::accepted(true)).await
        } else {
          Ok(SwipeOutcome::accepted(true))
        }
      }
      DecisionPut::Conflict(existing) => Err(Error::ConflictingDecision {
        existing:  existing.kind,
        requested: kind,
      }),
    }
  }

  /// Run detection for a committed like and fold the result into `outcome`.
  ///
  /// A detection failure does not fail the swipe: the like stays pending and
  /// the reconciliation sweep retries it.
  async fn complete_like(
    &self,
    like: &Decision,
    mut outcome: SwipeOutcome,
  ) -> Result<SwipeOutcome> {
    let Some(detected) = self.resolve_detection(like).await else {
      return Ok(outcome);
    };
    if let MatchOutcome::Created(record) = detected {
      outcome.matched = true;
      outcome.matched_display_name = self.display_name(&like.to_user).await;
      outcome.matched_with = Some(like.to_user.clone());
      self.publish(record, like.from_user.clone());
    }
    Ok(outcome)
  }

  /// Detect, then mark the like resolved. Returns `None` if detection itself
  /// failed and the like is still pending.
  async fn resolve_detection(&self, like: &Decision) -> Option<MatchOutcome> {
    let detected = match self
      .detector()
      .try_create_match(&like.event_id, &like.from_user, &like.to_user)
      .await
    {
      Ok(outcome) => outcome,
      Err(e) => {
        let pending = Error::DetectionPending {
          event_id: like.event_id.clone(),
          from:     like.from_user.clone(),
          to:       like.to_user.clone(),
        };
        tracing::warn!(error = %e, "{pending}; leaving it for the sweep");
        return None;
      }
    };

    let backend = &*self.backend;
    let (event_id, from, to) = (&like.event_id, &like.from_user, &like.to_user);
    if let Err(e) = self
      .config
      .retry
      .run("mark detected", move || backend.mark_detected(event_id, from, to))
      .await
    {
      // Detection is idempotent; the sweep will re-run it and find the
      // match already in place.
      tracing::warn!(error = %e, event = %event_id, from = %from, to = %to,
        "could not mark detection resolved");
    }
    Some(detected)
  }

  fn publish(&self, record: Match, triggered_by: UserId) {
    // No subscribers is fine; delivery is somebody else's job.
    let _ = self.events.send(MatchCreated { record, triggered_by });
  }

  async fn display_name(&self, user: &UserId) -> Option<String> {
    let backend = &*self.backend;
    let users = std::slice::from_ref(user);
    match self
      .config
      .retry
      .run("profile lookup", move || backend.profiles(users))
      .await
    {
      Ok(mut found) => found.pop().map(|p| p.display_name),
      Err(e) => {
        tracing::warn!(error = %e, user = %user, "profile lookup failed");
        None
      }
    }
  }

  // ── Feed ──────────────────────────────────────────────────────────────────

  /// Open a participant feed for `caller` in `event_id`.
  ///
  /// The feed yields pages of at most `page_size` (clamped by config)
  /// participants and re-checks exclusions before every page.
  pub async fn feed(
    &self,
    caller: &Caller,
    event_id: &EventId,
    page_size: Option<usize>,
  ) -> Result<Feed<'_, S>> {
    let caller = caller.user()?;
    self.open_event(event_id).await?;
    self.ensure_participant(event_id, caller).await?;
    Feed::build(
      &*self.backend,
      &self.config.retry,
      caller.clone(),
      event_id.clone(),
      self.config.page_size(page_size),
    )
    .await
  }

  /// Open a feed and pull its first page.
  pub async fn feed_page(
    &self,
    caller: &Caller,
    event_id: &EventId,
    page_size: Option<usize>,
  ) -> Result<FeedPage> {
    let mut feed = self.feed(caller, event_id, page_size).await?;
    let participants = feed.next_page().await?;
    Ok(FeedPage {
      event_id: event_id.clone(),
      participants,
      remaining: feed.remaining(),
    })
  }

  // ── Matches ───────────────────────────────────────────────────────────────

  /// Every match `caller` has in `event_id`, including past events.
  pub async fn matches(
    &self,
    caller: &Caller,
    event_id: &EventId,
  ) -> Result<Vec<MatchEntry>> {
    let caller = caller.user()?;
    self.known_event(event_id).await?;

    let backend = &*self.backend;
    let records = self
      .config
      .retry
      .run("match listing", move || backend.matches_for(event_id, caller))
      .await?;

    let partners: Vec<UserId> = records
      .iter()
      .filter_map(|m| m.partner_of(caller).cloned())
      .collect();
    let partners_ref = partners.as_slice();
    let profiles = self
      .config
      .retry
      .run("profile lookup", move || backend.profiles(partners_ref))
      .await?;

    Ok(
      records
        .into_iter()
        .filter_map(|m| {
          let partner = m.partner_of(caller)?.clone();
          let partner_name = profiles
            .iter()
            .find(|p| p.user_id == partner)
            .map(|p| p.display_name.clone());
          Some(MatchEntry {
            match_id: m.match_id,
            event_id: m.event_id,
            partner,
            partner_name,
            matched_at: m.created_at,
          })
        })
        .collect(),
    )
  }

  // ── Validation helpers ────────────────────────────────────────────────────

  async fn known_event(&self, event_id: &EventId) -> Result<EventInfo> {
    let backend = &*self.backend;
    self
      .config
      .retry
      .run("event lookup", move || backend.event(event_id))
      .await?
      .ok_or_else(|| Error::InvalidEvent(event_id.clone()))
  }

  async fn open_event(&self, event_id: &EventId) -> Result<EventInfo> {
    let event = self.known_event(event_id).await?;
    if !event.status.is_swipeable() {
      return Err(Error::InvalidEvent(event_id.clone()));
    }
    Ok(event)
  }

  async fn ensure_participant(&self, event_id: &EventId, user: &UserId) -> Result<()> {
    let backend = &*self.backend;
    let listed = self
      .config
      .retry
      .run("roster lookup", move || backend.is_participant(event_id, user))
      .await?;
    if listed { Ok(()) } else { Err(Error::NotParticipant(event_id.clone())) }
  }
}
