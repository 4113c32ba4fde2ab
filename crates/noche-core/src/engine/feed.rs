//! The per-caller, per-event participant feed.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::{
  Result,
  id::{EventId, UserId},
  participant::ParticipantSnapshot,
  retry::RetryPolicy,
  store::SwipeBackend,
};

/// One page of a feed, as served over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPage {
  pub event_id:     EventId,
  pub participants: Vec<ParticipantSnapshot>,
  /// Candidates left after this page, counted when the page was built. An
  /// upper bound: some may be decided, leave the roster or lack a profile
  /// before they are served.
  pub remaining:    usize,
}

/// A lazy, finite, forward-only sequence of undecided participants.
///
/// Candidate order is fixed when the feed is built (roster order). Before
/// each page the feed reloads the caller's decisions and the roster, so a
/// participant decided or removed in the meantime is never served.
pub struct Feed<'e, S> {
  backend:    &'e S,
  retry:      &'e RetryPolicy,
  caller:     UserId,
  event_id:   EventId,
  page_size:  usize,
  candidates: VecDeque<UserId>,
}

impl<'e, S> Feed<'e, S>
where
  S: SwipeBackend,
{
  pub(crate) async fn build(
    backend: &'e S,
    retry: &'e RetryPolicy,
    caller: UserId,
    event_id: EventId,
    page_size: usize,
  ) -> Result<Self> {
    let mut feed = Self {
      backend,
      retry,
      caller,
      event_id,
      page_size,
      candidates: VecDeque::new(),
    };
    let (roster, decided) = feed.load_exclusions().await?;
    feed.candidates = roster
      .into_iter()
      .filter(|u| *u != feed.caller && !decided.contains(u))
      .collect();
    tracing::debug!(
      event = %feed.event_id,
      caller = %feed.caller,
      candidates = feed.candidates.len(),
      "feed built"
    );
    Ok(feed)
  }

  /// Roster order with the caller's decided targets as a set.
  async fn load_exclusions(&self) -> Result<(Vec<UserId>, HashSet<UserId>)> {
    let backend = self.backend;
    let (event_id, caller) = (&self.event_id, &self.caller);
    let roster = self
      .retry
      .run("roster load", move || backend.roster(event_id))
      .await?;
    let decided = self
      .retry
      .run("decided targets", move || backend.decided_targets(event_id, caller))
      .await?;
    Ok((roster, decided.into_iter().collect()))
  }

  /// Candidates not yet served (an upper bound on what is left).
  pub fn remaining(&self) -> usize { self.candidates.len() }

  pub fn is_exhausted(&self) -> bool { self.candidates.is_empty() }

  /// The next page of at most `page_size` participants. An empty page means
  /// the feed is exhausted.
  ///
  /// Roster members without a profile cannot be shown; they are passed over
  /// and the page is topped up from the candidates behind them.
  pub async fn next_page(&mut self) -> Result<Vec<ParticipantSnapshot>> {
    if self.candidates.is_empty() {
      return Ok(Vec::new());
    }

    let (roster, decided) = self.load_exclusions().await?;
    let roster: HashSet<UserId> = roster.into_iter().collect();

    let backend = self.backend;
    let mut page = Vec::with_capacity(self.page_size);
    while page.len() < self.page_size && !self.candidates.is_empty() {
      let wanted = self.page_size - page.len();
      let mut ids = Vec::with_capacity(wanted);
      while ids.len() < wanted {
        let Some(candidate) = self.candidates.pop_front() else { break };
        if roster.contains(&candidate) && !decided.contains(&candidate) {
          ids.push(candidate);
        }
      }
      if ids.is_empty() {
        break;
      }

      let batch = ids.as_slice();
      let found = self
        .retry
        .run("profile lookup", move || backend.profiles(batch))
        .await?;
      if found.len() < ids.len() {
        tracing::debug!(
          event = %self.event_id,
          skipped = ids.len() - found.len(),
          "participants without a profile passed over"
        );
      }
      page.extend(found);
    }
    Ok(page)
  }
}
