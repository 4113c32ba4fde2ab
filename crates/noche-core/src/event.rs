//! Events as seen by the match engine.
//!
//! Names, venues and photos live in the external directory. The engine only
//! needs to know whether an event exists and whether it is open for swiping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::EventId;

/// Lifecycle of an event. The engine never changes it; an external scheduler
/// moves events to `Past` once they are over.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventStatus {
  Upcoming,
  Current,
  Past,
  Cancelled,
}

impl EventStatus {
  /// Swipes and feeds are only served for upcoming and current events.
  pub fn is_swipeable(self) -> bool {
    matches!(self, Self::Upcoming | Self::Current)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
  pub event_id:  EventId,
  pub name:      String,
  pub status:    EventStatus,
  #[serde(default)]
  pub starts_at: Option<DateTime<Utc>>,
}

impl EventInfo {
  pub fn new(event_id: impl Into<EventId>, name: impl Into<String>, status: EventStatus) -> Self {
    Self { event_id: event_id.into(), name: name.into(), status, starts_at: None }
  }
}
