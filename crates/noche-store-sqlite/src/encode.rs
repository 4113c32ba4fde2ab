//! Encoding and decoding helpers between core types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`
//! suffix) so that they sort and compare correctly as text. Photo references
//! are stored as a compact JSON array.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use noche_core::{
  decision::{Decision, DecisionKind},
  event::{EventInfo, EventStatus},
  matching::Match,
  participant::ParticipantSnapshot,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_kind(kind: DecisionKind) -> &'static str {
  match kind {
    DecisionKind::Like => "like",
    DecisionKind::Dislike => "dislike",
  }
}

fn decode_kind(s: &str) -> Result<DecisionKind> {
  DecisionKind::from_str(s)
    .map_err(|_| Error::UnknownValue { column: "decisions.kind", value: s.to_owned() })
}

fn decode_status(s: &str) -> Result<EventStatus> {
  EventStatus::from_str(s)
    .map_err(|_| Error::UnknownValue { column: "events.status", value: s.to_owned() })
}

// ─── Photo refs ──────────────────────────────────────────────────────────────

pub fn encode_photo_refs(refs: &[String]) -> Result<String> { Ok(serde_json::to_string(refs)?) }

fn decode_photo_refs(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `decisions` row.
pub struct RawDecision {
  pub event_id:    String,
  pub from_user:   String,
  pub to_user:     String,
  pub kind:        String,
  pub created_at:  String,
  pub detected_at: Option<String>,
}

impl RawDecision {
  pub const COLUMNS: &'static str =
    "event_id, from_user, to_user, kind, created_at, detected_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:    row.get(0)?,
      from_user:   row.get(1)?,
      to_user:     row.get(2)?,
      kind:        row.get(3)?,
      created_at:  row.get(4)?,
      detected_at: row.get(5)?,
    })
  }

  pub fn into_decision(self) -> Result<Decision> {
    Ok(Decision {
      event_id:    self.event_id.into(),
      from_user:   self.from_user.into(),
      to_user:     self.to_user.into(),
      kind:        decode_kind(&self.kind)?,
      created_at:  decode_dt(&self.created_at)?,
      detected_at: decode_opt_dt(self.detected_at)?,
    })
  }
}

/// Raw strings read directly from a `matches` row.
pub struct RawMatch {
  pub match_id:   String,
  pub event_id:   String,
  pub user_a:     String,
  pub user_b:     String,
  pub created_at: String,
}

impl RawMatch {
  pub const COLUMNS: &'static str = "match_id, event_id, user_a, user_b, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      match_id:   row.get(0)?,
      event_id:   row.get(1)?,
      user_a:     row.get(2)?,
      user_b:     row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_match(self) -> Result<Match> {
    Ok(Match {
      match_id:   Uuid::parse_str(&self.match_id)?,
      event_id:   self.event_id.into(),
      user_a:     self.user_a.into(),
      user_b:     self.user_b.into(),
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `events` row.
pub struct RawEvent {
  pub event_id:  String,
  pub name:      String,
  pub status:    String,
  pub starts_at: Option<String>,
}

impl RawEvent {
  pub fn into_event(self) -> Result<EventInfo> {
    Ok(EventInfo {
      event_id:  self.event_id.into(),
      name:      self.name,
      status:    decode_status(&self.status)?,
      starts_at: decode_opt_dt(self.starts_at)?,
    })
  }
}

/// Raw values read directly from a `profiles` row.
pub struct RawProfile {
  pub user_id:      String,
  pub display_name: String,
  pub age:          Option<u8>,
  pub gender:       Option<String>,
  pub orientation:  Option<String>,
  pub photo_refs:   String,
  pub bio:          Option<String>,
}

impl RawProfile {
  pub const COLUMNS: &'static str =
    "user_id, display_name, age, gender, orientation, photo_refs, bio";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:      row.get(0)?,
      display_name: row.get(1)?,
      age:          row.get(2)?,
      gender:       row.get(3)?,
      orientation:  row.get(4)?,
      photo_refs:   row.get(5)?,
      bio:          row.get(6)?,
    })
  }

  pub fn into_snapshot(self) -> Result<ParticipantSnapshot> {
    Ok(ParticipantSnapshot {
      user_id:      self.user_id.into(),
      display_name: self.display_name,
      age:          self.age,
      gender:       self.gender,
      orientation:  self.orientation,
      photo_refs:   decode_photo_refs(&self.photo_refs)?,
      bio:          self.bio,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_as_text() {
    let early = Utc.with_ymd_and_hms(2026, 3, 1, 22, 0, 0).unwrap();
    let late = early + chrono::Duration::microseconds(1_500);
    let (a, b) = (encode_dt(early), encode_dt(late));
    assert!(a < b);
    assert_eq!(a.len(), b.len());
    assert!(a.ends_with('Z'));
    assert_eq!(decode_dt(&b).unwrap(), late);
  }

  #[test]
  fn unknown_kind_is_reported() {
    let raw = RawDecision {
      event_id:    "E1".into(),
      from_user:   "U1".into(),
      to_user:     "U2".into(),
      kind:        "superlike".into(),
      created_at:  encode_dt(Utc::now()),
      detected_at: None,
    };
    assert!(matches!(
      raw.into_decision(),
      Err(Error::UnknownValue { column: "decisions.kind", .. })
    ));
  }
}
