//! JSON seed files for the directory tables.
//!
//! ```json
//! {
//!   "profiles": [{ "user_id": "U1", "display_name": "Ana", "age": 27 }],
//!   "events": [
//!     { "event_id": "E1", "name": "Friday at Nocturne", "status": "current",
//!       "participants": ["U1", "U2"] }
//!   ]
//! }
//! ```

use std::path::Path;

use noche_core::{event::EventInfo, id::UserId, participant::ParticipantSnapshot};
use noche_store_sqlite::SqliteStore;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
  #[error("failed to read seed file: {0}")]
  Io(#[from] std::io::Error),

  #[error("invalid seed file: {0}")]
  Json(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[from] noche_store_sqlite::Error),
}

#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
  #[serde(default)]
  pub profiles: Vec<ParticipantSnapshot>,
  #[serde(default)]
  pub events:   Vec<SeedEvent>,
}

#[derive(Debug, Deserialize)]
pub struct SeedEvent {
  #[serde(flatten)]
  pub info:         EventInfo,
  /// Roster, in feed order.
  #[serde(default)]
  pub participants: Vec<UserId>,
}

/// What a seed run wrote.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
  pub profiles:     usize,
  pub events:       usize,
  pub participants: usize,
}

impl SeedFile {
  pub fn from_path(path: &Path) -> Result<Self, SeedError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
  }

  /// Upsert everything into `store`. Re-applying the same file is harmless.
  pub async fn apply(&self, store: &SqliteStore) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();
    for profile in &self.profiles {
      store.upsert_profile(profile).await?;
      report.profiles += 1;
    }
    for event in &self.events {
      store.upsert_event(&event.info).await?;
      report.events += 1;
      for user in &event.participants {
        store.add_participant(&event.info.event_id, user).await?;
        report.participants += 1;
      }
    }
    tracing::info!(
      profiles = report.profiles,
      events = report.events,
      participants = report.participants,
      "seed applied"
    );
    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use noche_core::{event::EventStatus, id::EventId, store::Directory};

  use super::*;

  const SEED: &str = r#"{
    "profiles": [
      { "user_id": "U1", "display_name": "Ana", "age": 27, "photo_refs": ["p/u1.jpg"] },
      { "user_id": "U2", "display_name": "Bo" }
    ],
    "events": [
      { "event_id": "E1", "name": "Friday at Nocturne", "status": "current",
        "participants": ["U2", "U1"] },
      { "event_id": "E0", "name": "Closing party", "status": "past" }
    ]
  }"#;

  #[tokio::test]
  async fn seed_populates_directory() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let seed: SeedFile = serde_json::from_str(SEED).unwrap();

    let report = seed.apply(&store).await.unwrap();
    assert_eq!(report, SeedReport { profiles: 2, events: 2, participants: 2 });

    let e1 = EventId::from("E1");
    assert_eq!(store.event(&e1).await.unwrap().unwrap().status, EventStatus::Current);
    assert_eq!(
      store.roster(&e1).await.unwrap(),
      [UserId::from("U2"), UserId::from("U1")]
    );
    let profiles = store.profiles(&[UserId::from("U1")]).await.unwrap();
    assert_eq!(profiles[0].age, Some(27));
    assert_eq!(profiles[0].photo_refs, ["p/u1.jpg"]);

    // Idempotent.
    seed.apply(&store).await.unwrap();
    assert_eq!(store.roster(&e1).await.unwrap().len(), 2);
  }

  #[test]
  fn unknown_status_is_rejected() {
    let bad = r#"{ "events": [{ "event_id": "E1", "name": "x", "status": "later" }] }"#;
    assert!(serde_json::from_str::<SeedFile>(bad).is_err());
  }
}
