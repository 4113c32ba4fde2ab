//! [`SqliteStore`]: the SQLite implementation of the Noche storage traits.

use std::{collections::HashMap, path::Path, time::Duration};

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use noche_core::{
  decision::{Decision, DecisionPut, NewDecision},
  event::EventInfo,
  id::{EventId, PairKey, UserId},
  matching::{Match, MatchInsert},
  participant::ParticipantSnapshot,
  store::{Authenticator, Backend, DecisionStore, Directory, MatchStore},
};

use crate::{
  Error, Result,
  encode::{
    RawDecision, RawEvent, RawMatch, RawProfile, encode_dt, encode_kind, encode_photo_refs,
  },
  schema::SCHEMA,
  token,
};

/// How long a statement waits on a lock held by another connection before
/// SQLite reports `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Noche store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Directory writes ──────────────────────────────────────────────────────

  /// Insert an event, or replace its name, status and start time.
  pub async fn upsert_event(&self, event: &EventInfo) -> Result<()> {
    let id_str     = event.event_id.as_str().to_owned();
    let name       = event.name.clone();
    let status_str = event.status.as_ref().to_owned();
    let starts_str = event.starts_at.map(encode_dt);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO events (event_id, name, status, starts_at) VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (event_id) DO UPDATE SET
             name = excluded.name, status = excluded.status, starts_at = excluded.starts_at",
          rusqlite::params![id_str, name, status_str, starts_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn upsert_profile(&self, profile: &ParticipantSnapshot) -> Result<()> {
    let id_str      = profile.user_id.as_str().to_owned();
    let name        = profile.display_name.clone();
    let age         = profile.age;
    let gender      = profile.gender.clone();
    let orientation = profile.orientation.clone();
    let photos_str  = encode_photo_refs(&profile.photo_refs)?;
    let bio         = profile.bio.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO profiles (user_id, display_name, age, gender, orientation, photo_refs, bio)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT (user_id) DO UPDATE SET
             display_name = excluded.display_name, age = excluded.age,
             gender = excluded.gender, orientation = excluded.orientation,
             photo_refs = excluded.photo_refs, bio = excluded.bio",
          rusqlite::params![id_str, name, age, gender, orientation, photos_str, bio],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Append `user` to the roster of `event_id`. Adding someone already on the
  /// roster keeps their original position.
  pub async fn add_participant(&self, event_id: &EventId, user: &UserId) -> Result<()> {
    let event_str = event_id.as_str().to_owned();
    let user_str  = user.as_str().to_owned();
    let at_str    = encode_dt(Utc::now());

    let known = self
      .conn
      .call(move |conn| {
        let known = conn
          .query_row(
            "SELECT 1 FROM events WHERE event_id = ?1",
            rusqlite::params![event_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if known {
          conn.execute(
            "INSERT INTO participants (event_id, user_id, joined_at) VALUES (?1, ?2, ?3)
             ON CONFLICT DO NOTHING",
            rusqlite::params![event_str, user_str, at_str],
          )?;
        }
        Ok(known)
      })
      .await?;

    if known { Ok(()) } else { Err(Error::EventNotFound(event_id.to_string())) }
  }

  /// Take `user` off the roster. Their decisions and matches are kept.
  /// Returns whether they were listed.
  pub async fn remove_participant(&self, event_id: &EventId, user: &UserId) -> Result<bool> {
    let event_str = event_id.as_str().to_owned();
    let user_str  = user.as_str().to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM participants WHERE event_id = ?1 AND user_id = ?2",
          rusqlite::params![event_str, user_str],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }

  // ── Access tokens ─────────────────────────────────────────────────────────

  /// Issue a new bearer token for `user`. The plaintext is returned once and
  /// never stored.
  pub async fn issue_token(&self, user: &UserId) -> Result<String> {
    let plaintext = token::generate();
    let hash_str  = token::hash(&plaintext);
    let user_str  = user.as_str().to_owned();
    let at_str    = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO access_tokens (token_hash, user_id, issued_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![hash_str, user_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    tracing::info!(user = %user, "access token issued");
    Ok(plaintext)
  }

  /// Revoke a token. Returns `false` if it was unknown or already revoked.
  pub async fn revoke_token(&self, plaintext: &str) -> Result<bool> {
    let hash_str = token::hash(plaintext);
    let at_str   = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE access_tokens SET revoked_at = ?2
           WHERE token_hash = ?1 AND revoked_at IS NULL",
          rusqlite::params![hash_str, at_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }
}

impl Backend for SqliteStore {
  type Error = Error;
}

// ─── DecisionStore ───────────────────────────────────────────────────────────

impl DecisionStore for SqliteStore {
  async fn put(&self, decision: NewDecision) -> Result<DecisionPut> {
    let event_str = decision.event_id.into_inner();
    let from_str  = decision.from_user.into_inner();
    let to_str    = decision.to_user.into_inner();
    let kind_str  = encode_kind(decision.kind);
    let at_str    = encode_dt(Utc::now());

    let (inserted, raw) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let inserted = tx.execute(
          "INSERT INTO decisions (event_id, from_user, to_user, kind, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT DO NOTHING",
          rusqlite::params![event_str, from_str, to_str, kind_str, at_str],
        )? == 1;
        let raw = tx.query_row(
          &format!(
            "SELECT {} FROM decisions WHERE event_id = ?1 AND from_user = ?2 AND to_user = ?3",
            RawDecision::COLUMNS
          ),
          rusqlite::params![event_str, from_str, to_str],
          RawDecision::from_row,
        )?;
        tx.commit()?;
        Ok((inserted, raw))
      })
      .await?;

    let stored = raw.into_decision()?;
    Ok(if inserted { DecisionPut::Recorded(stored) } else { DecisionPut::Conflict(stored) })
  }

  async fn get(
    &self,
    event_id: &EventId,
    from: &UserId,
    to: &UserId,
  ) -> Result<Option<Decision>> {
    let event_str = event_id.as_str().to_owned();
    let from_str  = from.as_str().to_owned();
    let to_str    = to.as_str().to_owned();

    let raw: Option<RawDecision> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM decisions
                 WHERE event_id = ?1 AND from_user = ?2 AND to_user = ?3",
                RawDecision::COLUMNS
              ),
              rusqlite::params![event_str, from_str, to_str],
              RawDecision::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDecision::into_decision).transpose()
  }

  async fn decided_targets(&self, event_id: &EventId, from: &UserId) -> Result<Vec<UserId>> {
    let event_str = event_id.as_str().to_owned();
    let from_str  = from.as_str().to_owned();

    let targets: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT to_user FROM decisions WHERE event_id = ?1 AND from_user = ?2
           ORDER BY created_at, rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![event_str, from_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(targets.into_iter().map(UserId::from).collect())
  }

  async fn mark_detected(&self, event_id: &EventId, from: &UserId, to: &UserId) -> Result<()> {
    let event_str = event_id.as_str().to_owned();
    let from_str  = from.as_str().to_owned();
    let to_str    = to.as_str().to_owned();
    let at_str    = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE decisions SET detected_at = ?4
           WHERE event_id = ?1 AND from_user = ?2 AND to_user = ?3 AND kind = 'like'",
          rusqlite::params![event_str, from_str, to_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn pending_detections(
    &self,
    older_than: DateTime<Utc>,
    limit: usize,
  ) -> Result<Vec<Decision>> {
    let cutoff_str = encode_dt(older_than);
    let limit_val  = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawDecision> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM decisions
           WHERE kind = 'like' AND detected_at IS NULL AND created_at <= ?1
           ORDER BY created_at, rowid
           LIMIT ?2",
          RawDecision::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![cutoff_str, limit_val], RawDecision::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDecision::into_decision).collect()
  }
}

// ─── MatchStore ──────────────────────────────────────────────────────────────

impl MatchStore for SqliteStore {
  async fn insert_match_if_absent(
    &self,
    event_id: &EventId,
    pair: &PairKey,
  ) -> Result<MatchInsert> {
    let candidate = Match::new(event_id.clone(), pair);
    let id_str    = candidate.match_id.hyphenated().to_string();
    let event_str = event_id.as_str().to_owned();
    let a_str     = pair.low().as_str().to_owned();
    let b_str     = pair.high().as_str().to_owned();
    let at_str    = encode_dt(candidate.created_at);

    let (inserted, raw) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let inserted = tx.execute(
          "INSERT INTO matches (match_id, event_id, user_a, user_b, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (event_id, user_a, user_b) DO NOTHING",
          rusqlite::params![id_str, event_str, a_str, b_str, at_str],
        )? == 1;
        let raw = tx.query_row(
          &format!(
            "SELECT {} FROM matches WHERE event_id = ?1 AND user_a = ?2 AND user_b = ?3",
            RawMatch::COLUMNS
          ),
          rusqlite::params![event_str, a_str, b_str],
          RawMatch::from_row,
        )?;
        tx.commit()?;
        Ok((inserted, raw))
      })
      .await?;

    let record = raw.into_match()?;
    Ok(if inserted { MatchInsert::Created(record) } else { MatchInsert::Existing(record) })
  }

  async fn get_match(&self, event_id: &EventId, pair: &PairKey) -> Result<Option<Match>> {
    let event_str = event_id.as_str().to_owned();
    let a_str     = pair.low().as_str().to_owned();
    let b_str     = pair.high().as_str().to_owned();

    let raw: Option<RawMatch> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM matches WHERE event_id = ?1 AND user_a = ?2 AND user_b = ?3",
                RawMatch::COLUMNS
              ),
              rusqlite::params![event_str, a_str, b_str],
              RawMatch::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMatch::into_match).transpose()
  }

  async fn matches_for(&self, event_id: &EventId, user: &UserId) -> Result<Vec<Match>> {
    let event_str = event_id.as_str().to_owned();
    let user_str  = user.as_str().to_owned();

    let raws: Vec<RawMatch> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM matches
           WHERE event_id = ?1 AND (user_a = ?2 OR user_b = ?2)
           ORDER BY created_at, rowid",
          RawMatch::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![event_str, user_str], RawMatch::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMatch::into_match).collect()
  }
}

// ─── Directory ───────────────────────────────────────────────────────────────

impl Directory for SqliteStore {
  async fn event(&self, event_id: &EventId) -> Result<Option<EventInfo>> {
    let id_str = event_id.as_str().to_owned();

    let raw: Option<RawEvent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT event_id, name, status, starts_at FROM events WHERE event_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawEvent {
                  event_id:  row.get(0)?,
                  name:      row.get(1)?,
                  status:    row.get(2)?,
                  starts_at: row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  async fn is_participant(&self, event_id: &EventId, user: &UserId) -> Result<bool> {
    let event_str = event_id.as_str().to_owned();
    let user_str  = user.as_str().to_owned();

    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT 1 FROM participants WHERE event_id = ?1 AND user_id = ?2",
                rusqlite::params![event_str, user_str],
                |_| Ok(()),
              )
              .optional()?
              .is_some(),
          )
        })
        .await?,
    )
  }

  async fn roster(&self, event_id: &EventId) -> Result<Vec<UserId>> {
    let event_str = event_id.as_str().to_owned();

    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare("SELECT user_id FROM participants WHERE event_id = ?1 ORDER BY rowid")?;
        let rows = stmt
          .query_map(rusqlite::params![event_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(ids.into_iter().map(UserId::from).collect())
  }

  async fn profiles(&self, users: &[UserId]) -> Result<Vec<ParticipantSnapshot>> {
    if users.is_empty() {
      return Ok(Vec::new());
    }
    let ids: Vec<String> = users.iter().map(|u| u.as_str().to_owned()).collect();
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
      "SELECT {} FROM profiles WHERE user_id IN ({placeholders})",
      RawProfile::COLUMNS
    );

    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(ids.iter()), RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut by_id: HashMap<UserId, ParticipantSnapshot> = raws
      .into_iter()
      .map(|raw| raw.into_snapshot().map(|p| (p.user_id.clone(), p)))
      .collect::<Result<_>>()?;

    Ok(users.iter().filter_map(|u| by_id.remove(u)).collect())
  }
}

// ─── Authenticator ───────────────────────────────────────────────────────────

impl Authenticator for SqliteStore {
  async fn authenticate(&self, plaintext: &str) -> Result<Option<UserId>> {
    let hash_str = token::hash(plaintext);

    let user: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id FROM access_tokens WHERE token_hash = ?1 AND revoked_at IS NULL",
              rusqlite::params![hash_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(user.map(UserId::from))
  }
}
