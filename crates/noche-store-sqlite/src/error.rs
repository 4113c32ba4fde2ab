//! Error type for `noche-store-sqlite`.

use noche_core::store::StorageError;
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database connection closed")]
  ConnectionClosed,

  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),

  #[error("database worker error: {0}")]
  Worker(String),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {column} value in database: {value:?}")]
  UnknownValue {
    column: &'static str,
    value:  String,
  },

  #[error("event not found: {0}")]
  EventNotFound(String),
}

// `tokio_rusqlite::Error` can carry the connection itself, which is not
// `Sync`, so it is unpacked here instead of being wrapped.
impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::ConnectionClosed => Self::ConnectionClosed,
      tokio_rusqlite::Error::Rusqlite(e) => Self::Database(e),
      tokio_rusqlite::Error::Close((_, e)) => Self::Database(e),
      other => Self::Worker(other.to_string()),
    }
  }
}

impl StorageError for Error {
  fn is_transient(&self) -> bool {
    match self {
      Self::ConnectionClosed => true,
      Self::Database(e) => matches!(
        e.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
      ),
      _ => false,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  fn sqlite_failure(code: i32) -> Error {
    Error::Database(rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None))
  }

  #[test]
  fn busy_and_locked_are_transient() {
    assert!(sqlite_failure(rusqlite::ffi::SQLITE_BUSY).is_transient());
    assert!(sqlite_failure(rusqlite::ffi::SQLITE_LOCKED).is_transient());
    assert!(Error::ConnectionClosed.is_transient());
  }

  #[test]
  fn constraint_and_decode_failures_are_permanent() {
    assert!(!sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT).is_transient());
    assert!(!Error::DateParse("garbage".into()).is_transient());
  }
}
