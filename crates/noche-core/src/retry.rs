//! Bounded retries for transient storage failures.

use std::{future::Future, time::Duration};

use serde::Deserialize;

use crate::{Error, Result, store::StorageError};

/// How often, and how patiently, a storage call is retried when the backend
/// reports a transient error. Non-transient errors are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
  /// Total attempts including the first. `0` behaves like `1`.
  pub max_attempts:       u32,
  pub initial_backoff_ms: u64,
  pub max_backoff_ms:     u64,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self { max_attempts: 3, initial_backoff_ms: 25, max_backoff_ms: 500 }
  }
}

impl RetryPolicy {
  /// A policy that gives up after the first failure.
  pub fn no_retry() -> Self {
    Self { max_attempts: 1, initial_backoff_ms: 0, max_backoff_ms: 0 }
  }

  /// Delay before attempt `attempt + 1`, doubling from the initial backoff.
  pub fn backoff(&self, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1).min(16));
    let ms = self
      .initial_backoff_ms
      .saturating_mul(factor)
      .min(self.max_backoff_ms);
    Duration::from_millis(ms)
  }

  /// Run `call` until it succeeds, fails permanently, or the attempt budget
  /// is spent. `op` names the call in logs and errors.
  pub async fn run<T, E, F, Fut>(&self, op: &'static str, mut call: F) -> Result<T>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: StorageError,
  {
    let max_attempts = self.max_attempts.max(1);
    let mut attempt = 0;
    loop {
      attempt += 1;
      match call().await {
        Ok(value) => return Ok(value),
        Err(e) if !e.is_transient() => return Err(Error::Storage(Box::new(e))),
        Err(e) if attempt >= max_attempts => {
          return Err(Error::StorageUnavailable {
            op,
            attempts: attempt,
            source: Box::new(e),
          });
        }
        Err(e) => {
          let delay = self.backoff(attempt);
          tracing::warn!(
            op,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %e,
            "transient storage error, retrying"
          );
          tokio::time::sleep(delay).await;
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};

  use super::*;

  #[derive(Debug, thiserror::Error)]
  #[error("test failure (transient: {0})")]
  struct TestError(bool);

  impl StorageError for TestError {
    fn is_transient(&self) -> bool { self.0 }
  }

  fn quick() -> RetryPolicy {
    RetryPolicy { max_attempts: 3, initial_backoff_ms: 1, max_backoff_ms: 2 }
  }

  #[test]
  fn backoff_doubles_and_caps() {
    let policy = RetryPolicy { max_attempts: 5, initial_backoff_ms: 10, max_backoff_ms: 35 };
    assert_eq!(policy.backoff(1), Duration::from_millis(10));
    assert_eq!(policy.backoff(2), Duration::from_millis(20));
    assert_eq!(policy.backoff(3), Duration::from_millis(35));
    assert_eq!(policy.backoff(30), Duration::from_millis(35));
  }

  #[tokio::test]
  async fn transient_errors_are_retried_until_success() {
    let counter = AtomicU32::new(0);
    let calls = &counter;
    let value = quick()
      .run("test", move || async move {
        if calls.fetch_add(1, Ordering::SeqCst) < 2 {
          Err(TestError(true))
        } else {
          Ok(7)
        }
      })
      .await
      .unwrap();
    assert_eq!(value, 7);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn exhausted_budget_reports_unavailable() {
    let counter = AtomicU32::new(0);
    let calls = &counter;
    let err = quick()
      .run("test", move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<(), _>(TestError(true))
      })
      .await
      .unwrap_err();
    assert!(matches!(err, Error::StorageUnavailable { attempts: 3, .. }));
    assert!(err.is_retryable());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn permanent_errors_are_not_retried() {
    let counter = AtomicU32::new(0);
    let calls = &counter;
    let err = quick()
      .run("test", move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<(), _>(TestError(false))
      })
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}
