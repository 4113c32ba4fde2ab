//! Reconciliation sweep for likes whose match detection never resolved.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::SwipeEngine;
use crate::{Result, matching::MatchOutcome, store::SwipeBackend};

/// What one sweep did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
  pub examined:        usize,
  pub resolved:        usize,
  pub matches_created: usize,
  /// Likes still pending after this sweep.
  pub failed:          usize,
}

impl<S> SwipeEngine<S>
where
  S: SwipeBackend,
{
  /// Re-run detection for up to `limit` pending likes older than the
  /// configured grace period.
  ///
  /// A match created here is broadcast like one created on the request path;
  /// the atomic insert still guarantees a single signal per pair.
  pub async fn reconcile(&self, limit: usize) -> Result<SweepReport> {
    let grace = chrono::Duration::from_std(Duration::from_millis(self.config.sweep_grace_ms))
      .unwrap_or(chrono::Duration::zero());
    let cutoff = Utc::now() - grace;

    let backend = &**self.backend();
    let pending = self
      .config
      .retry
      .run("pending detections", move || backend.pending_detections(cutoff, limit))
      .await?;

    let mut report = SweepReport { examined: pending.len(), ..SweepReport::default() };
    for like in pending {
      match self.resolve_detection(&like).await {
        Some(outcome) => {
          report.resolved += 1;
          if let MatchOutcome::Created(record) = outcome {
            report.matches_created += 1;
            self.publish(record, like.from_user.clone());
          }
        }
        None => report.failed += 1,
      }
    }

    if report.examined > 0 {
      tracing::info!(
        examined = report.examined,
        resolved = report.resolved,
        matches_created = report.matches_created,
        failed = report.failed,
        "detection sweep finished"
      );
    }
    Ok(report)
  }
}
