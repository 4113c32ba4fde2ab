//! Background tasks that run beside the HTTP server.

use std::{sync::Arc, time::Duration};

use noche_core::{engine::SwipeEngine, store::SwipeBackend};
use tokio::{
  sync::broadcast::error::RecvError,
  task::JoinHandle,
  time::MissedTickBehavior,
};

use crate::SweepConfig;

/// Run [`SwipeEngine::reconcile`] every `interval_secs` until aborted.
pub fn spawn_sweeper<S>(engine: Arc<SwipeEngine<S>>, config: SweepConfig) -> JoinHandle<()>
where
  S: SwipeBackend + 'static,
{
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(Duration::from_secs(config.interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
      ticker.tick().await;
      if let Err(e) = engine.reconcile(config.batch_size).await {
        tracing::warn!(error = %e, "detection sweep failed");
      }
    }
  })
}

/// Log every match-created event. Ends when the engine is dropped.
pub fn spawn_match_logger<S>(engine: &SwipeEngine<S>) -> JoinHandle<()>
where
  S: SwipeBackend,
{
  let mut events = engine.subscribe();
  tokio::spawn(async move {
    loop {
      match events.recv().await {
        Ok(created) => tracing::info!(
          event = %created.record.event_id,
          match_id = %created.record.match_id,
          user_a = %created.record.user_a,
          user_b = %created.record.user_b,
          triggered_by = %created.triggered_by,
          "match event"
        ),
        Err(RecvError::Lagged(skipped)) => {
          tracing::warn!(skipped, "match event logger fell behind");
        }
        Err(RecvError::Closed) => break,
      }
    }
  })
}

#[cfg(test)]
mod tests {
  use noche_core::{
    decision::DecisionKind,
    engine::{Caller, EngineConfig},
    event::{EventInfo, EventStatus},
    id::{EventId, UserId},
    memory::MemoryStore,
    participant::ParticipantSnapshot,
  };

  use super::*;

  #[tokio::test]
  async fn logger_stops_when_engine_is_dropped() {
    let store = MemoryStore::new();
    store.upsert_event(EventInfo::new("E1", "E1", EventStatus::Current)).unwrap();
    for id in ["U1", "U2"] {
      store.upsert_profile(ParticipantSnapshot::new(id, id)).unwrap();
      store.add_participant(&EventId::from("E1"), &UserId::from(id)).unwrap();
    }
    let engine = SwipeEngine::new(Arc::new(store), EngineConfig::default());
    let logger = spawn_match_logger(&engine);

    for (from, to) in [("U1", "U2"), ("U2", "U1")] {
      engine
        .submit_decision(
          &Caller::User(UserId::from(from)),
          &EventId::from("E1"),
          &UserId::from(to),
          DecisionKind::Like,
        )
        .await
        .unwrap();
    }

    drop(engine);
    tokio::time::timeout(Duration::from_secs(5), logger)
      .await
      .expect("logger should finish")
      .unwrap();
  }

  #[tokio::test]
  async fn sweeper_keeps_ticking() {
    let engine = Arc::new(SwipeEngine::new(
      Arc::new(MemoryStore::new()),
      EngineConfig::default(),
    ));
    let handle = spawn_sweeper(engine, SweepConfig { interval_secs: 1, batch_size: 10 });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished());
    handle.abort();
  }
}
