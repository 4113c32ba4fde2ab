//! JSON REST API for Noche.
//!
//! Exposes an axum [`Router`] that drives a [`SwipeEngine`] on behalf of
//! bearer-token callers. TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", noche_api::api_router(engine.clone()))
//! ```

pub mod auth;
pub mod decisions;
pub mod error;
pub mod feed;
pub mod matches;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use noche_core::{
  engine::SwipeEngine,
  store::{Authenticator, SwipeBackend},
};

pub use auth::CallerIdentity;
pub use error::ApiError;

/// A backend that can both run the engine and resolve bearer tokens.
pub trait ApiBackend: SwipeBackend + Authenticator + 'static {}

impl<T> ApiBackend for T where T: SwipeBackend + Authenticator + 'static {}

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Arc<SwipeEngine<S>>) -> Router<()>
where
  S: ApiBackend,
{
  Router::new()
    .route("/events/{event_id}/feed", get(feed::handler::<S>))
    .route("/events/{event_id}/decisions", post(decisions::create::<S>))
    .route("/events/{event_id}/matches", get(matches::list::<S>))
    .with_state(engine)
}

#[cfg(test)]
mod tests;
