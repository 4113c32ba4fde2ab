//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use noche_core::Error;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Engine(#[from] Error),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    let Self::Engine(e) = self;
    match e {
      Error::Unauthenticated => StatusCode::UNAUTHORIZED,
      Error::InvalidEvent(_) => StatusCode::NOT_FOUND,
      Error::InvalidTarget { .. } => StatusCode::UNPROCESSABLE_ENTITY,
      Error::NotParticipant(_) => StatusCode::FORBIDDEN,
      Error::ConflictingDecision { .. } => StatusCode::CONFLICT,
      Error::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
      Error::DetectionPending { .. } | Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, status = status.as_u16(), "request failed");
    }

    let mut res = (status, Json(json!({ "error": self.to_string() }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer realm=\"noche\""),
      );
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use noche_core::{
    decision::DecisionKind,
    error::TargetRejection,
    id::{EventId, UserId},
  };

  use super::*;

  #[test]
  fn engine_errors_map_to_statuses() {
    let cases = [
      (Error::Unauthenticated, 401),
      (Error::InvalidEvent(EventId::from("E1")), 404),
      (
        Error::InvalidTarget {
          target: UserId::from("U1"),
          reason: TargetRejection::SelfSwipe,
        },
        422,
      ),
      (Error::NotParticipant(EventId::from("E1")), 403),
      (
        Error::ConflictingDecision {
          existing:  DecisionKind::Like,
          requested: DecisionKind::Dislike,
        },
        409,
      ),
      (Error::Storage("disk on fire".into()), 500),
    ];
    for (err, code) in cases {
      assert_eq!(ApiError::from(err).status().as_u16(), code);
    }
  }

  #[test]
  fn unauthorized_carries_challenge() {
    let res = ApiError::from(Error::Unauthenticated).into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
      res.headers().get(header::WWW_AUTHENTICATE).unwrap(),
      "Bearer realm=\"noche\""
    );
  }
}
