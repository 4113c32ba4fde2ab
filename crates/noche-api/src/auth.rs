//! Bearer-token extractor.

use std::sync::Arc;

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use noche_core::engine::{Caller, SwipeEngine};

use crate::{ApiBackend, error::ApiError};

/// The resolved caller of a request.
///
/// A missing, malformed, unknown or revoked token resolves to
/// [`Caller::Anonymous`]; the engine then rejects the request as
/// unauthenticated. Only a storage failure while resolving the token fails
/// extraction.
pub struct CallerIdentity(pub Caller);

/// The token from an `Authorization: Bearer <token>` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = value.split_once(' ')?;
  let token = token.trim();
  (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl<S> FromRequestParts<Arc<SwipeEngine<S>>> for CallerIdentity
where
  S: ApiBackend,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    engine: &Arc<SwipeEngine<S>>,
  ) -> Result<Self, Self::Rejection> {
    let Some(token) = bearer_token(&parts.headers) else {
      return Ok(Self(Caller::Anonymous));
    };

    let backend = &**engine.backend();
    let user = engine
      .config()
      .retry
      .run("authenticate", move || backend.authenticate(token))
      .await?;
    if user.is_none() {
      tracing::debug!("unknown or revoked bearer token");
    }
    Ok(Self(Caller::from(user)))
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  #[test]
  fn parses_bearer_scheme() {
    assert_eq!(bearer_token(&headers("Bearer abc123")), Some("abc123"));
    assert_eq!(bearer_token(&headers("bearer  abc123 ")), Some("abc123"));
  }

  #[test]
  fn rejects_other_schemes_and_empty_tokens() {
    assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
    assert_eq!(bearer_token(&headers("Bearer ")), None);
    assert_eq!(bearer_token(&headers("Bearer")), None);
    assert_eq!(bearer_token(&HeaderMap::new()), None);
  }
}
