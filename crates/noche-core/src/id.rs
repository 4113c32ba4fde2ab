//! Opaque identifiers handed to the core by its collaborators.
//!
//! The core never interprets an identifier; it only compares, hashes and
//! orders them.

use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

macro_rules! opaque_id {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(String);

    impl $name {
      pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

      pub fn as_str(&self) -> &str { &self.0 }

      pub fn into_inner(self) -> String { self.0 }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
      }
    }

    impl From<&str> for $name {
      fn from(s: &str) -> Self { Self(s.to_owned()) }
    }

    impl From<String> for $name {
      fn from(s: String) -> Self { Self(s) }
    }
  };
}

opaque_id!(
  /// A person, as identified by the external identity provider.
  UserId
);

opaque_id!(
  /// A nightlife event, as identified by the venue/event directory.
  EventId
);

// ─── PairKey ─────────────────────────────────────────────────────────────────

/// The order-independent key for an unordered pair of distinct users:
/// `(min(a, b), max(a, b))`.
///
/// Both sides of a mutual like canonicalise to the same key, so concurrent
/// match creation races on one storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
  low:  UserId,
  high: UserId,
}

impl PairKey {
  /// Canonicalise `a` and `b`. Returns `None` if they are the same user.
  pub fn new(a: UserId, b: UserId) -> Option<Self> {
    match a.cmp(&b) {
      Ordering::Less => Some(Self { low: a, high: b }),
      Ordering::Greater => Some(Self { low: b, high: a }),
      Ordering::Equal => None,
    }
  }

  pub fn low(&self) -> &UserId { &self.low }

  pub fn high(&self) -> &UserId { &self.high }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pair_key_is_order_independent() {
    let ab = PairKey::new("alice".into(), "bob".into()).unwrap();
    let ba = PairKey::new("bob".into(), "alice".into()).unwrap();
    assert_eq!(ab, ba);
    assert_eq!(ab.low().as_str(), "alice");
    assert_eq!(ab.high().as_str(), "bob");
  }

  #[test]
  fn pair_key_rejects_self_pair() {
    assert!(PairKey::new("u1".into(), "u1".into()).is_none());
  }

  #[test]
  fn ids_serialise_as_plain_strings() {
    let json = serde_json::to_string(&EventId::new("E42")).unwrap();
    assert_eq!(json, "\"E42\"");
    let back: UserId = serde_json::from_str("\"U7\"").unwrap();
    assert_eq!(back, UserId::from("U7"));
  }
}
