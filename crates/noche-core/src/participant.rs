//! Read-only profile projections served in the participant feed.

use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// A user's profile as it existed when the feed page was built.
///
/// Owned by the external profile service. Every demographic field is
/// optional; absence is `None`, never an empty or placeholder string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSnapshot {
  pub user_id:      UserId,
  pub display_name: String,
  #[serde(default)]
  pub age:          Option<u8>,
  #[serde(default)]
  pub gender:       Option<String>,
  #[serde(default)]
  pub orientation:  Option<String>,
  /// Opaque references (URLs or storage keys) to profile photos, in display
  /// order.
  #[serde(default)]
  pub photo_refs:   Vec<String>,
  #[serde(default)]
  pub bio:          Option<String>,
}

impl ParticipantSnapshot {
  /// Convenience constructor with every optional field unset.
  pub fn new(user_id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
    Self {
      user_id:      user_id.into(),
      display_name: display_name.into(),
      age:          None,
      gender:       None,
      orientation:  None,
      photo_refs:   Vec::new(),
      bio:          None,
    }
  }
}
