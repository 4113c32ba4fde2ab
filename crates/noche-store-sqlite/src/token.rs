//! Opaque bearer tokens.
//!
//! A token is 32 random bytes, URL-safe base64 without padding. The store
//! only ever sees its SHA-256 hex digest.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;

/// A fresh random token, to be handed to the user exactly once.
pub fn generate() -> String {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

/// The digest under which `token` is stored.
pub fn hash(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }
