//! SQLite backend for the Noche match engine.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. One [`SqliteStore`] implements every
//! storage trait in [`noche_core::store`], including the token-backed
//! [`noche_core::store::Authenticator`].

mod encode;
mod schema;
mod store;

pub mod error;
pub mod token;

pub use error::{Error, Result};
pub use store::SqliteStore;
