//! Core types, storage traits and the swipe engine for Noche.
//!
//! This crate is free of HTTP and database dependencies. Storage backends
//! (`noche-store-sqlite`, or the in-process [`memory::MemoryStore`])
//! implement the traits in [`store`]; the HTTP layer drives
//! [`engine::SwipeEngine`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod decision;
pub mod engine;
pub mod error;
pub mod event;
pub mod id;
pub mod matching;
pub mod memory;
pub mod participant;
pub mod retry;
pub mod store;

pub use error::{Error, Result};
