//! Core types and trait definitions for the Solace chat backend.
//!
//! This crate is deliberately free of HTTP, model and database dependencies.
//! The store, retrieval and server crates all depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod chat;
pub mod error;
pub mod rate_limit;
pub mod store;

pub use error::{Error, Result};
