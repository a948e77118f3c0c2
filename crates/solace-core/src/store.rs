//! The `ChatStore` trait.
//!
//! Implemented by storage backends (e.g. `solace-store-sqlite`). The server
//! and the rate limiter depend on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  chat::{ChatRecord, NewChat},
  rate_limit::RateLimit,
};

/// Abstraction over the append-only chat log.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ChatStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Append a chat record and return it as persisted.
  fn record_chat(
    &self,
    input: NewChat,
  ) -> impl Future<Output = Result<ChatRecord, Self::Error>> + Send + '_;

  /// Append a chat record only if `device` is still under `limit`.
  ///
  /// The count and the insert happen in one transaction, so concurrent
  /// requests from the same device cannot overshoot the ceiling. Returns
  /// `None` when the record was rejected.
  fn record_chat_within_limit(
    &self,
    input: NewChat,
    limit: RateLimit,
  ) -> impl Future<Output = Result<Option<ChatRecord>, Self::Error>> + Send + '_;

  /// Number of records for `device` with a timestamp strictly after `since`.
  fn count_since<'a>(
    &'a self,
    device: &'a str,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// All records for `device`, oldest first.
  fn chats_for_device<'a>(
    &'a self,
    device: &'a str,
  ) -> impl Future<Output = Result<Vec<ChatRecord>, Self::Error>> + Send + 'a;
}
