//! Error types for `solace-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("rate limit must allow at least one request per window")]
  ZeroRateLimit,

  #[error("rate limit window must be positive, got {0}s")]
  NonPositiveWindow(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
