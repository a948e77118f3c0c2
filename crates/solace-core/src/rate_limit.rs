//! Sliding-window rate limiting over the chat log.
//!
//! The limiter keeps no state of its own: a device is allowed another request
//! while the number of its records inside the trailing window is below the
//! ceiling.

use chrono::{DateTime, TimeDelta, Utc};

use crate::{Error, Result, store::ChatStore};

/// Per-device request ceiling over a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
  pub max_requests: u32,
  pub window:       TimeDelta,
}

impl Default for RateLimit {
  /// Twelve requests per trailing hour.
  fn default() -> Self {
    Self { max_requests: 12, window: TimeDelta::hours(1) }
  }
}

impl RateLimit {
  pub fn new(max_requests: u32, window: TimeDelta) -> Result<Self> {
    if max_requests == 0 {
      return Err(Error::ZeroRateLimit);
    }
    if window <= TimeDelta::zero() {
      return Err(Error::NonPositiveWindow(window.num_seconds()));
    }
    Ok(Self { max_requests, window })
  }

  /// Build from a window length in seconds, as found in configuration.
  pub fn from_secs(max_requests: u32, window_secs: i64) -> Result<Self> {
    let window = TimeDelta::try_seconds(window_secs)
      .ok_or(Error::NonPositiveWindow(window_secs))?;
    Self::new(max_requests, window)
  }

  /// Exclusive lower bound of the window ending at `now`.
  pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
    now - self.window
  }

  /// Whether `count` prior requests inside the window still leave room.
  pub fn admits(&self, count: u64) -> bool {
    count < u64::from(self.max_requests)
  }

  /// Decide whether `device` may make another request at `now`.
  ///
  /// Read-only: nothing is recorded.
  pub async fn allow<S>(
    &self,
    store: &S,
    device: &str,
    now: DateTime<Utc>,
  ) -> Result<bool, S::Error>
  where
    S: ChatStore,
  {
    let count = store.count_since(device, self.window_start(now)).await?;
    Ok(self.admits(count))
  }

  /// User-facing rejection text, rendered from the enforced ceiling.
  pub fn exceeded_message(&self) -> String {
    if self.window == TimeDelta::hours(1) {
      format!("Rate limit exceeded. Max {}/hour", self.max_requests)
    } else {
      format!(
        "Rate limit exceeded. Max {} per {} seconds",
        self.max_requests,
        self.window.num_seconds()
      )
    }
  }
}
