//! Chat records and the ephemeral values that feed a single reply.
//!
//! A [`ChatRecord`] is written once per accepted request and never updated
//! or deleted. [`HistoryTurn`] and [`ContextEntry`] only live for the
//! duration of one prompt assembly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Device identifier used when a request carries none.
pub const ANONYMOUS_DEVICE: &str = "anonymous";

// ─── Persisted ───────────────────────────────────────────────────────────────

/// One accepted exchange, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
  /// Store-assigned, strictly increasing.
  pub id:        i64,
  pub device:    String,
  pub query:     String,
  pub response:  String,
  pub timestamp: DateTime<Utc>,
}

/// Input to [`ChatStore::record_chat`](crate::store::ChatStore::record_chat).
#[derive(Debug, Clone)]
pub struct NewChat {
  pub device:    String,
  pub query:     String,
  pub response:  String,
  /// Creation time; the store uses the current time when `None`.
  pub timestamp: Option<DateTime<Utc>>,
}

impl NewChat {
  pub fn new(
    device: impl Into<String>,
    query: impl Into<String>,
    response: impl Into<String>,
  ) -> Self {
    Self {
      device:    device.into(),
      query:     query.into(),
      response:  response.into(),
      timestamp: None,
    }
  }

  /// Pin the creation time instead of letting the store stamp it.
  pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
    self.timestamp = Some(timestamp);
    self
  }
}

// ─── Ephemeral ───────────────────────────────────────────────────────────────

/// A prior user/assistant exchange supplied by the client.
///
/// Older clients send the assistant turn as `bot`; both spellings are
/// accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
  pub user:      String,
  #[serde(alias = "bot")]
  pub assistant: String,
}

/// A retrieved historical response and its position in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
  pub position: usize,
  pub response: String,
}
