//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.

use chrono::{DateTime, SecondsFormat, Utc};
use solace_core::chat::ChatRecord;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Timestamps are always written with microsecond precision and a `Z`
/// suffix, so string comparison in SQL orders them chronologically.
pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Count ───────────────────────────────────────────────────────────────────

pub fn decode_count(n: i64) -> Result<u64> {
  u64::try_from(n).map_err(|_| Error::Count(n))
}

// ─── Raw row type ────────────────────────────────────────────────────────────

/// Column values exactly as read from a `chats` row.
pub struct RawChat {
  pub id:        i64,
  pub device:    String,
  pub query:     String,
  pub response:  String,
  pub timestamp: String,
}

impl RawChat {
  pub const COLUMNS: &'static str = "id, device, query, response, timestamp";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:        row.get(0)?,
      device:    row.get(1)?,
      query:     row.get(2)?,
      response:  row.get(3)?,
      timestamp: row.get(4)?,
    })
  }

  pub fn into_record(self) -> Result<ChatRecord> {
    Ok(ChatRecord {
      id:        self.id,
      device:    self.device,
      query:     self.query,
      response:  self.response,
      timestamp: decode_dt(&self.timestamp)?,
    })
  }
}
