//! [`SqliteStore`]: the SQLite implementation of [`ChatStore`].

use std::path::Path;

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::TransactionBehavior;
use solace_core::{
  chat::{ChatRecord, NewChat},
  rate_limit::RateLimit,
  store::ChatStore,
};

use crate::{
  Result,
  encode::{RawChat, decode_count, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A chat log backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All calls
/// are serialised onto the connection's worker thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Resolve the creation time and build the record that will be persisted.
///
/// The timestamp is truncated to the stored precision so the returned record
/// matches what a later read yields.
fn prepare(input: NewChat) -> (ChatRecord, String) {
  let timestamp = input.timestamp.unwrap_or_else(Utc::now).trunc_subsecs(6);
  let record = ChatRecord {
    id: 0,
    device: input.device,
    query: input.query,
    response: input.response,
    timestamp,
  };
  let ts_str = encode_dt(timestamp);
  (record, ts_str)
}

fn insert(conn: &rusqlite::Connection, record: &ChatRecord, ts: &str) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO chats (device, query, response, timestamp) VALUES (?1, ?2, ?3, ?4)",
    rusqlite::params![record.device, record.query, record.response, ts],
  )?;
  Ok(conn.last_insert_rowid())
}

fn count(conn: &rusqlite::Connection, device: &str, since: &str) -> rusqlite::Result<i64> {
  conn.query_row(
    "SELECT COUNT(*) FROM chats WHERE device = ?1 AND timestamp > ?2",
    rusqlite::params![device, since],
    |row| row.get(0),
  )
}

// ─── ChatStore impl ──────────────────────────────────────────────────────────

impl ChatStore for SqliteStore {
  type Error = crate::Error;

  async fn record_chat(&self, input: NewChat) -> Result<ChatRecord> {
    let (record, ts_str) = prepare(input);

    let (id, mut record) = self
      .conn
      .call(move |conn| {
        let id = insert(conn, &record, &ts_str)?;
        Ok((id, record))
      })
      .await?;

    record.id = id;
    Ok(record)
  }

  async fn record_chat_within_limit(
    &self,
    input: NewChat,
    limit: RateLimit,
  ) -> Result<Option<ChatRecord>> {
    let (record, ts_str) = prepare(input);
    let since_str = encode_dt(limit.window_start(record.timestamp));

    let outcome: (i64, Option<(i64, ChatRecord)>) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing = count(&tx, &record.device, &since_str)?;
        if existing >= i64::from(limit.max_requests) {
          tx.rollback()?;
          return Ok((existing, None));
        }
        let id = insert(&tx, &record, &ts_str)?;
        tx.commit()?;
        Ok((existing, Some((id, record))))
      })
      .await?;

    let (existing, inserted) = outcome;
    match inserted {
      Some((id, mut record)) => {
        record.id = id;
        Ok(Some(record))
      }
      None => {
        tracing::debug!(
          existing,
          max = limit.max_requests,
          "chat rejected at write time: device over limit"
        );
        Ok(None)
      }
    }
  }

  async fn count_since(&self, device: &str, since: DateTime<Utc>) -> Result<u64> {
    let device = device.to_owned();
    let since_str = encode_dt(since);

    let n = self
      .conn
      .call(move |conn| Ok(count(conn, &device, &since_str)?))
      .await?;

    decode_count(n)
  }

  async fn chats_for_device(&self, device: &str) -> Result<Vec<ChatRecord>> {
    let device = device.to_owned();

    let raws: Vec<RawChat> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM chats WHERE device = ?1 ORDER BY id",
          RawChat::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![device], RawChat::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawChat::into_record).collect()
  }
}
