//! Error type for `solace-rag`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to read {path:?}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed index file: {0}")]
  IndexFormat(String),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("context file must contain a {0:?} column")]
  MissingColumn(&'static str),

  #[error("context file has no non-empty responses to embed")]
  EmptyContext,

  #[error("embedding has dimension {actual}, index expects {expected}")]
  DimensionMismatch { expected: usize, actual: usize },

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{provider} returned {status}: {body}")]
  Provider {
    provider: &'static str,
    status:   u16,
    body:     String,
  },

  #[error("{0} response contained no output")]
  EmptyOutput(&'static str),

  #[error("{0} provider requires an api_key")]
  MissingApiKey(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
