//! Model provider selection and the shared HTTP client settings.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::{Error, Result};

/// Wire protocol spoken by a model server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
  /// Ollama's native API (`/api/embeddings`, `/api/generate`).
  Ollama,
  /// OpenAI-compatible API (`/embeddings`, `/completions`).
  #[serde(rename = "openai")]
  OpenAi,
}

impl Provider {
  pub fn name(self) -> &'static str {
    match self {
      Provider::Ollama => "ollama",
      Provider::OpenAi => "openai",
    }
  }
}

/// Where and how to reach one model.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelEndpoint {
  pub provider: Provider,
  /// Base URL, e.g. `http://localhost:11434` or `https://api.openai.com/v1`.
  pub endpoint: String,
  pub model:    String,
  #[serde(default)]
  pub api_key:  Option<String>,
}

impl ModelEndpoint {
  pub fn url(&self, path: &str) -> String {
    format!("{}{}", self.endpoint.trim_end_matches('/'), path)
  }

  /// Bearer key for providers that need one.
  pub(crate) fn bearer(&self) -> Result<Option<&str>> {
    match (self.provider, self.api_key.as_deref()) {
      (Provider::OpenAi, None) => Err(Error::MissingApiKey(self.provider.name())),
      (_, key) => Ok(key),
    }
  }
}

/// Build the HTTP client shared by one embedder or generator.
pub(crate) fn http_client() -> Result<Client> {
  Ok(
    Client::builder()
      .timeout(Duration::from_secs(120))
      .pool_idle_timeout(Duration::from_secs(30))
      .build()?,
  )
}

/// Turn a non-2xx response into [`Error::Provider`].
pub(crate) async fn check_status(
  provider: Provider,
  resp: reqwest::Response,
) -> Result<reqwest::Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp
    .text()
    .await
    .unwrap_or_else(|_| "<unreadable body>".to_string());
  Err(Error::Provider { provider: provider.name(), status: status.as_u16(), body })
}
