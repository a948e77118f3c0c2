//! Runtime server configuration, deserialised from `config.toml` layered
//! with `SOLACE_*` environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use solace_core::rate_limit::RateLimit;
use solace_rag::{ModelEndpoint, Provider, SamplingParams};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:         String,
  pub port:         u16,
  pub store_path:   PathBuf,
  pub index_path:   PathBuf,
  pub context_path: PathBuf,
  /// Neighbours retrieved per query.
  pub top_k:        usize,
  pub rate_limit:   RateLimitConfig,
  pub embedding:    ModelEndpoint,
  pub generation:   ModelEndpoint,
  pub sampling:     SamplingParams,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
  pub max_requests: u32,
  pub window_secs:  i64,
}

impl Default for RateLimitConfig {
  fn default() -> Self {
    let limit = RateLimit::default();
    Self {
      max_requests: limit.max_requests,
      window_secs:  limit.window.num_seconds(),
    }
  }
}

impl RateLimitConfig {
  pub fn to_rate_limit(self) -> solace_core::Result<RateLimit> {
    RateLimit::from_secs(self.max_requests, self.window_secs)
  }
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:         "0.0.0.0".to_string(),
      port:         5000,
      store_path:   PathBuf::from("db.sqlite3"),
      index_path:   PathBuf::from("context_index.json"),
      context_path: PathBuf::from("context_responses.csv"),
      top_k:        3,
      rate_limit:   RateLimitConfig::default(),
      embedding:    ModelEndpoint {
        provider: Provider::Ollama,
        endpoint: "http://localhost:11434".to_string(),
        model:    "all-minilm".to_string(),
        api_key:  None,
      },
      generation:   ModelEndpoint {
        provider: Provider::Ollama,
        endpoint: "http://localhost:11434".to_string(),
        model:    "llama3.2".to_string(),
        api_key:  None,
      },
      sampling:     SamplingParams::default(),
    }
  }
}

impl ServerConfig {
  /// Read `path` (optional) and the environment.
  ///
  /// Nested keys use a double underscore, e.g.
  /// `SOLACE_RATE_LIMIT__MAX_REQUESTS=20`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(environment())
      .build()?
      .try_deserialize()
  }

  /// Copy with `~` expanded in every path.
  pub fn with_expanded_paths(mut self) -> Self {
    self.store_path = expand_tilde(&self.store_path);
    self.index_path = expand_tilde(&self.index_path);
    self.context_path = expand_tilde(&self.context_path);
    self
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// The `SOLACE_*` layer; it takes precedence over the file.
fn environment() -> config::Environment {
  config::Environment::with_prefix("SOLACE")
    .prefix_separator("_")
    .separator("__")
    .try_parsing(true)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn from_toml(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  /// File plus an environment given as `(name, value)` pairs.
  fn layered(toml: &str, vars: &[(&str, &str)]) -> ServerConfig {
    let vars = vars
      .iter()
      .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
      .collect::<config::Map<String, String>>();
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .add_source(environment().source(Some(vars)))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_file_yields_defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg.address(), "0.0.0.0:5000");
    assert_eq!(cfg.store_path, PathBuf::from("db.sqlite3"));
    assert_eq!(cfg.index_path, PathBuf::from("context_index.json"));
    assert_eq!(cfg.context_path, PathBuf::from("context_responses.csv"));
    assert_eq!(cfg.top_k, 3);
    assert_eq!(cfg.rate_limit.to_rate_limit().unwrap(), RateLimit::default());
    assert_eq!(cfg.embedding.provider, Provider::Ollama);
    assert_eq!(cfg.embedding.endpoint, "http://localhost:11434");
    assert_eq!(cfg.embedding.model, "all-minilm");
    assert_eq!(cfg.generation.provider, Provider::Ollama);
    assert_eq!(cfg.generation.model, "llama3.2");
    assert_eq!(cfg.generation.api_key, None);
    assert_eq!(cfg.sampling, SamplingParams::default());
  }

  #[test]
  fn environment_overrides_nested_keys() {
    let cfg = layered(
      "port = 8080\n[rate_limit]\nmax_requests = 8\n",
      &[
        ("SOLACE_PORT", "9000"),
        ("SOLACE_RATE_LIMIT__MAX_REQUESTS", "20"),
        ("SOLACE_SAMPLING__TEMPERATURE", "0.3"),
        ("OTHER_PORT", "1"),
      ],
    );
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.rate_limit.max_requests, 20);
    assert_eq!(cfg.rate_limit.window_secs, 3600);
    assert_eq!(cfg.sampling.temperature, 0.3);
    assert_eq!(cfg.sampling.max_tokens, 150);
    assert_eq!(cfg.generation.model, "llama3.2");
  }

  #[test]
  fn nested_sections_override() {
    let cfg = from_toml(
      r#"
        port = 8080
        top_k = 5

        [rate_limit]
        max_requests = 8

        [generation]
        provider = "openai"
        endpoint = "https://api.openai.com/v1"
        model = "gpt-4o-mini"
        api_key = "sk-test"

        [sampling]
        temperature = 0.2
      "#,
    );
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.top_k, 5);
    assert_eq!(cfg.rate_limit.max_requests, 8);
    assert_eq!(cfg.rate_limit.window_secs, 3600);
    assert_eq!(cfg.generation.provider, Provider::OpenAi);
    assert_eq!(cfg.generation.api_key.as_deref(), Some("sk-test"));
    assert_eq!(cfg.sampling.temperature, 0.2);
    assert_eq!(cfg.sampling.max_tokens, 150);
    assert_eq!(cfg.address(), "0.0.0.0:8080");
  }

  #[test]
  fn invalid_rate_limit_is_rejected() {
    let cfg = from_toml("[rate_limit]\nmax_requests = 0\n");
    assert!(cfg.rate_limit.to_rate_limit().is_err());
  }

  #[test]
  fn tilde_expansion_only_touches_leading_tilde() {
    assert_eq!(expand_tilde(Path::new("/abs/db.sqlite3")), PathBuf::from("/abs/db.sqlite3"));
    assert_eq!(expand_tilde(Path::new("rel/~/x")), PathBuf::from("rel/~/x"));
  }
}
