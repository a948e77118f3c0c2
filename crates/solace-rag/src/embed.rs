//! Sentence embedding.

use std::future::Future;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
  Error, Result,
  provider::{ModelEndpoint, Provider, check_status, http_client},
};

/// Turns text into a fixed-dimension vector.
///
/// Implementations must be safe to call concurrently from many requests.
pub trait Embedder: Send + Sync {
  fn embed<'a>(&'a self, text: &'a str) -> impl Future<Output = Result<Vec<f32>>> + Send + 'a;
}

/// [`Embedder`] backed by a remote model server.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpEmbedder {
  client: Client,
  config: ModelEndpoint,
}

impl HttpEmbedder {
  pub fn new(config: ModelEndpoint) -> Result<Self> {
    Ok(Self { client: http_client()?, config })
  }

  async fn embed_ollama(&self, text: &str) -> Result<Vec<f32>> {
    #[derive(Serialize)]
    struct Request<'a> {
      model:  &'a str,
      prompt: &'a str,
    }

    #[derive(Deserialize)]
    struct Response {
      embedding: Vec<f32>,
    }

    let url = self.config.url("/api/embeddings");
    debug!(%url, "requesting ollama embedding");

    let resp = self
      .client
      .post(&url)
      .json(&Request { model: &self.config.model, prompt: text })
      .send()
      .await?;
    let body: Response = check_status(Provider::Ollama, resp).await?.json().await?;

    if body.embedding.is_empty() {
      return Err(Error::EmptyOutput("ollama embeddings"));
    }
    Ok(body.embedding)
  }

  async fn embed_openai(&self, text: &str) -> Result<Vec<f32>> {
    #[derive(Serialize)]
    struct Request<'a> {
      model: &'a str,
      input: &'a str,
    }

    #[derive(Deserialize)]
    struct Response {
      data: Vec<Datum>,
    }

    #[derive(Deserialize)]
    struct Datum {
      embedding: Vec<f32>,
    }

    let url = self.config.url("/embeddings");
    debug!(%url, "requesting openai embedding");

    let mut req = self
      .client
      .post(&url)
      .json(&Request { model: &self.config.model, input: text });
    if let Some(key) = self.config.bearer()? {
      req = req.bearer_auth(key);
    }

    let body: Response = check_status(Provider::OpenAi, req.send().await?)
      .await?
      .json()
      .await?;

    body
      .data
      .into_iter()
      .next()
      .map(|d| d.embedding)
      .ok_or(Error::EmptyOutput("openai embeddings"))
  }
}

impl Embedder for HttpEmbedder {
  async fn embed(&self, text: &str) -> Result<Vec<f32>> {
    match self.config.provider {
      Provider::Ollama => self.embed_ollama(text).await,
      Provider::OpenAi => self.embed_openai(text).await,
    }
  }
}
