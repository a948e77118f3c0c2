//! Text generation.

use std::future::Future;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
  Error, Result,
  provider::{ModelEndpoint, Provider, check_status, http_client},
};

/// Decoding settings for one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
  /// Upper bound on generated tokens.
  pub max_tokens:    u32,
  /// When `false`, decoding is greedy and `temperature` / `top_p` are ignored.
  pub sample:        bool,
  pub temperature:   f32,
  pub top_p:         f32,
  pub num_sequences: u32,
}

impl Default for SamplingParams {
  fn default() -> Self {
    Self {
      max_tokens:    150,
      sample:        true,
      temperature:   0.8,
      top_p:         0.95,
      num_sequences: 1,
    }
  }
}

impl SamplingParams {
  /// Temperature actually sent to the model.
  fn effective_temperature(&self) -> f32 {
    if self.sample { self.temperature } else { 0.0 }
  }

  fn effective_top_p(&self) -> f32 {
    if self.sample { self.top_p } else { 1.0 }
  }
}

/// Produces a completion for a prompt.
///
/// Implementations must be safe to call concurrently from many requests.
pub trait Generator: Send + Sync {
  fn generate<'a>(
    &'a self,
    prompt: &'a str,
    params: &'a SamplingParams,
  ) -> impl Future<Output = Result<String>> + Send + 'a;
}

/// [`Generator`] backed by a remote model server. Returns the first sequence.
#[derive(Clone)]
pub struct HttpGenerator {
  client: Client,
  config: ModelEndpoint,
}

impl HttpGenerator {
  pub fn new(config: ModelEndpoint) -> Result<Self> {
    Ok(Self { client: http_client()?, config })
  }

  async fn generate_ollama(&self, prompt: &str, params: &SamplingParams) -> Result<String> {
    #[derive(Serialize)]
    struct Options {
      num_predict: u32,
      temperature: f32,
      top_p:       f32,
    }

    #[derive(Serialize)]
    struct Request<'a> {
      model:   &'a str,
      prompt:  &'a str,
      stream:  bool,
      options: Options,
    }

    #[derive(Deserialize)]
    struct Response {
      response: String,
    }

    let url = self.config.url("/api/generate");
    debug!(%url, prompt_len = prompt.len(), "requesting ollama generation");

    let request = Request {
      model:   &self.config.model,
      prompt,
      stream:  false,
      options: Options {
        num_predict: params.max_tokens,
        temperature: params.effective_temperature(),
        top_p:       params.effective_top_p(),
      },
    };

    let resp = self.client.post(&url).json(&request).send().await?;
    let body: Response = check_status(Provider::Ollama, resp).await?.json().await?;
    Ok(body.response)
  }

  async fn generate_openai(&self, prompt: &str, params: &SamplingParams) -> Result<String> {
    #[derive(Serialize)]
    struct Request<'a> {
      model:       &'a str,
      prompt:      &'a str,
      max_tokens:  u32,
      temperature: f32,
      top_p:       f32,
      n:           u32,
    }

    #[derive(Deserialize)]
    struct Response {
      choices: Vec<Choice>,
    }

    #[derive(Deserialize)]
    struct Choice {
      text: String,
    }

    let url = self.config.url("/completions");
    debug!(%url, prompt_len = prompt.len(), "requesting openai completion");

    let mut req = self.client.post(&url).json(&Request {
      model:       &self.config.model,
      prompt,
      max_tokens:  params.max_tokens,
      temperature: params.effective_temperature(),
      top_p:       params.effective_top_p(),
      n:           params.num_sequences.max(1),
    });
    if let Some(key) = self.config.bearer()? {
      req = req.bearer_auth(key);
    }

    let body: Response = check_status(Provider::OpenAi, req.send().await?)
      .await?
      .json()
      .await?;

    body
      .choices
      .into_iter()
      .next()
      .map(|c| c.text)
      .ok_or(Error::EmptyOutput("openai completions"))
  }
}

impl Generator for HttpGenerator {
  async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String> {
    match self.config.provider {
      Provider::Ollama => self.generate_ollama(prompt, params).await,
      Provider::OpenAi => self.generate_openai(prompt, params).await,
    }
  }
}
