//! Retrieve-then-generate: embed → nearest neighbours → prompt → generate.

use std::{future::Future, sync::Arc};

use solace_core::chat::HistoryTurn;
use tracing::{debug, warn};

use crate::{
  embed::Embedder,
  generate::{Generator, SamplingParams},
  index::RetrievalIndex,
  prompt::build_prompt,
};

pub const NO_CONTEXT_REPLY: &str =
  "I'm really sorry, but I couldn't find any helpful experiences to base my response on.";
pub const RETRIEVAL_FAILED_REPLY: &str = "Sorry, I'm having trouble processing your request.";
pub const GENERATION_FAILED_REPLY: &str =
  "Sorry, I had trouble generating a response. Please try again.";

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// The outcome of one pipeline run.
///
/// Every variant renders to user-facing text via [`Reply::text`]; the
/// failure variants keep the reason for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
  /// Generated text, surrounding whitespace trimmed.
  Generated(String),
  /// No neighbour had usable text; the generator was not called.
  NoContext,
  /// Embedding or index search failed.
  RetrievalFailed(String),
  /// The generator failed.
  GenerationFailed(String),
}

impl Reply {
  pub fn text(&self) -> &str {
    match self {
      Reply::Generated(text) => text,
      Reply::NoContext => NO_CONTEXT_REPLY,
      Reply::RetrievalFailed(_) => RETRIEVAL_FAILED_REPLY,
      Reply::GenerationFailed(_) => GENERATION_FAILED_REPLY,
    }
  }

  pub fn into_text(self) -> String {
    match self {
      Reply::Generated(text) => text,
      other => other.text().to_owned(),
    }
  }

  pub fn is_generated(&self) -> bool { matches!(self, Reply::Generated(_)) }
}

// ─── Responder ───────────────────────────────────────────────────────────────

/// Anything that can answer a query. Never fails; failures are a [`Reply`].
pub trait Responder: Send + Sync {
  fn respond<'a>(
    &'a self,
    query: &'a str,
    history: &'a [HistoryTurn],
  ) -> impl Future<Output = Reply> + Send + 'a;
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// The fixed retrieval-augmented generation pipeline.
pub struct RagPipeline<E, G> {
  embedder:  E,
  generator: G,
  index:     Arc<RetrievalIndex>,
  top_k:     usize,
  sampling:  SamplingParams,
}

impl<E, G> RagPipeline<E, G>
where
  E: Embedder,
  G: Generator,
{
  /// Pipeline with the default `top_k` of 3 and default sampling.
  pub fn new(embedder: E, generator: G, index: Arc<RetrievalIndex>) -> Self {
    Self {
      embedder,
      generator,
      index,
      top_k: 3,
      sampling: SamplingParams::default(),
    }
  }

  pub fn with_top_k(mut self, top_k: usize) -> Self {
    self.top_k = top_k;
    self
  }

  pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
    self.sampling = sampling;
    self
  }

  pub fn top_k(&self) -> usize { self.top_k }

  pub fn generator(&self) -> &G { &self.generator }

  /// Run the pipeline for `query`, optionally continuing `history`.
  pub async fn generate_response(&self, query: &str, history: &[HistoryTurn]) -> Reply {
    let embedding = match self.embedder.embed(query).await {
      Ok(e) => e,
      Err(e) => {
        warn!(error = %e, "embedding failed");
        return Reply::RetrievalFailed(e.to_string());
      }
    };

    let contexts = match self.index.retrieve(&embedding, self.top_k) {
      Ok(c) => c,
      Err(e) => {
        warn!(error = %e, "index search failed");
        return Reply::RetrievalFailed(e.to_string());
      }
    };

    if contexts.is_empty() {
      debug!(top_k = self.top_k, "no usable neighbours");
      return Reply::NoContext;
    }
    debug!(
      positions = ?contexts.iter().map(|c| c.position).collect::<Vec<_>>(),
      "retrieved context"
    );

    let prompt = build_prompt(query, history, &contexts);

    match self.generator.generate(&prompt, &self.sampling).await {
      Ok(text) => Reply::Generated(text.trim().to_owned()),
      Err(e) => {
        warn!(error = %e, "generation failed");
        Reply::GenerationFailed(e.to_string())
      }
    }
  }
}

impl<E, G> Responder for RagPipeline<E, G>
where
  E: Embedder,
  G: Generator,
{
  async fn respond(&self, query: &str, history: &[HistoryTurn]) -> Reply {
    self.generate_response(query, history).await
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  };

  use super::*;
  use crate::{
    Error, Result,
    context::ContextTable,
    index::VectorIndex,
  };

  /// Maps a few known words to fixed vectors; anything else fails.
  struct KeywordEmbedder;

  impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
      match text {
        "sleep" => Ok(vec![1.0, 0.0]),
        "stress" => Ok(vec![0.0, 1.0]),
        "wide" => Ok(vec![0.0, 1.0, 2.0]),
        _ => Err(Error::EmptyOutput("keyword embedder")),
      }
    }
  }

  /// Records prompts and echoes a fixed reply, or fails when told to.
  #[derive(Default)]
  struct RecordingGenerator {
    calls:   AtomicUsize,
    prompts: Mutex<Vec<String>>,
    fail:    bool,
  }

  impl Generator for RecordingGenerator {
    async fn generate(&self, prompt: &str, _params: &SamplingParams) -> Result<String> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self.prompts.lock().unwrap().push(prompt.to_owned());
      if self.fail {
        Err(Error::EmptyOutput("recording generator"))
      } else {
        Ok("\n  Try a wind-down routine.  \n".into())
      }
    }
  }

  fn index(texts: &[&str]) -> Arc<RetrievalIndex> {
    let vectors = VectorIndex::from_vectors(
      2,
      vec![vec![1.0, 0.0], vec![0.9, 0.1], vec![0.0, 1.0], vec![0.1, 0.9]],
    )
    .unwrap();
    let contexts = ContextTable::from_rows(texts.iter().map(|t| (*t).to_owned()).collect());
    Arc::new(RetrievalIndex::new(vectors, contexts))
  }

  fn pipeline(
    texts: &[&str],
    generator: RecordingGenerator,
  ) -> RagPipeline<KeywordEmbedder, RecordingGenerator> {
    RagPipeline::new(KeywordEmbedder, generator, index(texts))
  }

  #[tokio::test]
  async fn generates_from_nearest_contexts() {
    let p = pipeline(
      &["No phone in bed", "Same bedtime daily", "Breathe slowly", "Take breaks"],
      RecordingGenerator::default(),
    );

    let reply = p.generate_response("sleep", &[]).await;
    assert_eq!(reply, Reply::Generated("Try a wind-down routine.".into()));

    let prompts = p.generator.prompts.lock().unwrap();
    let prompt = &prompts[0];
    // Rank order: rows 0, 1, then the nearer of the stress rows (3).
    let first = prompt.find("- No phone in bed").unwrap();
    let second = prompt.find("- Same bedtime daily").unwrap();
    let third = prompt.find("- Take breaks").unwrap();
    assert!(first < second && second < third, "{prompt}");
    assert!(!prompt.contains("Breathe slowly"));
    assert!(prompt.ends_with("User: sleep\nAssistant:"));
  }

  #[tokio::test]
  async fn history_is_rendered_into_prompt() {
    let p = pipeline(&["a", "b", "c", "d"], RecordingGenerator::default());
    let history = [HistoryTurn { user: "hi".into(), assistant: "hello".into() }];

    p.generate_response("stress", &history).await;

    let prompts = p.generator.prompts.lock().unwrap();
    assert!(prompts[0].contains("Conversation so far:\nUser: hi\nAssistant: hello\n"));
  }

  #[tokio::test]
  async fn empty_neighbours_skip_generator() {
    let p = pipeline(&["", "   ", "Breathe", "Rest"], RecordingGenerator::default());

    let reply = p.generate_response("sleep", &[]).await;
    // Rows 0 and 1 are blank, row 3 survives as the third neighbour.
    assert!(reply.is_generated());

    let p = pipeline(&["", "   "], RecordingGenerator::default());
    let reply = p.with_top_k(2).generate_response("sleep", &[]).await;
    assert_eq!(reply, Reply::NoContext);
    assert_eq!(reply.text(), NO_CONTEXT_REPLY);
  }

  #[tokio::test]
  async fn no_context_never_calls_generator() {
    let p = pipeline(&[], RecordingGenerator::default());
    let reply = p.generate_response("sleep", &[]).await;
    assert_eq!(reply, Reply::NoContext);
    assert_eq!(p.generator.calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn embedding_failure_is_soft() {
    let p = pipeline(&["a", "b", "c", "d"], RecordingGenerator::default());
    let reply = p.generate_response("unknown words", &[]).await;
    assert!(matches!(reply, Reply::RetrievalFailed(_)));
    assert_eq!(reply.into_text(), RETRIEVAL_FAILED_REPLY);
    assert_eq!(p.generator.calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn dimension_mismatch_is_retrieval_failure() {
    let p = pipeline(&["a", "b", "c", "d"], RecordingGenerator::default());
    let reply = p.generate_response("wide", &[]).await;
    assert!(matches!(reply, Reply::RetrievalFailed(ref r) if r.contains("dimension")));
  }

  #[tokio::test]
  async fn generation_failure_is_soft() {
    let generator = RecordingGenerator { fail: true, ..Default::default() };
    let p = pipeline(&["a", "b", "c", "d"], generator);
    let reply = p.respond("sleep", &[]).await;
    assert!(matches!(reply, Reply::GenerationFailed(_)));
    assert_eq!(reply.text(), GENERATION_FAILED_REPLY);
  }

  #[tokio::test]
  async fn top_k_bounds_context_size() {
    let p = pipeline(&["a", "b", "c", "d"], RecordingGenerator::default()).with_top_k(1);
    p.generate_response("stress", &[]).await;

    let prompts = p.generator.prompts.lock().unwrap();
    assert!(prompts[0].contains("- c\n\nUser:"));
    assert!(!prompts[0].contains("- d"));
  }
}
