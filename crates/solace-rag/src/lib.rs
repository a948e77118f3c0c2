//! Retrieval-augmented reply generation for Solace.
//!
//! A query is embedded, matched against a precomputed [`RetrievalIndex`] of
//! historical responses, and the surviving texts are folded into a prompt for
//! a text-generation model. The [`RagPipeline`] never fails outward: every
//! outcome is a [`Reply`], and failures collapse to fixed apology strings.
//!
//! Model access sits behind the [`Embedder`] and [`Generator`] traits so the
//! pipeline can be driven by in-process fakes in tests.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
#![allow(async_fn_in_trait)]

pub mod builder;
pub mod context;
pub mod embed;
pub mod error;
pub mod generate;
pub mod index;
pub mod pipeline;
pub mod prompt;
pub mod provider;

pub use embed::{Embedder, HttpEmbedder};
pub use error::{Error, Result};
pub use generate::{Generator, HttpGenerator, SamplingParams};
pub use index::RetrievalIndex;
pub use pipeline::{RagPipeline, Reply, Responder};
pub use provider::{ModelEndpoint, Provider};

#[cfg(test)]
pub(crate) mod test_util;
