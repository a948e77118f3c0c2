//! Offline construction of the index file from a context CSV.

use std::path::Path;

use tracing::{debug, info};

use crate::{Error, Result, context::ContextTable, embed::Embedder, index::VectorIndex};

/// Summary of a completed build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
  pub rows:      usize,
  pub embedded:  usize,
  pub dimension: usize,
}

/// Embed every `Response` cell of `context` in row order.
///
/// Blank cells get a zero vector so row positions stay aligned with the
/// context file; they are skipped at retrieval time anyway.
pub async fn embed_table<E: Embedder>(embedder: &E, context: &ContextTable) -> Result<VectorIndex> {
  let mut rows: Vec<Option<Vec<f32>>> = Vec::with_capacity(context.len());
  let mut dimension = None;

  for (position, text) in context.iter().enumerate() {
    let text = text.trim();
    if text.is_empty() {
      rows.push(None);
      continue;
    }

    let vector = embedder.embed(text).await?;
    match dimension {
      None => dimension = Some(vector.len()),
      Some(d) if d != vector.len() => {
        return Err(Error::DimensionMismatch { expected: d, actual: vector.len() });
      }
      Some(_) => {}
    }
    debug!(position, "embedded context row");
    rows.push(Some(vector));
  }

  let dimension = dimension.ok_or(Error::EmptyContext)?;
  let vectors = rows
    .into_iter()
    .map(|v| v.unwrap_or_else(|| vec![0.0; dimension]))
    .collect();
  VectorIndex::from_vectors(dimension, vectors)
}

/// Read `context_path`, embed it, and write the index to `index_path`.
pub async fn build_index<E: Embedder>(
  embedder: &E,
  context_path: impl AsRef<Path>,
  index_path: impl AsRef<Path>,
) -> Result<BuildReport> {
  let context = ContextTable::load(context_path)?;
  info!(rows = context.len(), "embedding context responses");

  let index = embed_table(embedder, &context).await?;
  index.save(index_path)?;

  let report = BuildReport {
    rows:      context.len(),
    embedded:  context.iter().filter(|t| !t.trim().is_empty()).count(),
    dimension: index.dimension(),
  };
  info!(?report, "index written");
  Ok(report)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::index::RetrievalIndex;

  /// Embeds by text length and vowel count; deterministic and cheap.
  struct ShapeEmbedder;

  impl Embedder for ShapeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
      let vowels = text.chars().filter(|c| "aeiou".contains(*c)).count();
      Ok(vec![text.len() as f32, vowels as f32])
    }
  }

  #[tokio::test]
  async fn build_then_load_retrieves_own_rows() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("context.csv");
    let index_path = dir.path().join("index.json");
    std::fs::write(&csv_path, "Context,Response\nq1,short\nq2,\nq3,a much longer answer\n").unwrap();

    let report = build_index(&ShapeEmbedder, &csv_path, &index_path).await.unwrap();
    assert_eq!(report, BuildReport { rows: 3, embedded: 2, dimension: 2 });

    let index = RetrievalIndex::load(&index_path, &csv_path).unwrap();
    assert_eq!(index.len(), 3);

    let query = ShapeEmbedder.embed("a much longer answer").await.unwrap();
    let hits = index.retrieve(&query, 1).unwrap();
    assert_eq!(hits[0].response, "a much longer answer");
    assert_eq!(hits[0].position, 2);
  }

  #[tokio::test]
  async fn all_blank_context_is_rejected() {
    let table = ContextTable::from_rows(vec![String::new(), "  ".into()]);
    let err = embed_table(&ShapeEmbedder, &table).await.unwrap_err();
    assert!(matches!(err, Error::EmptyContext));
  }
}
