//! The retrieval index: embedded historical responses plus their texts.
//!
//! Vectors live in a JSON index file (`{"dimension": n, "vectors": [[..], ..]}`)
//! and are searched exhaustively by squared L2 distance. Row `i` of the index
//! corresponds to row `i` of the [`ContextTable`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use solace_core::chat::ContextEntry;

use crate::{Error, Result, context::ContextTable};

// ─── Vector index ────────────────────────────────────────────────────────────

/// On-disk representation of a [`VectorIndex`].
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
  dimension: usize,
  vectors:   Vec<Vec<f32>>,
}

/// A nearest neighbour in the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
  pub position: usize,
  /// Squared L2 distance to the query.
  pub distance: f32,
}

/// Exact nearest-neighbour search over fixed-dimension vectors.
#[derive(Debug, Clone)]
pub struct VectorIndex {
  dimension: usize,
  /// Row-major, `len() * dimension` floats.
  data:      Vec<f32>,
}

impl VectorIndex {
  /// Build from rows that must all share `dimension`.
  pub fn from_vectors(dimension: usize, vectors: Vec<Vec<f32>>) -> Result<Self> {
    if dimension == 0 {
      return Err(Error::IndexFormat("dimension must be positive".into()));
    }

    let mut data = Vec::with_capacity(vectors.len() * dimension);
    for (row, v) in vectors.into_iter().enumerate() {
      if v.len() != dimension {
        return Err(Error::IndexFormat(format!(
          "row {row} has {} values, expected {dimension}",
          v.len()
        )));
      }
      data.extend(v);
    }
    Ok(Self { dimension, data })
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| Error::Io {
      path: path.to_path_buf(),
      source,
    })?;
    let file: IndexFile = serde_json::from_slice(&bytes)?;
    Self::from_vectors(file.dimension, file.vectors)
  }

  pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = IndexFile {
      dimension: self.dimension,
      vectors:   self.rows().map(<[f32]>::to_vec).collect(),
    };
    let json = serde_json::to_vec(&file)?;
    std::fs::write(path, json).map_err(|source| Error::Io {
      path: path.to_path_buf(),
      source,
    })
  }

  pub fn dimension(&self) -> usize { self.dimension }

  pub fn len(&self) -> usize { self.data.len() / self.dimension }

  pub fn is_empty(&self) -> bool { self.data.is_empty() }

  fn rows(&self) -> impl Iterator<Item = &[f32]> {
    self.data.chunks_exact(self.dimension)
  }

  /// The `k` rows closest to `query`, nearest first.
  ///
  /// Equal distances are ordered by position, so results are deterministic.
  /// Returns fewer than `k` neighbours when the index is smaller than `k`.
  pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
    if query.len() != self.dimension {
      return Err(Error::DimensionMismatch {
        expected: self.dimension,
        actual:   query.len(),
      });
    }

    let mut scored: Vec<Neighbor> = self
      .rows()
      .enumerate()
      .map(|(position, row)| Neighbor {
        position,
        distance: squared_l2(query, row),
      })
      .collect();

    scored.sort_by(|a, b| {
      a.distance
        .total_cmp(&b.distance)
        .then(a.position.cmp(&b.position))
    });
    scored.truncate(k);
    Ok(scored)
  }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
  a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

// ─── Retrieval index ─────────────────────────────────────────────────────────

/// Vectors and the response texts they were computed from.
///
/// Loaded once at startup and shared read-only for the process lifetime.
#[derive(Debug, Clone)]
pub struct RetrievalIndex {
  vectors:  VectorIndex,
  contexts: ContextTable,
}

impl RetrievalIndex {
  pub fn new(vectors: VectorIndex, contexts: ContextTable) -> Self {
    if vectors.len() != contexts.len() {
      tracing::warn!(
        index_rows = vectors.len(),
        context_rows = contexts.len(),
        "index and context file disagree on row count; unmatched rows are skipped"
      );
    }
    Self { vectors, contexts }
  }

  /// Load both files. Any failure here means the service cannot start.
  pub fn load(
    index_path: impl AsRef<Path>,
    context_path: impl AsRef<Path>,
  ) -> Result<Self> {
    let vectors = VectorIndex::load(index_path)?;
    let contexts = ContextTable::load(context_path)?;
    Ok(Self::new(vectors, contexts))
  }

  pub fn dimension(&self) -> usize { self.vectors.dimension() }

  pub fn len(&self) -> usize { self.vectors.len() }

  pub fn is_empty(&self) -> bool { self.vectors.is_empty() }

  /// Texts of the `k` nearest rows, in neighbour-rank order.
  ///
  /// Positions without a context row, and rows whose text is empty after
  /// trimming, are skipped. Survivors are trimmed.
  pub fn retrieve(&self, embedding: &[f32], k: usize) -> Result<Vec<ContextEntry>> {
    let neighbors = self.vectors.search(embedding, k)?;

    Ok(
      neighbors
        .into_iter()
        .filter_map(|n| {
          let text = self.contexts.get(n.position)?.trim();
          (!text.is_empty()).then(|| ContextEntry {
            position: n.position,
            response: text.to_owned(),
          })
        })
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn grid() -> VectorIndex {
    VectorIndex::from_vectors(
      2,
      vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 3.0], vec![1.0, 0.0]],
    )
    .unwrap()
  }

  #[test]
  fn search_orders_by_distance_then_position() {
    let hits = grid().search(&[0.9, 0.0], 3).unwrap();
    let positions: Vec<_> = hits.iter().map(|n| n.position).collect();
    // Rows 1 and 3 are identical; the lower position wins the tie.
    assert_eq!(positions, [1, 3, 0]);
    assert!(hits[0].distance <= hits[2].distance);
  }

  #[test]
  fn search_is_deterministic() {
    let index = grid();
    let first = index.search(&[0.3, 0.2], 4).unwrap();
    for _ in 0..5 {
      assert_eq!(index.search(&[0.3, 0.2], 4).unwrap(), first);
    }
  }

  #[test]
  fn search_returns_at_most_len() {
    let hits = grid().search(&[0.0, 0.0], 10).unwrap();
    assert_eq!(hits.len(), 4);
  }

  #[test]
  fn search_rejects_wrong_dimension() {
    let err = grid().search(&[0.0, 0.0, 0.0], 1).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));
  }

  #[test]
  fn from_vectors_rejects_ragged_rows() {
    let err = VectorIndex::from_vectors(2, vec![vec![0.0, 0.0], vec![1.0]]).unwrap_err();
    assert!(matches!(err, Error::IndexFormat(_)));
    assert!(VectorIndex::from_vectors(0, vec![]).is_err());
  }

  #[test]
  fn save_then_load_preserves_search() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");
    let index = grid();
    index.save(&path).unwrap();

    let loaded = VectorIndex::load(&path).unwrap();
    assert_eq!(loaded.dimension(), 2);
    assert_eq!(loaded.len(), 4);
    assert_eq!(
      loaded.search(&[0.0, 2.5], 2).unwrap(),
      index.search(&[0.0, 2.5], 2).unwrap()
    );
  }

  #[test]
  fn load_missing_file_is_io_error() {
    let err = VectorIndex::load("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
  }

  #[test]
  fn load_corrupt_file_is_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");
    std::fs::write(&path, b"\x00not json").unwrap();
    assert!(matches!(VectorIndex::load(&path).unwrap_err(), Error::Json(_)));
  }

  #[test]
  fn retrieve_skips_missing_and_empty_texts() {
    let contexts = ContextTable::from_rows(vec![
      "  origin  ".into(),
      String::new(),
      "far away".into(),
    ]);
    let index = RetrievalIndex::new(grid(), contexts);

    // Neighbours of (1, 0): rows 1, 3, 0. Row 1 is empty, row 3 has no text.
    let entries = index.retrieve(&[1.0, 0.0], 3).unwrap();
    assert_eq!(entries, vec![ContextEntry {
      position: 0,
      response: "origin".into(),
    }]);
  }
}
