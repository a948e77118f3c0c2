//! The context table: historical response texts, aligned by row with the
//! vector index.

use std::path::Path;

use crate::{Error, Result};

/// Name of the CSV column holding response text.
pub const RESPONSE_COLUMN: &str = "Response";

/// Response texts indexed by row position.
///
/// Empty cells are kept (as empty strings) so positions stay aligned with the
/// index; callers skip them at retrieval time.
#[derive(Debug, Clone, Default)]
pub struct ContextTable {
  responses: Vec<String>,
}

impl ContextTable {
  pub fn from_rows(responses: Vec<String>) -> Self { Self { responses } }

  /// Read a CSV file with a header row containing [`RESPONSE_COLUMN`].
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| Error::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_reader(file)
  }

  pub fn from_reader(reader: impl std::io::Read) -> Result<Self> {
    let mut csv = csv::ReaderBuilder::new()
      .flexible(true)
      .from_reader(reader);

    let column = csv
      .headers()?
      .iter()
      .position(|h| h.trim() == RESPONSE_COLUMN)
      .ok_or(Error::MissingColumn(RESPONSE_COLUMN))?;

    let responses = csv
      .records()
      .map(|record| -> Result<String> {
        Ok(record?.get(column).unwrap_or_default().to_owned())
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(Self { responses })
  }

  pub fn len(&self) -> usize { self.responses.len() }

  pub fn is_empty(&self) -> bool { self.responses.is_empty() }

  /// Raw text at `position`, or `None` past the end of the table.
  pub fn get(&self, position: usize) -> Option<&str> {
    self.responses.get(position).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.responses.iter().map(String::as_str)
  }
}
