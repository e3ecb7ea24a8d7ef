//! The raw grid: rows of string cells exactly as fetched.

use serde::Serialize;
use uuid::Uuid;

/// An immutable snapshot of a fetched document.
///
/// Rows may be shorter than the header; missing cells read as empty. Every
/// grid gets a fresh `id` so position indexes built from it can be checked
/// against the grid they are used with.
#[derive(Debug, Clone, Serialize)]
pub struct Grid {
    id: Uuid,
    rows: Vec<Vec<String>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            rows,
        }
    }

    /// Fetch identifier of this snapshot.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows, header included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell text, or `""` when the row or column does not exist.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// The header row (row 0), or an empty slice for an empty grid.
    pub fn header(&self) -> &[String] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }
}

impl From<Vec<Vec<String>>> for Grid {
    fn from(rows: Vec<Vec<String>>) -> Self {
        Self::new(rows)
    }
}
