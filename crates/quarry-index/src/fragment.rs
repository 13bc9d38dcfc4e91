use serde::{Deserialize, Serialize};

/// One overlapping slice of a source file.
///
/// Ids are assigned sequentially across a whole chunking run, so they are
/// stable only within a single request. Line numbers are 0-based, inclusive,
/// and always refer to the original file, even for fragments produced from a
/// sampled window of an oversized file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: usize,
    pub content: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Attached by the embedding batcher; never mutated afterward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// A fragment paired with its similarity score against a query. Higher is
/// more relevant.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub fragment: Fragment,
    pub score: f32,
}

/// Read-only projection of a fragment's location with a display excerpt,
/// independent of the fragment it was derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
}
