//! Cosine-similarity ranking over embedded fragments.

use quarry_llm::LlmProvider;

use crate::embedder::Embedder;
use crate::fragment::{Fragment, SearchHit};

/// Cosine similarity of two vectors.
///
/// Zero-norm vectors score 0.0 rather than NaN.
///
/// # Panics
///
/// Panics on dimensionality mismatch: callers must only compare vectors from
/// the same embedding model.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "embedding dimensionality mismatch");
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Score embedded fragments against a query vector and return the top `top_k`
/// by descending similarity. Fragments without an embedding are skipped. The
/// sort is stable, so exact ties keep input order and results are
/// deterministic across runs.
#[must_use]
pub fn rank(fragments: &[Fragment], query: &[f32], top_k: usize) -> Vec<SearchHit> {
    if top_k == 0 {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = fragments
        .iter()
        .filter_map(|fragment| {
            fragment.embedding.as_ref().map(|embedding| SearchHit {
                fragment: fragment.clone(),
                score: cosine_similarity(query, embedding),
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(top_k);
    hits
}

/// Query-time ranker: embeds the question and ranks fragments against it.
#[derive(Debug, Clone)]
pub struct Retriever<P> {
    embedder: Embedder<P>,
}

impl<P: LlmProvider> Retriever<P> {
    #[must_use]
    pub fn new(embedder: Embedder<P>) -> Self {
        Self { embedder }
    }

    /// Rank fragments against `query`. A failed query embedding degrades to
    /// an empty result rather than an error.
    pub async fn search(
        &self,
        fragments: &[Fragment],
        query: &str,
        top_k: usize,
    ) -> Vec<SearchHit> {
        let Some(query_vector) = self.embedder.embed_query(query).await else {
            return Vec::new();
        };
        rank(fragments, &query_vector, top_k)
    }
}
