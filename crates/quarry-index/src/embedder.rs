//! Batched fragment embedding with provider-safe truncation.

use std::sync::Arc;

use quarry_llm::{LlmError, LlmProvider};

use crate::fragment::Fragment;

/// Embedding batcher configuration.
#[derive(Debug, Clone)]
pub struct EmbedConfig {
    /// Fragments per provider call (default: 256).
    pub batch_size: usize,
    /// Character ceiling per submitted text (default: 8000).
    pub max_chars: usize,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            batch_size: 256,
            max_chars: 8000,
        }
    }
}

/// Groups fragments into provider-sized batches and attaches the returned
/// vectors. Batches run strictly in input order, one at a time.
#[derive(Debug)]
pub struct Embedder<P> {
    provider: Arc<P>,
    config: EmbedConfig,
}

// Manual impl: `P` itself need not be `Clone` behind the `Arc`.
impl<P> Clone for Embedder<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            config: self.config.clone(),
        }
    }
}

impl<P: LlmProvider> Embedder<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, config: EmbedConfig) -> Self {
        Self { provider, config }
    }

    /// Embed all fragments, preserving input order.
    ///
    /// Empty input succeeds without calling the provider. A batch is atomic:
    /// the first failing batch aborts the whole operation and nothing partial
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns the provider's error (rate-limited, invalid request, or other)
    /// for the failing batch, or an error when the provider returns a vector
    /// count that does not match the batch.
    pub async fn embed_fragments(
        &self,
        mut fragments: Vec<Fragment>,
    ) -> Result<Vec<Fragment>, LlmError> {
        if fragments.is_empty() {
            return Ok(fragments);
        }

        let total = fragments.len();
        let mut start = 0;
        while start < total {
            let end = (start + self.config.batch_size).min(total);
            let batch = &mut fragments[start..end];

            let texts: Vec<String> = batch
                .iter()
                .map(|f| truncate_for_embedding(&f.content, self.config.max_chars).to_owned())
                .collect();

            let vectors = self.provider.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(LlmError::Other(format!(
                    "provider returned {} embeddings for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }

            for (fragment, vector) in batch.iter_mut().zip(vectors) {
                fragment.embedding = Some(vector);
            }
            start = end;
        }

        Ok(fragments)
    }

    /// Embed a single query text. Failures degrade to `None` so the caller
    /// can return empty results instead of raising.
    pub async fn embed_query(&self, text: &str) -> Option<Vec<f32>> {
        let truncated = truncate_for_embedding(text, self.config.max_chars).to_owned();
        match self.provider.embed_batch(&[truncated]).await {
            Ok(mut vectors) if !vectors.is_empty() => Some(vectors.remove(0)),
            Ok(_) => {
                tracing::warn!("provider returned no vector for query embedding");
                None
            }
            Err(e) => {
                tracing::warn!("query embedding failed: {e}");
                None
            }
        }
    }
}

/// Truncate to at most `max_chars` characters, preferring a preceding word
/// boundary when it falls within the final 20% of the budget. Always cuts on
/// a char boundary, so multi-byte content is safe.
fn truncate_for_embedding(text: &str, max_chars: usize) -> &str {
    let Some((hard_cut, _)) = text.char_indices().nth(max_chars) else {
        return text;
    };
    let prefix = &text[..hard_cut];

    if let Some(space) = prefix.rfind(' ') {
        let kept = prefix[..space].chars().count();
        if kept > max_chars * 4 / 5 {
            return &prefix[..space];
        }
    }
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_llm::mock::MockProvider;

    fn fragment(id: usize, content: &str) -> Fragment {
        Fragment {
            id,
            content: content.into(),
            file_path: "src/lib.rs".into(),
            start_line: 0,
            end_line: 0,
            embedding: None,
        }
    }

    fn embedder_with(provider: MockProvider, batch_size: usize) -> Embedder<MockProvider> {
        Embedder::new(
            Arc::new(provider),
            EmbedConfig {
                batch_size,
                max_chars: 8000,
            },
        )
    }

    #[tokio::test]
    async fn empty_input_skips_provider() {
        let provider = MockProvider::default();
        let embedder = embedder_with(provider.clone(), 256);

        let out = embedder.embed_fragments(Vec::new()).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(provider.embed_calls(), 0);
    }

    #[tokio::test]
    async fn batches_split_at_batch_size() {
        let provider = MockProvider::with_embedding(vec![1.0, 0.0]);
        let embedder = embedder_with(provider.clone(), 2);

        let fragments: Vec<Fragment> = (0..5).map(|i| fragment(i, "content")).collect();
        let out = embedder.embed_fragments(fragments).await.unwrap();

        assert_eq!(provider.embed_calls(), 3);
        assert_eq!(out.len(), 5);
        for (i, frag) in out.iter().enumerate() {
            assert_eq!(frag.id, i);
            assert_eq!(frag.embedding, Some(vec![1.0, 0.0]));
        }
    }

    #[tokio::test]
    async fn failing_batch_aborts() {
        let embedder = embedder_with(MockProvider::failing_embed(), 2);
        let fragments = vec![fragment(0, "a"), fragment(1, "b")];
        let err = embedder.embed_fragments(fragments).await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimited));
    }

    #[tokio::test]
    async fn vector_count_mismatch_is_error() {
        struct ShortProvider;
        impl LlmProvider for ShortProvider {
            async fn chat(
                &self,
                _messages: &[quarry_llm::Message],
            ) -> Result<String, LlmError> {
                Ok(String::new())
            }
            async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
                Ok(vec![vec![1.0]])
            }
            fn name(&self) -> &'static str {
                "short"
            }
        }

        let embedder = Embedder::new(Arc::new(ShortProvider), EmbedConfig::default());
        let fragments = vec![fragment(0, "a"), fragment(1, "b")];
        let err = embedder.embed_fragments(fragments).await.unwrap_err();
        assert!(matches!(err, LlmError::Other(_)));
    }

    #[tokio::test]
    async fn embed_query_returns_vector() {
        let embedder = embedder_with(MockProvider::with_embedding(vec![0.5, 0.5]), 256);
        assert_eq!(embedder.embed_query("query").await, Some(vec![0.5, 0.5]));
    }

    #[tokio::test]
    async fn embed_query_failure_degrades_to_none() {
        let embedder = embedder_with(MockProvider::failing_embed(), 256);
        assert!(embedder.embed_query("query").await.is_none());
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_for_embedding("short text", 100), "short text");
    }

    #[test]
    fn truncation_prefers_word_boundary() {
        // Boundary at char 9 of a 10-char budget: inside the final 20%.
        let text = "wordyword more and then some";
        let cut = truncate_for_embedding(text, 10);
        assert_eq!(cut, "wordyword");
    }

    #[test]
    fn truncation_ignores_distant_boundary() {
        // Only space is at char 2, well before 80% of the budget.
        let text = "ab cdefghijklmnopqrstuvwxyz";
        let cut = truncate_for_embedding(text, 20);
        assert_eq!(cut.chars().count(), 20);
    }

    #[test]
    fn truncation_is_utf8_safe() {
        let text = "é".repeat(50);
        let cut = truncate_for_embedding(&text, 10);
        assert_eq!(cut.chars().count(), 10);
    }
}
