//! The analyze pipeline: fetch → chunk → embed → rank → answer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use quarry_github::{FileRecord, GithubClient};
use quarry_index::{
    AnswerConfig, ChunkerConfig, Citation, EmbedConfig, Embedder, Fragment, Retriever, SearchHit,
    chunk_files, generate_answer,
};
use quarry_llm::LlmProvider;

use crate::config::Config;
use crate::error::AnalyzeError;

pub const MAX_TOP_K: usize = 20;
const DEFAULT_REF: &str = "main";

/// One inbound analyze request. `ref` defaults to `main`, `top_k` to 8.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default, rename = "topK", alias = "top_k")]
    pub top_k: Option<usize>,
}

/// Content-free projection of a fetched file for the response payload.
#[derive(Debug, Clone, Serialize)]
pub struct FileMeta {
    pub path: String,
    pub size: u64,
    pub sha: String,
}

impl From<&FileRecord> for FileMeta {
    fn from(file: &FileRecord) -> Self {
        Self {
            path: file.path.clone(),
            size: file.size,
            sha: file.sha.clone(),
        }
    }
}

/// Terminal artifact of one request; holds no identity beyond it.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub files: Vec<FileMeta>,
    pub fragments: Vec<Fragment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hits: Option<Vec<SearchHit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
}

struct ValidatedRequest {
    owner: String,
    name: String,
    git_ref: String,
    question: Option<String>,
    top_k: usize,
}

/// Per-request pipeline over immutable configuration. No state survives a
/// request; every run re-fetches and re-embeds.
pub struct Analyzer<P> {
    github: GithubClient,
    provider: Arc<P>,
    embedder: Embedder<P>,
    retriever: Retriever<P>,
    chunker: ChunkerConfig,
    answer: AnswerConfig,
    default_top_k: usize,
}

impl<P: LlmProvider> Analyzer<P> {
    #[must_use]
    pub fn new(github: GithubClient, provider: Arc<P>, config: &Config) -> Self {
        let embedder = Embedder::new(
            Arc::clone(&provider),
            EmbedConfig {
                batch_size: config.embedding.batch_size,
                max_chars: config.embedding.max_chars,
            },
        );
        let retriever = Retriever::new(embedder.clone());
        Self {
            github,
            provider,
            embedder,
            retriever,
            chunker: ChunkerConfig {
                target_size: config.chunking.target_size,
                overlap: config.chunking.overlap,
                max_file_lines: config.chunking.max_file_lines,
            },
            answer: AnswerConfig {
                snippet_len: config.search.snippet_len,
                citation_len: config.search.citation_len,
            },
            default_top_k: config.search.default_top_k,
        }
    }

    /// Run one analyze request end to end.
    ///
    /// # Errors
    ///
    /// Returns a classified [`AnalyzeError`]; an answer-generation failure is
    /// not one — the response then carries fragments and hits without an
    /// answer.
    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse, AnalyzeError> {
        let request = self.validate(request)?;

        let files = self
            .github
            .fetch_repo_files(&request.owner, &request.name, &request.git_ref)
            .await?;
        if files.is_empty() {
            return Err(AnalyzeError::Validation(
                "no text files found in repository".into(),
            ));
        }
        tracing::info!(
            files = files.len(),
            "fetched {}/{}@{}",
            request.owner,
            request.name,
            request.git_ref
        );

        let fragments = chunk_files(&files, &self.chunker);
        let fragments = self
            .embedder
            .embed_fragments(fragments)
            .await
            .map_err(AnalyzeError::Embedding)?;
        tracing::debug!(fragments = fragments.len(), "embedded fragments");

        let mut hits = None;
        let mut answer = None;
        let mut citations = None;

        if let Some(ref question) = request.question {
            let ranked = self
                .retriever
                .search(&fragments, question, request.top_k)
                .await;

            if !ranked.is_empty()
                && let Some(generated) =
                    generate_answer(self.provider.as_ref(), question, &ranked, &self.answer).await
            {
                answer = Some(generated.text);
                citations = Some(generated.citations);
            }
            hits = Some(ranked);
        }

        Ok(AnalyzeResponse {
            files: files.iter().map(FileMeta::from).collect(),
            fragments,
            hits,
            answer,
            citations,
        })
    }

    fn validate(&self, request: AnalyzeRequest) -> Result<ValidatedRequest, AnalyzeError> {
        let owner = request.owner.trim().to_owned();
        if owner.is_empty() {
            return Err(AnalyzeError::Validation("owner: must not be empty".into()));
        }
        let name = request.name.trim().to_owned();
        if name.is_empty() {
            return Err(AnalyzeError::Validation("name: must not be empty".into()));
        }

        let top_k = request.top_k.unwrap_or(self.default_top_k);
        if !(1..=MAX_TOP_K).contains(&top_k) {
            return Err(AnalyzeError::Validation(format!(
                "topK: must be between 1 and {MAX_TOP_K}"
            )));
        }

        let git_ref = request
            .git_ref
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REF.to_owned());
        let question = request
            .question
            .filter(|q| !q.trim().is_empty());

        Ok(ValidatedRequest {
            owner,
            name,
            git_ref,
            question,
            top_k,
        })
    }
}
