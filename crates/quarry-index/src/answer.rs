//! Grounded answer assembly: context block, completion call, citations.

use std::fmt::Write;

use quarry_llm::{LlmProvider, Message};

use crate::fragment::{Citation, SearchHit};

/// Word-boundary lookahead when trimming excerpt edges, in characters.
const WORD_LOOKAHEAD: usize = 50;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions about code repositories. \
Use the provided code snippets to answer the user's question accurately. \
Always cite the specific file paths and line numbers when referencing code. \
If you cannot find the answer in the provided context, say so clearly.";

/// Answer assembly configuration.
#[derive(Debug, Clone)]
pub struct AnswerConfig {
    /// Excerpt length inside the model context block (default: 200).
    pub snippet_len: usize,
    /// Excerpt length for returned citations (default: 200).
    pub citation_len: usize,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            snippet_len: 200,
            citation_len: 200,
        }
    }
}

/// A generated answer with one citation per grounding hit.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// Ask the completion model a question grounded in the ranked hits.
///
/// Returns `None` without calling the model when `hits` is empty, and `None`
/// (logged) when the completion fails — a missing answer degrades the result,
/// it does not fail the request.
pub async fn generate_answer<P: LlmProvider>(
    provider: &P,
    question: &str,
    hits: &[SearchHit],
    config: &AnswerConfig,
) -> Option<Answer> {
    if hits.is_empty() {
        return None;
    }

    let context = build_context(hits, config.snippet_len);
    let messages = [
        Message::system(SYSTEM_PROMPT),
        Message::user(format!(
            "Question: {question}\n\nContext:\n{context}\n\n\
             Please provide a comprehensive answer based on the code context above."
        )),
    ];

    let text = match provider.chat(&messages).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("answer generation failed: {e}");
            return None;
        }
    };

    let citations = hits
        .iter()
        .map(|hit| Citation {
            file_path: hit.fragment.file_path.clone(),
            start_line: hit.fragment.start_line,
            end_line: hit.fragment.end_line,
            content: extract_snippet(&hit.fragment.content, config.citation_len),
        })
        .collect();

    Some(Answer { text, citations })
}

/// Numbered context block: rank index, location, excerpt.
fn build_context(hits: &[SearchHit], snippet_len: usize) -> String {
    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        let _ = write!(
            out,
            "[{}] {}:{}-{}\n{}",
            i + 1,
            hit.fragment.file_path,
            hit.fragment.start_line,
            hit.fragment.end_line,
            extract_snippet(&hit.fragment.content, snippet_len),
        );
    }
    out
}

/// Extract an excerpt of at most `max_len` characters centered on the text's
/// midpoint, so long fragments surface their middle rather than only their
/// head. Edges that cut into the text are marked with `...` and trimmed to a
/// word boundary within a small lookahead.
fn extract_snippet(text: &str, max_len: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_len {
        return text.to_owned();
    }

    let start = (chars.len() - max_len) / 2;
    let end = start + max_len;
    let mut snippet: String = chars[start..end].iter().collect();

    if start > 0 {
        match snippet.find(' ') {
            Some(pos) if pos > 0 && snippet[..pos].chars().count() < WORD_LOOKAHEAD => {
                snippet = format!("...{}", &snippet[pos + 1..]);
            }
            _ => snippet = format!("...{snippet}"),
        }
    }

    if end < chars.len() {
        if let Some(pos) = snippet.rfind(' ')
            && snippet[pos..].chars().count() < WORD_LOOKAHEAD
        {
            snippet.truncate(pos);
        }
        snippet.push_str("...");
    }

    snippet
}
