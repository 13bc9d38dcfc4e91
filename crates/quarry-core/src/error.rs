use quarry_github::FetchError;
use quarry_llm::LlmError;

/// Failures of one analyze request, classified for the HTTP surface.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    /// Malformed or missing request fields, reported with field detail.
    #[error("validation error: {0}")]
    Validation(String),

    /// Repository acquisition failed.
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// The embedding provider rejected a batch.
    #[error("embedding failed: {0}")]
    Embedding(LlmError),

    /// The request deadline expired; partial progress is discarded.
    #[error("request timed out, please try again with a smaller repository")]
    Timeout,

    /// Anything unanticipated. The detail is logged, never shown.
    #[error("internal server error")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_reports_field_detail() {
        let err = AnalyzeError::Validation("owner: must not be empty".into());
        assert!(err.to_string().contains("owner"));
    }

    #[test]
    fn internal_does_not_leak_detail() {
        let err = AnalyzeError::Internal("db password leaked".into());
        assert_eq!(err.to_string(), "internal server error");
    }

    #[test]
    fn timeout_suggests_retry() {
        assert!(AnalyzeError::Timeout.to_string().contains("try again"));
    }

    #[test]
    fn fetch_error_converts() {
        let err = AnalyzeError::from(FetchError::NotFound);
        assert_eq!(err.to_string(), "repository not found");
    }
}
