//! Error types for repository acquisition.

/// Errors that can occur while fetching repository files.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Repository or ref does not exist (HTTP 404).
    #[error("repository not found")]
    NotFound,

    /// Access denied, typically rate limiting on unauthenticated requests (HTTP 403).
    #[error("repository access denied")]
    AccessDenied,

    /// Transport-level failure talking to the GitHub API.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Unexpected status from the GitHub API.
    #[error("GitHub API request failed (status {0})")]
    Status(reqwest::StatusCode),

    /// Response body did not match the expected shape.
    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Blob content was not valid base64/UTF-8.
    #[error("blob decode failed: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;
