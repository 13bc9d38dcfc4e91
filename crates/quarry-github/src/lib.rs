//! GitHub repository file acquisition.
//!
//! Lists a repository tree recursively, filters blobs by size and extension,
//! and fetches blob contents with a bounded fan-out, preserving tree order.

pub mod client;
pub mod error;

pub use client::{FileRecord, GithubClient, MAX_FILE_SIZE};
pub use error::FetchError;
