//! The retrieval core: chunking, embedding batching, similarity ranking, and
//! answer assembly with citations.

pub mod answer;
pub mod chunker;
pub mod embedder;
pub mod fragment;
pub mod search;

pub use answer::{Answer, AnswerConfig, generate_answer};
pub use chunker::{ChunkerConfig, chunk_files};
pub use embedder::{EmbedConfig, Embedder};
pub use fragment::{Citation, Fragment, SearchHit};
pub use search::{Retriever, cosine_similarity, rank};
