//! Knowledge base for IAMSage.
//!
//! Turns a directory of IAM documents into a flat L2 vector index with an
//! index-aligned chunk map, persists both, and answers questions from the
//! chunks nearest to each question.

pub mod answer;
pub mod chunker;
pub mod embeddings;
pub mod pipeline;
pub mod resources;
pub mod retriever;
pub mod store;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use answer::{format_context, AnswerGenerator, AskOutcome, RagAnswer, SourceRef};
pub use chunker::{chunk_document, Chunker, ChunkerConfig};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use pipeline::{inspect, BuildStats, KnowledgeBase, KnowledgeStats};
pub use resources::Resources;
pub use retriever::Retriever;
pub use store::{ArtifactPaths, ArtifactStatus};
pub use types::{Chunk, ChunkMap, IndexManifest, RetrievedChunk, SearchHit, NO_MATCH};
pub use vector_index::{build_index, FlatL2Index, VectorIndex};
