//! Embedding providers.
//!
//! The build embeds every chunk in one batch and the retriever embeds one
//! query at a time; both must use the same model.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{HashProvider, OllamaEmbedder};
