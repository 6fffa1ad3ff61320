//! Query-time retrieval: embed, search, resolve through the chunk map.

use crate::embeddings::EmbeddingProvider;
use crate::types::{ChunkMap, RetrievedChunk, NO_MATCH};
use crate::vector_index::VectorIndex;
use iamsage_core::{AppError, AppResult};
use std::sync::Arc;

/// Read-only view over a loaded index and its chunk map.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    chunk_map: Arc<ChunkMap>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        chunk_map: Arc<ChunkMap>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            index,
            chunk_map,
            embedder,
        }
    }

    pub fn chunk_map(&self) -> &ChunkMap {
        &self.chunk_map
    }

    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Up to `top_k` chunks nearest to `query`, nearest first.
    ///
    /// An empty index yields an empty result without embedding the query.
    /// Asking for more results than the index holds is not an error.
    pub async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<RetrievedChunk>> {
        if top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }

        if self.index.is_empty() {
            tracing::debug!("Index is empty; nothing to retrieve");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let hits = self.index.search(&query_embedding, top_k)?;

        let results: Vec<RetrievedChunk> = hits
            .into_iter()
            .filter(|hit| hit.label != NO_MATCH)
            .filter_map(|hit| {
                let chunk = usize::try_from(hit.label)
                    .ok()
                    .and_then(|position| self.chunk_map.get(position));
                if chunk.is_none() {
                    tracing::warn!("Index returned position {} outside the chunk map", hit.label);
                }
                chunk.map(|chunk| (chunk.clone(), hit.distance))
            })
            .take(top_k)
            .enumerate()
            .map(|(i, (chunk, distance))| RetrievedChunk {
                chunk,
                distance,
                rank: i + 1,
            })
            .collect();

        tracing::debug!(
            "Retrieved {} chunks for query (top_k: {})",
            results.len(),
            top_k
        );

        Ok(results)
    }
}
