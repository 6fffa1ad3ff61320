//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label returned by a vector index for an unfilled result slot.
pub const NO_MATCH: i64 = -1;

/// Current on-disk layout version of the index artifacts.
pub const FORMAT_VERSION: u32 = 1;

/// A bounded span of a source document, stored with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Source file name (e.g. `mfa.md`)
    pub source: String,

    /// Chunk text
    pub content: String,

    /// `{file_stem}_{n}`, `n` 1-based within the file
    pub chunk_id: String,
}

impl Chunk {
    pub fn new(source: impl Into<String>, content: impl Into<String>, chunk_id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
            chunk_id: chunk_id.into(),
        }
    }
}

/// Chunk metadata aligned position-for-position with the vector index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkMap(Vec<Chunk>);

impl ChunkMap {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self(chunks)
    }

    pub fn get(&self, position: usize) -> Option<&Chunk> {
        self.0.get(position)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.0.iter()
    }

    /// Chunk texts in index order, as handed to the embedder.
    pub fn contents(&self) -> Vec<String> {
        self.0.iter().map(|c| c.content.clone()).collect()
    }

    /// Number of distinct source documents.
    pub fn document_count(&self) -> usize {
        let mut sources: Vec<&str> = self.0.iter().map(|c| c.source.as_str()).collect();
        sources.sort_unstable();
        sources.dedup();
        sources.len()
    }
}

/// One raw k-NN result: an index position (or [`NO_MATCH`]) and its squared L2 distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub label: i64,
    pub distance: f32,
}

/// A chunk resolved from a search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,

    /// Squared L2 distance to the query (lower is closer)
    pub distance: f32,

    /// 1-based rank in the result list
    pub rank: usize,
}

/// Describes how the persisted index was built.
///
/// Loading an index whose manifest disagrees with the configured embedder is
/// refused, since vectors from different models are not comparable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedding_provider: String,
    pub embedding_model: String,
    pub dimensions: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub chunk_count: usize,
    pub document_count: usize,
    pub built_at: DateTime<Utc>,

    /// SHA-256 over source names and contents, in build order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corpus_fingerprint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_map_serializes_as_plain_array() {
        let map = ChunkMap::new(vec![Chunk::new("mfa.md", "Use two factors.", "mfa_1")]);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(
            json,
            r#"[{"source":"mfa.md","content":"Use two factors.","chunk_id":"mfa_1"}]"#
        );

        let back: ChunkMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_document_count() {
        let map = ChunkMap::new(vec![
            Chunk::new("a.md", "one", "a_1"),
            Chunk::new("a.md", "two", "a_2"),
            Chunk::new("b.txt", "three", "b_1"),
        ]);
        assert_eq!(map.len(), 3);
        assert_eq!(map.document_count(), 2);
        assert_eq!(map.contents(), vec!["one", "two", "three"]);
    }
}
