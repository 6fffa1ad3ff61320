//! Text chunking with configurable size and overlap.
//!
//! Sizes are counted in characters. A chunk ends at the latest natural
//! boundary that fits its window, trying paragraph breaks first, then
//! sentence ends, then whitespace, and finally a hard character cut. The next
//! chunk starts exactly `chunk_overlap` characters before that end, so two
//! neighbours always share an identical overlap span.

use crate::types::Chunk;
use iamsage_core::{AppError, AppResult};
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

/// Validated chunk size and overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkerConfig {
    /// Fails when `chunk_size` is zero or not larger than `chunk_overlap`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::Config(
                "Chunk size must be greater than zero".to_string(),
            ));
        }

        if chunk_overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl TryFrom<&iamsage_core::config::ChunkingConfig> for ChunkerConfig {
    type Error = AppError;

    fn try_from(config: &iamsage_core::config::ChunkingConfig) -> AppResult<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }
}

/// Splits documents into overlapping chunks.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ChunkerConfig {
        self.config
    }

    /// Lazily split `text` into chunks.
    ///
    /// Empty or whitespace-only text yields nothing. Text that fits in one
    /// chunk is yielded unchanged.
    pub fn split<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks::new(text, self.config)
    }
}

/// Candidate chunk ends (as character positions), grouped by preference.
#[derive(Debug, Default)]
struct Boundaries {
    paragraphs: Vec<usize>,
    sentences: Vec<usize>,
    words: Vec<usize>,
}

impl Boundaries {
    fn scan(text: &str, offsets: &[usize]) -> Self {
        let mut boundaries = Self::default();
        let mut prev_newline = false;

        for (pos, ch) in text.chars().enumerate() {
            if ch == '\n' && prev_newline {
                boundaries.paragraphs.push(pos + 1);
            }
            if ch.is_whitespace() {
                boundaries.words.push(pos + 1);
            }
            prev_newline = ch == '\n';
        }

        // UAX #29 sentence starts are the ends of the preceding sentences
        boundaries.sentences = text
            .split_sentence_bound_indices()
            .filter_map(|(byte, _)| offsets.binary_search(&byte).ok())
            .filter(|&pos| pos > 0)
            .collect();

        boundaries
    }

    /// Latest boundary within `lo..=hi`, by tier.
    fn best(&self, lo: usize, hi: usize) -> Option<usize> {
        [&self.paragraphs, &self.sentences, &self.words]
            .into_iter()
            .find_map(|tier| {
                let idx = tier.partition_point(|&pos| pos <= hi);
                tier[..idx].last().copied().filter(|&pos| pos >= lo)
            })
    }
}

/// Iterator over the chunks of one document.
#[derive(Debug)]
pub struct Chunks<'a> {
    text: &'a str,
    /// Byte offset of every character, plus `text.len()`
    offsets: Vec<usize>,
    boundaries: Boundaries,
    config: ChunkerConfig,
    start: usize,
    done: bool,
}

impl<'a> Chunks<'a> {
    fn new(text: &'a str, config: ChunkerConfig) -> Self {
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());

        let boundaries = Boundaries::scan(text, &offsets);

        Self {
            text,
            offsets,
            boundaries,
            config,
            start: 0,
            done: text.trim().is_empty(),
        }
    }

    fn char_len(&self) -> usize {
        self.offsets.len() - 1
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.offsets[start]..self.offsets[end]]
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let len = self.char_len();
        let start = self.start;
        let limit = (start + self.config.chunk_size).min(len);

        if limit == len {
            self.done = true;
            return Some(self.slice(start, len));
        }

        // The end must leave more than the overlap behind so the next start advances
        let earliest = start + self.config.chunk_overlap + 1;
        let end = self.boundaries.best(earliest, limit).unwrap_or(limit);

        self.start = end - self.config.chunk_overlap;
        Some(self.slice(start, end))
    }
}

/// Chunk one document and attach provenance.
///
/// `source` is the file name and chunk ids are `{file_stem}_{n}` with `n`
/// counted from 1.
pub fn chunk_document(path: &Path, text: &str, chunker: &Chunker) -> Vec<Chunk> {
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.clone());

    let chunks: Vec<Chunk> = chunker
        .split(text)
        .enumerate()
        .map(|(i, content)| Chunk::new(source.clone(), content, format!("{}_{}", stem, i + 1)))
        .collect();

    tracing::debug!(
        "Chunked {} into {} chunks (size: {}, overlap: {})",
        source,
        chunks.len(),
        chunker.config.chunk_size,
        chunker.config.chunk_overlap
    );

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkerConfig::new(size, overlap).unwrap())
    }

    fn sample_document() -> String {
        let mut doc = String::new();
        for i in 0..12 {
            doc.push_str(&format!(
                "Section {i}. Access reviews confirm that every account still needs its roles. \
                 Stale grants are revoked after thirty days! Do owners sign off? Yes.\n\n"
            ));
        }
        doc.push_str("Trailing line without a final break");
        doc
    }

    fn assert_chunk_invariants(text: &str, size: usize, overlap: usize) {
        let chunks: Vec<&str> = chunker(size, overlap).split(text).collect();
        assert!(!chunks.is_empty());

        for chunk in &chunks {
            assert!(chunk.chars().count() <= size, "chunk too long: {:?}", chunk);
        }

        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let next: Vec<char> = pair[1].chars().collect();
            let suffix: String = prev[prev.len() - overlap..].iter().collect();
            let prefix: String = next[..overlap].iter().collect();
            assert_eq!(suffix, prefix, "size={} overlap={}", size, overlap);
        }

        // Dropping each overlap rebuilds the document
        let mut rebuilt = chunks[0].to_string();
        for chunk in &chunks[1..] {
            rebuilt.extend(chunk.chars().skip(overlap));
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(ChunkerConfig::new(0, 0), Err(AppError::Config(_))));
        assert!(matches!(ChunkerConfig::new(50, 50), Err(AppError::Config(_))));
        assert!(matches!(ChunkerConfig::new(50, 80), Err(AppError::Config(_))));
        assert!(ChunkerConfig::new(1, 0).is_ok());
    }

    #[test]
    fn test_invariants_across_configs() {
        let doc = sample_document();
        for (size, overlap) in [(400, 50), (120, 30), (64, 0), (25, 24), (7, 3), (1, 0)] {
            assert_chunk_invariants(&doc, size, overlap);
        }
    }

    #[test]
    fn test_hard_cut_without_boundaries() {
        let text = "a".repeat(1000);
        let chunks: Vec<&str> = chunker(200, 50).split(&text).collect();

        // starts at 0, 150, ..., 900
        assert_eq!(chunks.len(), 7);
        assert!(chunks.iter().all(|c| c.len() <= 200));
        assert_eq!(chunks[6].len(), 100);
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let text = format!("{}\n\n{}", "first paragraph words here.", "second paragraph ".repeat(5));
        let chunks: Vec<&str> = chunker(60, 5).split(&text).collect();

        assert!(chunks[0].ends_with("here.\n\n"), "got {:?}", chunks[0]);
    }

    #[test]
    fn test_prefers_sentence_over_word() {
        let text = "Grant roles narrowly. Review them quarterly and remove unused access promptly.";
        let chunks: Vec<&str> = chunker(40, 4).split(text).collect();

        assert_eq!(chunks[0], "Grant roles narrowly. ");
    }

    #[test]
    fn test_short_document_single_chunk() {
        let text = "The Principle of Least Privilege means a user is given the minimum access needed to do their job.";
        let chunks: Vec<&str> = chunker(400, 50).split(text).collect();
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(chunker(100, 10).split("").count(), 0);
        assert_eq!(chunker(100, 10).split(" \n\n\t ").count(), 0);
    }

    #[test]
    fn test_multibyte_text() {
        let text = "Autenticação multifator é obrigatória 🔐 para administradores. ".repeat(20);
        assert_chunk_invariants(&text, 50, 10);
    }

    #[test]
    fn test_deterministic() {
        let doc = sample_document();
        let first: Vec<&str> = chunker(90, 15).split(&doc).collect();
        let second: Vec<&str> = chunker(90, 15).split(&doc).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_chunk_document_ids() {
        let text = "word ".repeat(100);
        let chunks = chunk_document(Path::new("data/raw/rbac-guide.md"), &text, &chunker(100, 10));

        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].source, "rbac-guide.md");
        assert_eq!(chunks[0].chunk_id, "rbac-guide_1");
        assert_eq!(chunks[1].chunk_id, "rbac-guide_2");
    }
}
