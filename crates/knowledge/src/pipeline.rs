//! Build and serve lifecycle.
//!
//! Artifacts present: load them and serve. Artifacts absent, or only some of
//! them present: build all three, save, then serve. There is no path back to
//! building except an explicit forced rebuild.

use crate::answer::{format_context, AnswerGenerator, AskOutcome, RagAnswer, SourceRef};
use crate::chunker::{chunk_document, Chunker, ChunkerConfig};
use crate::embeddings::EmbeddingProvider;
use crate::resources::Resources;
use crate::retriever::Retriever;
use crate::store::{load_artifacts, save_artifacts, ArtifactPaths, ArtifactStatus};
use crate::types::{ChunkMap, IndexManifest, RetrievedChunk, FORMAT_VERSION};
use crate::vector_index::{build_index, FlatL2Index, VectorIndex};
use chrono::Utc;
use iamsage_core::{AppConfig, AppError, AppResult};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

/// Corpus file extensions.
const DOCUMENT_EXTENSIONS: &[&str] = &["md", "txt"];

/// Statistics from a build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildStats {
    pub documents: usize,
    pub chunks: usize,
    pub dimensions: usize,
    pub duration_secs: f64,
}

/// What is on disk, for `stats`.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeStats {
    pub processed_dir: PathBuf,
    pub complete: bool,
    pub manifest: Option<IndexManifest>,
    pub files: Vec<(String, u64)>,
}

/// `*.md` / `*.txt` files directly under `raw_dir`, sorted by file name.
///
/// An entry that cannot be read fails the scan rather than shrinking the corpus.
pub fn discover_documents(raw_dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !raw_dir.is_dir() {
        return Err(AppError::Knowledge(format!(
            "Raw data directory {:?} does not exist",
            raw_dir
        )));
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(raw_dir)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            AppError::Knowledge(format!("Failed to scan {:?}: {}", raw_dir, e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let is_document = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| DOCUMENT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if is_document {
            documents.push(entry.into_path());
        }
    }

    Ok(documents)
}

fn read_corpus(raw_dir: &Path) -> AppResult<Vec<(PathBuf, String)>> {
    discover_documents(raw_dir)?
        .into_iter()
        .map(|path| {
            let text = std::fs::read_to_string(&path).map_err(|e| {
                AppError::Knowledge(format!("Failed to read document {:?}: {}", path, e))
            })?;
            Ok((path, text))
        })
        .collect()
}

/// SHA-256 over file names and contents, in corpus order.
pub fn corpus_fingerprint(documents: &[(PathBuf, String)]) -> String {
    let mut hasher = Sha256::new();
    for (path, text) in documents {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// An index built from scratch and already persisted.
struct Built {
    index: FlatL2Index,
    chunk_map: ChunkMap,
    manifest: IndexManifest,
    stats: BuildStats,
}

/// Chunk, embed, index and persist the whole corpus.
///
/// All chunk texts go to the embedder in one call.
async fn build_knowledge_base(
    config: &AppConfig,
    embedder: &dyn EmbeddingProvider,
) -> AppResult<Built> {
    let start = Instant::now();
    let chunker = Chunker::new(ChunkerConfig::try_from(&config.chunking)?);
    let raw_dir = config.raw_data_path();

    tracing::info!("Building knowledge base from {:?}", raw_dir);

    let documents = read_corpus(&raw_dir)?;
    if documents.is_empty() {
        return Err(AppError::Knowledge(format!(
            "No documents found in {:?}. Add .md or .txt files and run 'iamsage build'.",
            raw_dir
        )));
    }

    let mut chunks = Vec::new();
    for (path, text) in &documents {
        let document_chunks = chunk_document(path, text, &chunker);
        if document_chunks.is_empty() {
            tracing::warn!("Skipping {:?}: no text to index", path);
        }
        chunks.extend(document_chunks);
    }

    if chunks.is_empty() {
        return Err(AppError::Knowledge(format!(
            "Documents in {:?} contain no text to index",
            raw_dir
        )));
    }

    let chunk_map = ChunkMap::new(chunks);
    tracing::info!(
        "Embedding {} chunks from {} documents with {} ({})",
        chunk_map.len(),
        documents.len(),
        embedder.provider_name(),
        embedder.model_name()
    );

    let embeddings = embedder.embed_batch(&chunk_map.contents()).await?;
    if embeddings.len() != chunk_map.len() {
        return Err(AppError::Embedding(format!(
            "Embedder returned {} vectors for {} chunks",
            embeddings.len(),
            chunk_map.len()
        )));
    }

    let index = build_index(embedder.dimensions(), &embeddings)?;

    let manifest = IndexManifest {
        format_version: FORMAT_VERSION,
        embedding_provider: embedder.provider_name().to_string(),
        embedding_model: embedder.model_name().to_string(),
        dimensions: embedder.dimensions(),
        chunk_size: chunker.config().chunk_size(),
        chunk_overlap: chunker.config().chunk_overlap(),
        chunk_count: chunk_map.len(),
        document_count: chunk_map.document_count(),
        built_at: Utc::now(),
        corpus_fingerprint: Some(corpus_fingerprint(&documents)),
    };

    save_artifacts(
        &ArtifactPaths::new(config.processed_path()),
        &index,
        &chunk_map,
        &manifest,
    )?;

    let stats = BuildStats {
        documents: documents.len(),
        chunks: chunk_map.len(),
        dimensions: index.dimensions(),
        duration_secs: start.elapsed().as_secs_f64(),
    };

    tracing::info!(
        "Build completed: {} documents, {} chunks in {:.2}s",
        stats.documents,
        stats.chunks,
        stats.duration_secs
    );

    Ok(Built {
        index,
        chunk_map,
        manifest,
        stats,
    })
}

/// Refuse an index built with a different embedding model.
fn validate_manifest(manifest: &IndexManifest, embedder: &dyn EmbeddingProvider) -> AppResult<()> {
    let same_model = manifest.embedding_provider == embedder.provider_name()
        && manifest.embedding_model == embedder.model_name()
        && manifest.dimensions == embedder.dimensions();

    if !same_model {
        return Err(AppError::Config(format!(
            "Index was built with {}/{} ({} dimensions) but {}/{} ({} dimensions) is configured. \
             Run 'iamsage build --force' to rebuild.",
            manifest.embedding_provider,
            manifest.embedding_model,
            manifest.dimensions,
            embedder.provider_name(),
            embedder.model_name(),
            embedder.dimensions()
        )));
    }

    Ok(())
}

/// A loaded, read-only knowledge base ready to serve questions.
pub struct KnowledgeBase {
    manifest: IndexManifest,
    retriever: Retriever,
    build_stats: Option<BuildStats>,
}

impl KnowledgeBase {
    /// Load the artifacts, building them first when any is missing.
    ///
    /// `force_rebuild` rebuilds even when a complete set exists.
    pub async fn open_or_build(resources: &Resources, force_rebuild: bool) -> AppResult<Self> {
        let config = resources.config();
        let paths = ArtifactPaths::new(config.processed_path());
        let embedder = resources.embedder().await?;

        match paths.status() {
            ArtifactStatus::Complete if !force_rebuild => Self::load_with(config, &paths, embedder),
            status => {
                if let ArtifactStatus::Missing { missing } = &status {
                    tracing::info!("Index artifacts missing ({:?}); building", missing);
                } else {
                    tracing::info!("Forced rebuild requested");
                }

                let built = build_knowledge_base(config, embedder.as_ref()).await?;
                Ok(Self::from_parts(
                    built.index,
                    built.chunk_map,
                    built.manifest,
                    embedder,
                    Some(built.stats),
                ))
            }
        }
    }

    /// Load existing artifacts; never builds.
    pub async fn load(resources: &Resources) -> AppResult<Self> {
        let config = resources.config();
        let embedder = resources.embedder().await?;
        Self::load_with(config, &ArtifactPaths::new(config.processed_path()), embedder)
    }

    fn load_with(
        config: &AppConfig,
        paths: &ArtifactPaths,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> AppResult<Self> {
        let loaded = load_artifacts(paths)?;
        validate_manifest(&loaded.manifest, embedder.as_ref())?;
        warn_if_corpus_changed(config, &loaded.manifest);

        Ok(Self::from_parts(
            loaded.index,
            loaded.chunk_map,
            loaded.manifest,
            embedder,
            None,
        ))
    }

    fn from_parts(
        index: FlatL2Index,
        chunk_map: ChunkMap,
        manifest: IndexManifest,
        embedder: Arc<dyn EmbeddingProvider>,
        build_stats: Option<BuildStats>,
    ) -> Self {
        let retriever = Retriever::new(Arc::new(index), Arc::new(chunk_map), embedder);
        Self {
            manifest,
            retriever,
            build_stats,
        }
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn chunk_map(&self) -> &ChunkMap {
        self.retriever.chunk_map()
    }

    pub fn len(&self) -> usize {
        self.retriever.index_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Present when this instance was just built.
    pub fn build_stats(&self) -> Option<&BuildStats> {
        self.build_stats.as_ref()
    }

    pub async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<RetrievedChunk>> {
        self.retriever.search(query, top_k).await
    }

    /// Retrieve, then answer from the retrieved context.
    pub async fn ask(
        &self,
        question: &str,
        top_k: usize,
        generator: &AnswerGenerator,
    ) -> AppResult<AskOutcome> {
        let retrieved = self.search(question, top_k).await?;
        if retrieved.is_empty() {
            tracing::info!("No chunks retrieved for question");
            return Ok(AskOutcome::NoRelevantInformation);
        }

        let context = format_context(&retrieved);
        let answer = generator.generate(&context, question).await?;

        Ok(AskOutcome::Answered(RagAnswer {
            answer,
            sources: retrieved.iter().map(SourceRef::from).collect(),
        }))
    }
}

fn warn_if_corpus_changed(config: &AppConfig, manifest: &IndexManifest) {
    let Some(expected) = manifest.corpus_fingerprint.as_deref() else {
        return;
    };

    match read_corpus(&config.raw_data_path()) {
        Ok(documents) if corpus_fingerprint(&documents) != expected => {
            tracing::warn!(
                "Documents in {:?} changed since the index was built; run 'iamsage build --force' to refresh",
                config.raw_data_path()
            );
        }
        Ok(_) => {}
        Err(e) => tracing::debug!("Skipping corpus change check: {}", e),
    }
}

/// Describe the artifacts on disk without loading the index.
pub fn inspect(config: &AppConfig) -> AppResult<KnowledgeStats> {
    let paths = ArtifactPaths::new(config.processed_path());
    let manifest = if paths.manifest.is_file() {
        let bytes = std::fs::read(&paths.manifest)?;
        Some(serde_json::from_slice::<IndexManifest>(&bytes)?)
    } else {
        None
    };

    Ok(KnowledgeStats {
        processed_dir: paths.dir.clone(),
        complete: paths.status() == ArtifactStatus::Complete,
        manifest,
        files: paths.file_sizes(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_documents_filters_and_sorts() {
        let temp = TempDir::new().unwrap();
        let raw = temp.path();
        for name in ["zeta.md", "Alpha.TXT", "beta.txt", "image.png", "notes.json"] {
            fs::write(raw.join(name), "text").unwrap();
        }
        fs::create_dir(raw.join("nested")).unwrap();
        fs::write(raw.join("nested/deep.md"), "text").unwrap();

        let names: Vec<String> = discover_documents(raw)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Alpha.TXT", "beta.txt", "zeta.md"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_unreadable_entry_fails() {
        let temp = TempDir::new().unwrap();
        let raw = temp.path();
        fs::write(raw.join("mfa.md"), "text").unwrap();
        std::os::unix::fs::symlink(raw.join("gone.md"), raw.join("broken.md")).unwrap();

        assert!(matches!(discover_documents(raw), Err(AppError::Knowledge(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_follows_linked_documents() {
        let temp = TempDir::new().unwrap();
        let shared = temp.path().join("shared");
        let raw = temp.path().join("raw");
        fs::create_dir_all(&shared).unwrap();
        fs::create_dir_all(&raw).unwrap();
        fs::write(shared.join("sso.md"), "text").unwrap();
        std::os::unix::fs::symlink(shared.join("sso.md"), raw.join("sso.md")).unwrap();

        let found = discover_documents(&raw).unwrap();
        assert_eq!(found, vec![raw.join("sso.md")]);
    }

    #[test]
    fn test_discover_missing_dir() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            discover_documents(&temp.path().join("absent")),
            Err(AppError::Knowledge(_))
        ));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = vec![(PathBuf::from("a.md"), "one".to_string())];
        let b = vec![(PathBuf::from("a.md"), "two".to_string())];
        assert_eq!(corpus_fingerprint(&a), corpus_fingerprint(&a.clone()));
        assert_ne!(corpus_fingerprint(&a), corpus_fingerprint(&b));
        assert_eq!(corpus_fingerprint(&a).len(), 64);
    }
}
