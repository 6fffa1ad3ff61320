//! Artifact persistence for the vector index, chunk map and manifest.
//!
//! The three files form one unit. If any of them is missing the whole set is
//! treated as absent and rebuilt; a lone chunk map is never loaded.

use crate::types::{ChunkMap, IndexManifest, FORMAT_VERSION};
use crate::vector_index::{FlatL2Index, VectorIndex};
use iamsage_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

pub const INDEX_FILE: &str = "vector_store.idx";
pub const CHUNK_MAP_FILE: &str = "index_to_chunk_map.json";
pub const MANIFEST_FILE: &str = "index_manifest.json";

const MAGIC: &[u8; 8] = b"IAMSFLAT";
const HEADER_LEN: usize = 8 + 4 + 4 + 8;

/// Well-known artifact locations inside the processed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub index: PathBuf,
    pub chunk_map: PathBuf,
    pub manifest: PathBuf,
}

/// Whether a usable artifact set is on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStatus {
    Complete,
    Missing { missing: Vec<PathBuf> },
}

/// Everything the serving side needs, read back from disk.
#[derive(Debug, Clone)]
pub struct LoadedArtifacts {
    pub index: FlatL2Index,
    pub chunk_map: ChunkMap,
    pub manifest: IndexManifest,
}

impl ArtifactPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            index: dir.join(INDEX_FILE),
            chunk_map: dir.join(CHUNK_MAP_FILE),
            manifest: dir.join(MANIFEST_FILE),
            dir,
        }
    }

    fn all(&self) -> [&PathBuf; 3] {
        [&self.index, &self.chunk_map, &self.manifest]
    }

    pub fn status(&self) -> ArtifactStatus {
        let missing: Vec<PathBuf> = self
            .all()
            .into_iter()
            .filter(|p| !p.is_file())
            .cloned()
            .collect();

        if missing.is_empty() {
            ArtifactStatus::Complete
        } else {
            ArtifactStatus::Missing { missing }
        }
    }

    /// Sizes in bytes of the artifacts that exist.
    pub fn file_sizes(&self) -> Vec<(String, u64)> {
        self.all()
            .into_iter()
            .filter_map(|p| {
                let size = fs::metadata(p).ok()?.len();
                let name = p.file_name()?.to_string_lossy().into_owned();
                Some((name, size))
            })
            .collect()
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn check_alignment(index: &FlatL2Index, chunk_map: &ChunkMap, manifest: &IndexManifest) -> AppResult<()> {
    if index.len() != chunk_map.len() || chunk_map.len() != manifest.chunk_count {
        return Err(AppError::Knowledge(format!(
            "Index holds {} vectors but the chunk map has {} entries (manifest: {}). Run 'iamsage build --force'.",
            index.len(),
            chunk_map.len(),
            manifest.chunk_count
        )));
    }

    if index.dimensions() != manifest.dimensions {
        return Err(AppError::Knowledge(format!(
            "Index dimension {} does not match manifest dimension {}. Run 'iamsage build --force'.",
            index.dimensions(),
            manifest.dimensions
        )));
    }

    Ok(())
}

fn encode_index(index: &FlatL2Index) -> Vec<u8> {
    let raw = index.raw();
    let mut bytes = Vec::with_capacity(HEADER_LEN + raw.len() * 4);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&(index.dimensions() as u32).to_le_bytes());
    bytes.extend_from_slice(&(index.len() as u64).to_le_bytes());
    for value in raw {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn decode_index(bytes: &[u8], path: &Path) -> AppResult<FlatL2Index> {
    let corrupt = |detail: &str| {
        AppError::Knowledge(format!(
            "Index file {:?} is corrupt ({}). Run 'iamsage build --force'.",
            path, detail
        ))
    };

    if bytes.len() < HEADER_LEN || &bytes[..8] != MAGIC {
        return Err(corrupt("bad header"));
    }

    let version = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    if version != FORMAT_VERSION {
        return Err(corrupt(&format!("unsupported format version {}", version)));
    }

    let dimensions = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&bytes[16..24]);
    let count = u64::from_le_bytes(count_bytes) as usize;

    let body = &bytes[HEADER_LEN..];
    let expected = count
        .checked_mul(dimensions)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| corrupt("size overflow"))?;
    if body.len() != expected {
        return Err(corrupt(&format!(
            "expected {} data bytes, found {}",
            expected,
            body.len()
        )));
    }

    let data = body
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    FlatL2Index::from_raw(dimensions, data)
}

/// Write all three artifacts.
///
/// Every file goes to a `.tmp` sibling first; the final names are only
/// replaced once all writes succeeded. The old manifest is removed before the
/// renames and the new one is moved in last.
pub fn save_artifacts(
    paths: &ArtifactPaths,
    index: &FlatL2Index,
    chunk_map: &ChunkMap,
    manifest: &IndexManifest,
) -> AppResult<()> {
    check_alignment(index, chunk_map, manifest)?;

    fs::create_dir_all(&paths.dir).map_err(|e| {
        AppError::Knowledge(format!("Failed to create {:?}: {}", paths.dir, e))
    })?;

    let contents = [
        (&paths.index, encode_index(index)),
        (&paths.chunk_map, serde_json::to_vec_pretty(chunk_map)?),
        (&paths.manifest, serde_json::to_vec_pretty(manifest)?),
    ];

    let mut written = Vec::new();
    for (path, bytes) in &contents {
        let tmp = tmp_path(path);
        if let Err(e) = fs::write(&tmp, bytes) {
            for leftover in written.iter().chain(std::iter::once(&tmp)) {
                let _ = fs::remove_file(leftover);
            }
            return Err(AppError::Knowledge(format!("Failed to write {:?}: {}", tmp, e)));
        }
        written.push(tmp);
    }

    // Without a manifest the set reads as absent until the last rename lands.
    if let Err(e) = remove_if_present(&paths.manifest) {
        for leftover in &written {
            let _ = fs::remove_file(leftover);
        }
        return Err(AppError::Knowledge(format!(
            "Failed to remove stale manifest {:?}: {}",
            paths.manifest, e
        )));
    }

    for (i, ((path, _), tmp)) in contents.iter().zip(&written).enumerate() {
        if let Err(e) = fs::rename(tmp, path) {
            for leftover in &written[i..] {
                let _ = fs::remove_file(leftover);
            }
            return Err(AppError::Knowledge(format!(
                "Failed to move {:?} into place: {}",
                tmp, e
            )));
        }
    }

    tracing::info!(
        "Saved {} vectors and chunk map to {:?}",
        index.len(),
        paths.dir
    );

    Ok(())
}

/// Read all three artifacts and check they agree with each other.
pub fn load_artifacts(paths: &ArtifactPaths) -> AppResult<LoadedArtifacts> {
    if let ArtifactStatus::Missing { missing } = paths.status() {
        return Err(AppError::Knowledge(format!(
            "Index artifacts missing: {:?}. Run 'iamsage build'.",
            missing
        )));
    }

    let read = |path: &Path| {
        fs::read(path).map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))
    };

    let manifest: IndexManifest = serde_json::from_slice(&read(&paths.manifest)?)?;
    if manifest.format_version != FORMAT_VERSION {
        return Err(AppError::Knowledge(format!(
            "Index format version {} is not supported (expected {}). Run 'iamsage build --force'.",
            manifest.format_version, FORMAT_VERSION
        )));
    }

    let index = decode_index(&read(&paths.index)?, &paths.index)?;
    let chunk_map: ChunkMap = serde_json::from_slice(&read(&paths.chunk_map)?)?;

    check_alignment(&index, &chunk_map, &manifest)?;

    tracing::info!(
        "Loaded index with {} vectors ({} dimensions) from {:?}",
        index.len(),
        index.dimensions(),
        paths.dir
    );

    Ok(LoadedArtifacts {
        index,
        chunk_map,
        manifest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;
    use crate::vector_index::build_index;
    use chrono::Utc;
    use tempfile::TempDir;

    fn fixture() -> (FlatL2Index, ChunkMap, IndexManifest) {
        let index = build_index(3, &[vec![0.5, -1.0, 2.0], vec![0.0, 0.25, 1e-7]]).unwrap();
        let chunk_map = ChunkMap::new(vec![
            Chunk::new("rbac.md", "Roles group permissions.", "rbac_1"),
            Chunk::new("rbac.md", "Users get roles, not permissions.", "rbac_2"),
        ]);
        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            embedding_provider: "hash".to_string(),
            embedding_model: "trigram-v1".to_string(),
            dimensions: 3,
            chunk_size: 400,
            chunk_overlap: 50,
            chunk_count: 2,
            document_count: 1,
            built_at: Utc::now(),
            corpus_fingerprint: None,
        };
        (index, chunk_map, manifest)
    }

    #[test]
    fn test_round_trip() {
        let temp = TempDir::new().unwrap();
        let paths = ArtifactPaths::new(temp.path().join("processed"));
        let (index, chunk_map, manifest) = fixture();

        save_artifacts(&paths, &index, &chunk_map, &manifest).unwrap();
        assert_eq!(paths.status(), ArtifactStatus::Complete);

        let loaded = load_artifacts(&paths).unwrap();
        assert_eq!(loaded.index, index);
        assert_eq!(loaded.chunk_map, chunk_map);
        assert_eq!(loaded.manifest, manifest);
    }

    #[test]
    fn test_no_tmp_files_left() {
        let temp = TempDir::new().unwrap();
        let paths = ArtifactPaths::new(temp.path());
        let (index, chunk_map, manifest) = fixture();

        save_artifacts(&paths, &index, &chunk_map, &manifest).unwrap();

        let names: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names.iter().all(|n| !n.ends_with(".tmp")));
    }

    #[test]
    fn test_interrupted_resave_reads_as_missing() {
        let temp = TempDir::new().unwrap();
        let paths = ArtifactPaths::new(temp.path());
        let (index, chunk_map, manifest) = fixture();
        save_artifacts(&paths, &index, &chunk_map, &manifest).unwrap();

        // A directory in the chunk map's place makes its rename fail.
        fs::remove_file(&paths.chunk_map).unwrap();
        fs::create_dir(&paths.chunk_map).unwrap();
        fs::write(paths.chunk_map.join("keep"), "x").unwrap();

        let result = save_artifacts(&paths, &index, &chunk_map, &manifest);
        assert!(matches!(result, Err(AppError::Knowledge(_))));

        match paths.status() {
            ArtifactStatus::Missing { missing } => assert!(missing.contains(&paths.manifest)),
            ArtifactStatus::Complete => panic!("partial save must not look complete"),
        }
        let leftovers: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "leftover temp files: {:?}", leftovers);
    }

    #[test]
    fn test_map_only_is_missing() {
        let temp = TempDir::new().unwrap();
        let paths = ArtifactPaths::new(temp.path());
        fs::write(&paths.chunk_map, "[]").unwrap();

        match paths.status() {
            ArtifactStatus::Missing { missing } => {
                assert!(missing.contains(&paths.index));
                assert!(missing.contains(&paths.manifest));
                assert!(!missing.contains(&paths.chunk_map));
            }
            ArtifactStatus::Complete => panic!("orphaned chunk map must not count as complete"),
        }
        assert!(load_artifacts(&paths).is_err());
    }

    #[test]
    fn test_misaligned_artifacts_rejected() {
        let (index, _, manifest) = fixture();
        let short_map = ChunkMap::new(vec![Chunk::new("a.md", "x", "a_1")]);

        let temp = TempDir::new().unwrap();
        let paths = ArtifactPaths::new(temp.path());
        let result = save_artifacts(&paths, &index, &short_map, &manifest);
        assert!(matches!(result, Err(AppError::Knowledge(_))));
        assert!(!paths.index.exists());
    }

    #[test]
    fn test_truncated_index_rejected() {
        let temp = TempDir::new().unwrap();
        let paths = ArtifactPaths::new(temp.path());
        let (index, chunk_map, manifest) = fixture();
        save_artifacts(&paths, &index, &chunk_map, &manifest).unwrap();

        let bytes = fs::read(&paths.index).unwrap();
        fs::write(&paths.index, &bytes[..bytes.len() - 2]).unwrap();

        match load_artifacts(&paths) {
            Err(AppError::Knowledge(msg)) => assert!(msg.contains("corrupt")),
            other => panic!("expected corrupt index error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_file_sizes() {
        let temp = TempDir::new().unwrap();
        let paths = ArtifactPaths::new(temp.path());
        let (index, chunk_map, manifest) = fixture();
        save_artifacts(&paths, &index, &chunk_map, &manifest).unwrap();

        let sizes = paths.file_sizes();
        assert_eq!(sizes.len(), 3);
        assert_eq!(sizes[0], (INDEX_FILE.to_string(), (HEADER_LEN + 2 * 3 * 4) as u64));
    }
}
