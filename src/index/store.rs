//! On-disk index artifacts
//!
//! Layout under the index root:
//!
//! ```text
//! <slug>/manifest.json       format version, model, dimension, chunk count
//! <slug>/chunks.json.zst     zstd-compressed chunks with their embeddings
//! <slug>.staging/            in-progress persist, renamed over <slug>/
//! <slug>.metadata.json       build metadata (see MetadataStore)
//! ```
//!
//! A directory only becomes visible at `<slug>/` once both artifacts are
//! written and synced, so a crash mid-persist leaves either the previous
//! index or none.

use super::{Chunk, CurriculumIndex};
use crate::config::IndexingConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Bumped whenever the artifact encoding changes
pub const FORMAT_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";
const CHUNKS_FILE: &str = "chunks.json.zst";
const ZSTD_LEVEL: i32 = 3;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Index artifact missing: {0}")]
    MissingArtifact(PathBuf),

    #[error("Incompatible index: {0}")]
    Incompatible(String),
}

impl StoreError {
    fn io(source: std::io::Error, context: impl Into<String>) -> Self {
        Self::Io {
            source,
            context: context.into(),
        }
    }
}

/// Description of a persisted index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub model: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize, Deserialize)]
struct StoredChunk {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// Filesystem store for per-subject index artifacts
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final directory of a subject's index
    pub fn index_dir(&self, slug: &str) -> PathBuf {
        self.root.join(slug)
    }

    /// Metadata record path; kept beside, not inside, the index directory so
    /// that swapping the directory never touches it
    pub fn metadata_path(&self, slug: &str) -> PathBuf {
        self.root.join(format!("{}.metadata.json", slug))
    }

    fn staging_dir(&self, slug: &str) -> PathBuf {
        self.root.join(format!("{}.staging", slug))
    }

    /// Whether the subject's index directory exists
    pub fn exists(&self, slug: &str) -> bool {
        self.index_dir(slug).is_dir()
    }

    /// Write the index to staging, then swap it into place
    pub fn persist(&self, slug: &str, index: &CurriculumIndex) -> Result<(), StoreError> {
        let staging = self.staging_dir(slug);
        let target = self.index_dir(slug);

        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| {
                StoreError::io(e, format!("Failed to clear staging area: {}", staging.display()))
            })?;
        }
        fs::create_dir_all(&staging).map_err(|e| {
            StoreError::io(e, format!("Failed to create staging directory: {}", staging.display()))
        })?;

        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            model: index.model().to_string(),
            dimension: index.dimension(),
            chunk_count: index.chunk_count(),
            created_at: chrono::Utc::now(),
        };
        let manifest_json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let stored: Vec<StoredChunk> = index
            .chunks()
            .iter()
            .zip(index.embeddings())
            .map(|(chunk, embedding)| StoredChunk {
                chunk: chunk.clone(),
                embedding: embedding.clone(),
            })
            .collect();
        let chunks_json =
            serde_json::to_vec(&stored).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let compressed = zstd::encode_all(&chunks_json[..], ZSTD_LEVEL)
            .map_err(|e| StoreError::io(e, "Failed to compress chunk artifact"))?;

        write_synced(&staging.join(CHUNKS_FILE), &compressed)?;
        write_synced(&staging.join(MANIFEST_FILE), &manifest_json)?;

        if target.exists() {
            fs::remove_dir_all(&target).map_err(|e| {
                StoreError::io(e, format!("Failed to remove previous index: {}", target.display()))
            })?;
        }
        fs::rename(&staging, &target).map_err(|e| {
            StoreError::io(
                e,
                format!(
                    "Failed to move staged index into place: {} -> {}",
                    staging.display(),
                    target.display()
                ),
            )
        })?;

        tracing::debug!(
            "Persisted {} chunks to {} ({} bytes compressed)",
            manifest.chunk_count,
            target.display(),
            compressed.len()
        );

        Ok(())
    }

    /// Load a persisted index, checking it matches the active embedding model
    pub fn load(
        &self,
        slug: &str,
        expected_model: &str,
        expected_dimension: usize,
        config: &IndexingConfig,
    ) -> Result<CurriculumIndex, StoreError> {
        let dir = self.index_dir(slug);
        let manifest_path = dir.join(MANIFEST_FILE);
        let chunks_path = dir.join(CHUNKS_FILE);

        for artifact in [&manifest_path, &chunks_path] {
            if !artifact.is_file() {
                return Err(StoreError::MissingArtifact(artifact.clone()));
            }
        }

        let manifest = self.read_manifest(&manifest_path)?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(StoreError::Incompatible(format!(
                "format version {} (expected {})",
                manifest.format_version, FORMAT_VERSION
            )));
        }
        if manifest.model != expected_model || manifest.dimension != expected_dimension {
            return Err(StoreError::Incompatible(format!(
                "built with {} ({}D), active model is {} ({}D)",
                manifest.model, manifest.dimension, expected_model, expected_dimension
            )));
        }

        let compressed = fs::read(&chunks_path).map_err(|e| {
            StoreError::io(e, format!("Failed to read chunk artifact: {}", chunks_path.display()))
        })?;
        let chunks_json = zstd::decode_all(&compressed[..])
            .map_err(|e| StoreError::io(e, "Failed to decompress chunk artifact"))?;
        let stored: Vec<StoredChunk> = serde_json::from_slice(&chunks_json)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        if stored.len() != manifest.chunk_count {
            return Err(StoreError::Incompatible(format!(
                "manifest lists {} chunks, artifact holds {}",
                manifest.chunk_count,
                stored.len()
            )));
        }

        let (chunks, embeddings): (Vec<Chunk>, Vec<Vec<f32>>) = stored
            .into_iter()
            .map(|s| (s.chunk, s.embedding))
            .unzip();

        CurriculumIndex::assemble(chunks, embeddings, manifest.model, manifest.dimension, config)
            .map_err(|e| StoreError::Incompatible(e.to_string()))
    }

    fn read_manifest(&self, path: &Path) -> Result<IndexManifest, StoreError> {
        let content = fs::read(path)
            .map_err(|e| StoreError::io(e, format!("Failed to read manifest: {}", path.display())))?;
        serde_json::from_slice(&content).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

/// Write `data` to a sibling temp file, fsync, then rename over `path`
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> Result<(), std::io::Error> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent")
    })?;
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = parent.join(format!(".{}.tmp", file_name));

    let mut file = fs::File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path)
}

fn write_synced(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut file = fs::File::create(path)
        .map_err(|e| StoreError::io(e, format!("Failed to create {}", path.display())))?;
    file.write_all(data)
        .map_err(|e| StoreError::io(e, format!("Failed to write {}", path.display())))?;
    file.sync_all()
        .map_err(|e| StoreError::io(e, format!("Failed to sync {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config() -> IndexingConfig {
        IndexingConfig {
            hnsw_m: 16,
            hnsw_ef_construction: 200,
        }
    }

    fn sample_index() -> CurriculumIndex {
        let chunks = vec![
            Chunk {
                id: 0,
                text: "Number bases".to_string(),
                source: "maths.txt".to_string(),
                page: Some(0),
                offset: 0,
            },
            Chunk {
                id: 1,
                text: "Quadratic equations".to_string(),
                source: "maths.txt".to_string(),
                page: None,
                offset: 12,
            },
        ];
        let embeddings = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
        CurriculumIndex::assemble(chunks, embeddings, "hashed-3", 3, &config()).unwrap()
    }

    #[test]
    fn test_persist_then_load() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().to_path_buf());

        store.persist("mathematics", &sample_index()).unwrap();
        assert!(store.exists("mathematics"));
        assert!(!temp.path().join("mathematics.staging").exists());

        let loaded = store.load("mathematics", "hashed-3", 3, &config()).unwrap();
        assert_eq!(loaded.chunks(), sample_index().chunks());
        assert_eq!(loaded.chunks()[1].page, None);
    }

    #[test]
    fn test_persist_replaces_previous_index() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().to_path_buf());
        let dir = store.index_dir("mathematics");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("stale.bin"), b"old").unwrap();

        store.persist("mathematics", &sample_index()).unwrap();
        assert!(!dir.join("stale.bin").exists());
        assert!(dir.join(MANIFEST_FILE).exists());
    }

    #[test]
    fn test_incomplete_artifact_set_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().to_path_buf());
        store.persist("mathematics", &sample_index()).unwrap();
        std::fs::remove_file(store.index_dir("mathematics").join(CHUNKS_FILE)).unwrap();

        let result = store.load("mathematics", "hashed-3", 3, &config());
        assert!(matches!(result, Err(StoreError::MissingArtifact(_))));
    }

    #[test]
    fn test_model_mismatch_is_incompatible() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().to_path_buf());
        store.persist("mathematics", &sample_index()).unwrap();

        let result = store.load("mathematics", "bge-small-en-v1.5", 384, &config());
        assert!(matches!(result, Err(StoreError::Incompatible(_))));
    }

    #[test]
    fn test_corrupt_chunks_fail_to_load() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().to_path_buf());
        store.persist("mathematics", &sample_index()).unwrap();
        std::fs::write(store.index_dir("mathematics").join(CHUNKS_FILE), b"garbage").unwrap();

        assert!(store.load("mathematics", "hashed-3", 3, &config()).is_err());
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("record.json");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert!(!temp.path().join("nested").join(".record.json.tmp").exists());
    }
}
