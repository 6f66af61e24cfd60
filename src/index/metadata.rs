use super::store::atomic_write;
use crate::error::{Result, TutorError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What the persisted index was built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Fingerprint of the source document at build time
    pub file_hash: String,
    /// Pages in the source, counting pages without extractable text
    pub num_documents: usize,
    pub num_chunks: usize,
    pub last_build: DateTime<Utc>,
}

/// Per-subject metadata record, rewritten whole on every successful build
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record; a missing file is `None`. A record that cannot be
    /// parsed is also `None`, so the next readiness check rebuilds.
    pub fn load(&self) -> Result<Option<IndexMetadata>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TutorError::io(
                    e,
                    format!("Failed to read metadata: {}", self.path.display()),
                ))
            }
        };

        match serde_json::from_str(&content) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable metadata at {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    /// Replace the record, stamping the current time
    pub fn save(
        &self,
        file_hash: impl Into<String>,
        num_documents: usize,
        num_chunks: usize,
    ) -> Result<IndexMetadata> {
        let metadata = IndexMetadata {
            file_hash: file_hash.into(),
            num_documents,
            num_chunks,
            last_build: Utc::now(),
        };

        let content = serde_json::to_string_pretty(&metadata)
            .map_err(|e| TutorError::json(e, "Failed to serialize index metadata"))?;
        atomic_write(&self.path, content.as_bytes()).map_err(|e| {
            TutorError::io(e, format!("Failed to write metadata: {}", self.path.display()))
        })?;

        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_absent_is_none() {
        let temp = TempDir::new().unwrap();
        let store = MetadataStore::new(temp.path().join("mathematics.metadata.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let store = MetadataStore::new(temp.path().join("mathematics.metadata.json"));

        let saved = store.save("abc123", 12, 48).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(saved, loaded);
        assert_eq!(loaded.num_chunks, 48);
        assert_eq!(loaded.num_documents, 12);
    }

    #[test]
    fn test_save_overwrites_whole_record() {
        let temp = TempDir::new().unwrap();
        let store = MetadataStore::new(temp.path().join("m.json"));

        let first = store.save("first", 1, 1).unwrap();
        let second = store.save("second", 2, 5).unwrap();
        let loaded = store.load().unwrap().unwrap();

        assert_eq!(loaded, second);
        assert!(loaded.last_build >= first.last_build);
    }

    #[test]
    fn test_record_uses_documented_field_names() {
        let temp = TempDir::new().unwrap();
        let store = MetadataStore::new(temp.path().join("m.json"));
        store.save("abc", 3, 9).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        for field in ["file_hash", "num_documents", "num_chunks", "last_build"] {
            assert!(raw.get(field).is_some(), "missing {}", field);
        }
    }

    #[test]
    fn test_corrupt_record_is_treated_as_absent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("m.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(MetadataStore::new(path).load().unwrap().is_none());
    }
}
