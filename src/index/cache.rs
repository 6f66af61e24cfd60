use super::builder::{BuildError, IndexBuilder};
use super::metadata::{IndexMetadata, MetadataStore};
use super::store::IndexStore;
use super::CurriculumIndex;
use crate::config::Config;
use crate::curriculum::{fingerprint, Subject};
use crate::embedding::{provider_from_config, EmbeddingProvider};
use crate::error::TutorError;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] TutorError),

    #[error("Index task aborted: {0}")]
    Task(String),
}

/// Why a subject's index had to be built instead of loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildReason {
    Forced,
    MissingIndex,
    NoMetadata,
    FingerprintMismatch,
    LoadFailed(String),
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forced => write!(f, "rebuild requested"),
            Self::MissingIndex => write!(f, "no index on disk"),
            Self::NoMetadata => write!(f, "no build metadata"),
            Self::FingerprintMismatch => write!(f, "source document changed"),
            Self::LoadFailed(e) => write!(f, "persisted index unusable: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOrigin {
    Loaded,
    Built {
        reason: RebuildReason,
        /// False when the index lives only in memory
        persisted: bool,
    },
}

/// A usable index and how it was obtained
#[derive(Debug, Clone)]
pub struct ReadyIndex {
    pub index: Arc<CurriculumIndex>,
    pub origin: IndexOrigin,
    /// Metadata record on disk after the call
    pub metadata: Option<IndexMetadata>,
}

/// On-disk cache state for a subject
#[derive(Debug, Clone)]
pub struct IndexStatus {
    pub subject: String,
    pub source: String,
    pub index_on_disk: bool,
    pub metadata: Option<IndexMetadata>,
}

/// Decides per subject between loading the persisted index and rebuilding it
///
/// All disk state for a subject (index directory and metadata record) is
/// only touched while holding that subject's lock.
pub struct IndexCacheManager {
    store: IndexStore,
    builder: IndexBuilder,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IndexCacheManager {
    pub fn new(store: IndexStore, builder: IndexBuilder) -> Self {
        Self {
            store,
            builder,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Cache over `storage.index_root` with the configured embedding backend
    pub fn from_config(config: &Config) -> crate::error::Result<Self> {
        let embedder = provider_from_config(&config.embedding)
            .map_err(|e| TutorError::Config(format!("Embedding provider: {}", e)))?;
        let builder = IndexBuilder::new(
            embedder,
            &config.chunking,
            config.indexing.clone(),
            config.embedding.batch_size,
        )
        .map_err(|e| TutorError::Config(e.to_string()))?;
        let index_root = crate::config::expand_path(&config.storage.index_root)?;
        Ok(Self::new(IndexStore::new(index_root), builder))
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Provider used both to build indexes and to embed queries against them
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        self.builder.embedder()
    }

    fn subject_lock(&self, slug: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(slug.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn metadata_store(&self, slug: &str) -> MetadataStore {
        MetadataStore::new(self.store.metadata_path(slug))
    }

    /// Return a usable index for `subject`, loading it when the persisted
    /// copy still matches the source document and building it otherwise
    pub fn ensure_ready(&self, subject: &Subject, force: bool) -> Result<ReadyIndex, CacheError> {
        let slug = subject.slug();
        let lock = self.subject_lock(&slug);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let metadata_store = self.metadata_store(&slug);

        let reason = if force {
            RebuildReason::Forced
        } else {
            match self.try_load(subject, &slug, &metadata_store) {
                Ok(ready) => return Ok(ready),
                Err(reason) => reason,
            }
        };

        info!("Building index for {}: {}", subject.name, reason);
        let report = self.builder.build_and_persist(subject, &self.store)?;

        let persisted = match report.persisted {
            Ok(()) => {
                let file_hash = fingerprint(&subject.source);
                if let Err(e) =
                    metadata_store.save(file_hash, report.document_count, report.chunk_count)
                {
                    warn!("Index for {} persisted but metadata write failed: {}", subject.name, e);
                }
                true
            }
            Err(e) => {
                warn!(
                    "Serving in-memory index for {}; persist failed: {}",
                    subject.name, e
                );
                false
            }
        };

        let metadata = metadata_store.load().unwrap_or_else(|e| {
            warn!("Could not read metadata for {}: {}", subject.name, e);
            None
        });

        info!(
            "Index for {} ready: {} chunks from {} pages",
            subject.name, report.chunk_count, report.document_count
        );

        Ok(ReadyIndex {
            index: Arc::new(report.index),
            origin: IndexOrigin::Built { reason, persisted },
            metadata,
        })
    }

    fn try_load(
        &self,
        subject: &Subject,
        slug: &str,
        metadata_store: &MetadataStore,
    ) -> Result<ReadyIndex, RebuildReason> {
        if !self.store.exists(slug) {
            return Err(RebuildReason::MissingIndex);
        }

        let metadata = match metadata_store.load() {
            Ok(Some(metadata)) => metadata,
            Ok(None) => return Err(RebuildReason::NoMetadata),
            Err(e) => {
                warn!("Could not read metadata for {}: {}", subject.name, e);
                return Err(RebuildReason::NoMetadata);
            }
        };

        let current = fingerprint(&subject.source);
        if current != metadata.file_hash {
            debug!(
                "Fingerprint for {} changed: {} -> {}",
                subject.name, metadata.file_hash, current
            );
            return Err(RebuildReason::FingerprintMismatch);
        }

        let embedder = self.builder.embedder();
        let index = self
            .store
            .load(
                slug,
                embedder.model_name(),
                embedder.dimension(),
                self.builder.indexing(),
            )
            .map_err(|e| RebuildReason::LoadFailed(e.to_string()))?;

        info!(
            "Loaded index for {} ({} chunks, built {})",
            subject.name,
            index.chunk_count(),
            metadata.last_build.to_rfc3339()
        );

        Ok(ReadyIndex {
            index: Arc::new(index),
            origin: IndexOrigin::Loaded,
            metadata: Some(metadata),
        })
    }

    /// Current metadata record for `subject`
    pub fn metadata(&self, subject: &Subject) -> Result<Option<IndexMetadata>, CacheError> {
        Ok(self.metadata_store(&subject.slug()).load()?)
    }

    pub fn status(&self, subject: &Subject) -> Result<IndexStatus, CacheError> {
        let slug = subject.slug();
        Ok(IndexStatus {
            subject: subject.name.clone(),
            source: subject.source_label(),
            index_on_disk: self.store.exists(&slug),
            metadata: self.metadata_store(&slug).load()?,
        })
    }
}
