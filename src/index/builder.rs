/// Index builder: source document -> pages -> chunks -> embeddings -> index
use super::store::{IndexStore, StoreError};
use super::{Chunker, CurriculumIndex};
use crate::config::{ChunkingConfig, IndexingConfig};
use crate::curriculum::{loader_for, LoadError, Subject};
use crate::embedding::{BatchEmbedder, EmbeddingError, EmbeddingProvider};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Source document unavailable: {0}")]
    SourceUnavailable(PathBuf),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Embedding failed: {0}")]
    EmbeddingFailure(#[from] EmbeddingError),

    #[error("Index assembly failed: {0}")]
    Index(String),

    #[error("Persisting index failed: {0}")]
    PersistFailure(#[from] StoreError),
}

impl From<LoadError> for BuildError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::NotFound(path) => Self::SourceUnavailable(path),
            other => Self::Extraction(other.to_string()),
        }
    }
}

/// An index assembled in memory
#[derive(Debug)]
pub struct BuiltIndex {
    pub index: CurriculumIndex,
    /// Pages loaded from the source
    pub document_count: usize,
    pub chunk_count: usize,
}

/// Outcome of build-and-persist
///
/// `persisted` is the only stage whose failure still leaves a usable index.
#[derive(Debug)]
pub struct BuildReport {
    pub index: CurriculumIndex,
    pub document_count: usize,
    pub chunk_count: usize,
    pub persisted: Result<(), BuildError>,
}

/// Builds per-subject indexes with a shared embedding provider
pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: Chunker,
    batch_size: usize,
    indexing: IndexingConfig,
}

impl IndexBuilder {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        chunking: &ChunkingConfig,
        indexing: IndexingConfig,
        batch_size: usize,
    ) -> Result<Self, BuildError> {
        let chunker = Chunker::new(chunking)
            .map_err(|e| BuildError::Extraction(format!("Invalid chunking settings: {}", e)))?;
        Ok(Self {
            embedder,
            chunker,
            batch_size,
            indexing,
        })
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn indexing(&self) -> &IndexingConfig {
        &self.indexing
    }

    /// Build the in-memory index; each stage's failure is terminal
    pub fn build(&self, subject: &Subject) -> Result<BuiltIndex, BuildError> {
        let source = &subject.source;
        if !source.is_file() {
            return Err(BuildError::SourceUnavailable(source.clone()));
        }

        // Stage 1: extract
        let loader = loader_for(source)?;
        let pages = loader.load(source)?;
        info!("Loaded {} pages from {}", pages.len(), source.display());

        // Stage 2: chunk
        let chunks = self.chunker.split(&subject.source_label(), &pages);
        if chunks.is_empty() {
            return Err(BuildError::Extraction(format!(
                "No extractable text in {}",
                source.display()
            )));
        }
        info!("Split into {} chunks", chunks.len());

        // Stage 3: embed
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = BatchEmbedder::new(self.embedder.clone(), self.batch_size)
            .embed_all(&texts)?;

        // Stage 4: assemble
        let chunk_count = chunks.len();
        let index = CurriculumIndex::assemble(
            chunks,
            embeddings,
            self.embedder.model_name(),
            self.embedder.dimension(),
            &self.indexing,
        )
        .map_err(|e| BuildError::Index(e.to_string()))?;

        Ok(BuiltIndex {
            index,
            document_count: pages.len(),
            chunk_count,
        })
    }

    /// Build, then persist to the subject's directory in `store`
    pub fn build_and_persist(
        &self,
        subject: &Subject,
        store: &IndexStore,
    ) -> Result<BuildReport, BuildError> {
        let built = self.build(subject)?;

        // Stage 5: persist
        let persisted = store
            .persist(&subject.slug(), &built.index)
            .map_err(BuildError::from);

        Ok(BuildReport {
            index: built.index,
            document_count: built.document_count,
            chunk_count: built.chunk_count,
            persisted,
        })
    }
}
