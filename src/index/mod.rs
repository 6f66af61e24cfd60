//! Per-subject curriculum index
//!
//! `IndexBuilder` turns a source document into a `CurriculumIndex`,
//! `IndexStore` persists it, `MetadataStore` records what it was built from,
//! and `IndexCacheManager` decides between loading and rebuilding.

mod builder;
mod cache;
mod chunker;
mod metadata;
mod store;

pub use builder::{BuildError, BuildReport, BuiltIndex, IndexBuilder};
pub use cache::{CacheError, IndexCacheManager, IndexOrigin, IndexStatus, ReadyIndex, RebuildReason};
pub use chunker::Chunker;
pub use metadata::{IndexMetadata, MetadataStore};
pub use store::{IndexManifest, IndexStore, StoreError, FORMAT_VERSION};

use crate::config::IndexingConfig;
use crate::embedding::{VectorIndex, VectorIndexError};
use serde::{Deserialize, Serialize};

/// A contiguous span of source text, the unit of retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position of the chunk in its index
    pub id: u64,
    pub text: String,
    /// Label of the source document
    pub source: String,
    /// 0-based page the chunk was taken from, when known
    pub page: Option<u32>,
    /// Byte offset of the chunk within its page text
    pub offset: usize,
}

impl Chunk {
    /// First `max_chars` characters followed by an ellipsis
    pub fn preview(&self, max_chars: usize) -> String {
        let head: String = self.text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

/// A chunk with its similarity to the query
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    pub score: f32,
}

/// Searchable index over a subject's chunks
///
/// Immutable once assembled; shared behind `Arc`.
pub struct CurriculumIndex {
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f32>>,
    vectors: VectorIndex,
    model: String,
}

impl CurriculumIndex {
    /// Assemble the HNSW graph over `chunks` and their `embeddings`
    pub fn assemble(
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
        model: impl Into<String>,
        dimension: usize,
        config: &IndexingConfig,
    ) -> Result<Self, VectorIndexError> {
        if chunks.len() != embeddings.len() {
            return Err(VectorIndexError::InvalidParameter(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        let vectors = VectorIndex::new(
            dimension,
            config.hnsw_m,
            config.hnsw_ef_construction,
            chunks.len(),
        )?;
        for (position, embedding) in embeddings.iter().enumerate() {
            vectors.insert(position as u64, embedding)?;
        }

        Ok(Self {
            chunks,
            embeddings,
            vectors,
            model: model.into(),
        })
    }

    /// Top-`k` chunks nearest to `query`, best first
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<RetrievalResult>, VectorIndexError> {
        let hits = self.vectors.search(query, k, ef_search)?;
        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                self.chunks.get(hit.id as usize).map(|chunk| RetrievalResult {
                    chunk: chunk.clone(),
                    score: hit.score,
                })
            })
            .collect())
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn dimension(&self) -> usize {
        self.vectors.dimension()
    }

    /// Embedding model the vectors were produced with
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for CurriculumIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurriculumIndex")
            .field("chunks", &self.chunks.len())
            .field("model", &self.model)
            .field("dimension", &self.vectors.dimension())
            .finish()
    }
}
