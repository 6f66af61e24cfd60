mod batch;
/// Embedding & vector indexing
///
/// Architecture:
/// - EmbeddingProvider trait for abstraction
/// - FastEmbedProvider for local embedding (bge-small-en-v1.5, 384-dim)
/// - HashedEmbeddingProvider for offline runs and tests
/// - HNSW for vector similarity search
/// - Batch processing for index builds
mod provider;
mod vector_index;

pub use batch::BatchEmbedder;
pub use provider::{
    EmbeddingError, EmbeddingProvider, FastEmbedProvider, HashedEmbeddingProvider,
};
pub use vector_index::{SearchResult, VectorIndex, VectorIndexError};

use crate::config::EmbeddingConfig;
use std::sync::Arc;

/// Build the provider selected by `embedding.backend`
pub fn provider_from_config(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    match config.backend.as_str() {
        "fastembed" => Ok(Arc::new(FastEmbedProvider::new(&config.model)?)),
        "hashed" => Ok(Arc::new(HashedEmbeddingProvider::new(config.dimension))),
        other => Err(EmbeddingError::InitializationError(format!(
            "Unknown embedding backend '{}'. Expected 'fastembed' or 'hashed'.",
            other
        ))),
    }
}
