/// HNSW vector index for similarity search
use hnsw_rs::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Upper bound on HNSW layers (hnsw_rs caps at 16)
const MAX_LAYERS: usize = 16;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Search result with ID and similarity score
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// ID of the item (the chunk id)
    pub id: u64,
    /// Cosine similarity score (higher is more similar)
    pub score: f32,
}

/// In-memory HNSW index over cosine distance
///
/// The graph itself is never persisted: callers keep the vectors and rebuild
/// the graph on load, which is cheap at curriculum scale.
pub struct VectorIndex {
    index: Hnsw<'static, f32, DistCosine>,
    dimension: usize,
    count: AtomicUsize,
}

impl VectorIndex {
    /// Create a new vector index
    ///
    /// # Arguments
    /// * `dimension` - Vector dimension (must match embedding dimension)
    /// * `m` - HNSW M parameter (number of connections per layer)
    /// * `ef_construction` - HNSW construction parameter (higher = better recall, slower build)
    /// * `capacity` - Expected number of vectors
    pub fn new(
        dimension: usize,
        m: usize,
        ef_construction: usize,
        capacity: usize,
    ) -> Result<Self, VectorIndexError> {
        if dimension == 0 || m == 0 || ef_construction == 0 {
            return Err(VectorIndexError::InvalidParameter(format!(
                "dimension={}, m={}, ef_construction={} must all be > 0",
                dimension, m, ef_construction
            )));
        }

        let index = Hnsw::<f32, DistCosine>::new(
            m,
            capacity.max(1),
            MAX_LAYERS,
            ef_construction,
            DistCosine,
        );

        Ok(Self {
            index,
            dimension,
            count: AtomicUsize::new(0),
        })
    }

    /// Insert a vector into the index
    ///
    /// # Arguments
    /// * `id` - Unique ID for the vector (the chunk id)
    /// * `vector` - Embedding vector
    pub fn insert(&self, id: u64, vector: &[f32]) -> Result<(), VectorIndexError> {
        self.check_dimension(vector)?;

        self.index.insert((vector, id as usize));
        self.count.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }

    /// Search for k nearest neighbors
    ///
    /// # Arguments
    /// * `query` - Query vector
    /// * `k` - Number of results to return
    /// * `ef_search` - HNSW search parameter (higher = better recall, slower search)
    ///
    /// # Returns
    /// Results sorted by score descending
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<SearchResult>, VectorIndexError> {
        self.check_dimension(query)?;

        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut results: Vec<SearchResult> = self
            .index
            .search(query, k, ef_search.max(k))
            .into_iter()
            .map(|neighbour| SearchResult {
                id: neighbour.d_id as u64,
                score: 1.0 - neighbour.distance,
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(k);

        Ok(results)
    }

    /// Get the number of vectors in the index
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get vector dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}
