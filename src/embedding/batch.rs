/// Batched embedding generation
use super::{EmbeddingError, EmbeddingProvider};
use std::sync::Arc;
use tracing::{debug, info};

/// Embeds large inputs in fixed-size batches
///
/// Any batch failure aborts the whole run: a partial set of embeddings is
/// never returned.
pub struct BatchEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl BatchEmbedder {
    /// Create a new batch embedder
    ///
    /// # Arguments
    /// * `provider` - Embedding provider
    /// * `batch_size` - Number of texts to embed in one provider call
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
        }
    }

    /// Embed every text, preserving order
    pub fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let start = std::time::Instant::now();
        let total = texts.len();

        info!(
            "Embedding {} texts with {} (batch size {})",
            total,
            self.provider.model_name(),
            self.batch_size
        );

        let mut embeddings = Vec::with_capacity(total);
        let mut batches = 0;

        for chunk in texts.chunks(self.batch_size) {
            let batch = self.provider.embed_batch(chunk)?;

            if batch.len() != chunk.len() {
                return Err(EmbeddingError::GenerationError(format!(
                    "Embedding count mismatch: expected {}, got {}",
                    chunk.len(),
                    batch.len()
                )));
            }

            embeddings.extend(batch);
            batches += 1;
            debug!("Embedded batch {} ({}/{})", batches, embeddings.len(), total);
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Embedding complete: {} vectors in {} batches, {}ms",
            embeddings.len(),
            batches,
            duration_ms
        );

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashedEmbeddingProvider;
    use std::sync::Mutex;

    /// Provider that drops the last embedding of every batch
    struct ShortProvider;

    impl EmbeddingProvider for ShortProvider {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0])
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(vec![vec![1.0]; texts.len().saturating_sub(1)])
        }

        fn dimension(&self) -> usize {
            1
        }

        fn model_name(&self) -> &str {
            "short"
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("chunk number {}", i)).collect()
    }

    /// Hashed provider that records the size of each batch it receives
    struct RecordingProvider {
        inner: HashedEmbeddingProvider,
        sizes: Mutex<Vec<usize>>,
    }

    impl EmbeddingProvider for RecordingProvider {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.inner.embed(text)
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.sizes.lock().unwrap().push(texts.len());
            self.inner.embed_batch(texts)
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn model_name(&self) -> &str {
            self.inner.model_name()
        }
    }

    #[test]
    fn test_batches_cover_all_inputs() {
        let provider = Arc::new(RecordingProvider {
            inner: HashedEmbeddingProvider::new(32),
            sizes: Mutex::new(Vec::new()),
        });
        let embedder = BatchEmbedder::new(provider.clone(), 4);
        let embeddings = embedder.embed_all(&texts(10)).unwrap();

        assert_eq!(embeddings.len(), 10);
        assert_eq!(*provider.sizes.lock().unwrap(), vec![4, 4, 2]);
        assert_eq!(embeddings[9], provider.inner.embed("chunk number 9").unwrap());
    }

    #[test]
    fn test_empty_input() {
        let embedder = BatchEmbedder::new(Arc::new(HashedEmbeddingProvider::new(32)), 4);
        assert!(embedder.embed_all(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_count_mismatch_is_failure() {
        let embedder = BatchEmbedder::new(Arc::new(ShortProvider), 8);
        let result = embedder.embed_all(&texts(3));
        assert!(matches!(result, Err(EmbeddingError::GenerationError(_))));
    }
}
