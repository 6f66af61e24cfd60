/// Index cache integration tests
///
/// Exercises the load-or-rebuild decision through the public API, using the
/// on-disk layout a restarted process would see.
use sss_tutor::config::{ChunkingConfig, IndexingConfig};
use sss_tutor::curriculum::{fingerprint, Subject};
use sss_tutor::embedding::{EmbeddingError, EmbeddingProvider, HashedEmbeddingProvider};
use sss_tutor::index::{
    IndexBuilder, IndexCacheManager, IndexOrigin, IndexStore, MetadataStore, RebuildReason,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Hashed provider that counts index-build embedding calls
struct CountingProvider {
    inner: HashedEmbeddingProvider,
    batches: AtomicUsize,
}

impl EmbeddingProvider for CountingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.inner.embed(text)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.inner.embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

fn manager(index_root: &Path) -> (IndexCacheManager, Arc<CountingProvider>) {
    let provider = Arc::new(CountingProvider {
        inner: HashedEmbeddingProvider::new(64),
        batches: AtomicUsize::new(0),
    });
    let builder = IndexBuilder::new(
        provider.clone(),
        &ChunkingConfig {
            chunk_size: 300,
            chunk_overlap: 50,
        },
        IndexingConfig {
            hnsw_m: 16,
            hnsw_ef_construction: 200,
        },
        16,
    )
    .unwrap();
    (
        IndexCacheManager::new(IndexStore::new(index_root.to_path_buf()), builder),
        provider,
    )
}

fn write_syllabus(dir: &Path) -> Subject {
    let path = dir.join("physics-syllabus.md");
    let pages: Vec<String> = (1..=4)
        .map(|unit| {
            format!(
                "Unit {}: motion, forces and energy. Learners describe and measure physical quantities. ",
                unit
            )
            .repeat(5)
        })
        .collect();
    std::fs::write(&path, pages.join("\u{c}")).unwrap();
    Subject::new("Physics", path)
}

#[test]
fn test_first_build_then_cached_load_across_restarts() {
    let temp = TempDir::new().unwrap();
    let subject = write_syllabus(temp.path());
    let index_root = temp.path().join("indexes");

    // First process: nothing on disk, must build
    let (first, first_provider) = manager(&index_root);
    let built = first.ensure_ready(&subject, false).unwrap();
    assert!(matches!(
        built.origin,
        IndexOrigin::Built {
            reason: RebuildReason::MissingIndex,
            persisted: true
        }
    ));
    assert!(first_provider.batches.load(Ordering::SeqCst) > 0);

    let metadata = built.metadata.clone().unwrap();
    assert_eq!(metadata.num_chunks, built.index.chunk_count());
    assert_eq!(metadata.num_documents, 4);
    assert_eq!(metadata.file_hash, fingerprint(&subject.source));

    assert!(index_root.join("physics").join("manifest.json").is_file());
    assert!(index_root.join("physics").join("chunks.json.zst").is_file());
    assert!(index_root.join("physics.metadata.json").is_file());

    // Second process: unchanged source, must load without embedding anything
    let (second, second_provider) = manager(&index_root);
    let loaded = second.ensure_ready(&subject, false).unwrap();
    assert_eq!(loaded.origin, IndexOrigin::Loaded);
    assert_eq!(second_provider.batches.load(Ordering::SeqCst), 0);
    assert_eq!(loaded.index.chunks(), built.index.chunks());
    assert_eq!(loaded.metadata, Some(metadata));
}

#[test]
fn test_loaded_index_answers_queries() {
    let temp = TempDir::new().unwrap();
    let subject = write_syllabus(temp.path());
    let index_root = temp.path().join("indexes");

    let (first, _) = manager(&index_root);
    first.ensure_ready(&subject, false).unwrap();

    let (second, provider) = manager(&index_root);
    let loaded = second.ensure_ready(&subject, false).unwrap();
    let query = provider.embed("motion forces energy").unwrap();
    let results = loaded.index.search(&query, 3, 32).unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn test_edited_source_triggers_rebuild() {
    let temp = TempDir::new().unwrap();
    let subject = write_syllabus(temp.path());
    let (manager, _) = manager(&temp.path().join("indexes"));

    let before = manager.ensure_ready(&subject, false).unwrap().metadata.unwrap();

    let mut bytes = std::fs::read(&subject.source).unwrap();
    bytes[0] = b'X';
    std::fs::write(&subject.source, bytes).unwrap();

    let after = manager.ensure_ready(&subject, false).unwrap();
    assert!(matches!(
        after.origin,
        IndexOrigin::Built {
            reason: RebuildReason::FingerprintMismatch,
            ..
        }
    ));
    let metadata = after.metadata.unwrap();
    assert_ne!(metadata.file_hash, before.file_hash);
    assert_eq!(metadata.file_hash, fingerprint(&subject.source));
}

#[test]
fn test_deleted_metadata_triggers_rebuild() {
    let temp = TempDir::new().unwrap();
    let subject = write_syllabus(temp.path());
    let index_root = temp.path().join("indexes");
    let (manager, _) = manager(&index_root);

    manager.ensure_ready(&subject, false).unwrap();
    std::fs::remove_file(index_root.join("physics.metadata.json")).unwrap();

    let ready = manager.ensure_ready(&subject, false).unwrap();
    assert!(matches!(
        ready.origin,
        IndexOrigin::Built {
            reason: RebuildReason::NoMetadata,
            ..
        }
    ));
    assert!(ready.metadata.is_some());
}

#[test]
fn test_persist_failure_does_not_write_metadata() {
    let temp = TempDir::new().unwrap();
    let subject = write_syllabus(temp.path());
    let index_root = temp.path().join("indexes");
    std::fs::create_dir_all(&index_root).unwrap();

    // A regular file in place of the staging directory blocks the persist
    std::fs::write(index_root.join("physics.staging"), b"blocked").unwrap();

    let (manager, _) = manager(&index_root);
    let ready = manager.ensure_ready(&subject, false).unwrap();

    assert!(matches!(
        ready.origin,
        IndexOrigin::Built {
            persisted: false,
            ..
        }
    ));
    assert!(ready.index.chunk_count() > 0);
    assert!(ready.metadata.is_none());
    let record = MetadataStore::new(index_root.join("physics.metadata.json"));
    assert!(record.load().unwrap().is_none());
    assert!(!index_root.join("physics").exists());
}

#[test]
#[ignore] // Requires model download (~130MB) - run with: cargo test -- --ignored
fn test_fastembed_build_and_reload() {
    use sss_tutor::embedding::FastEmbedProvider;

    let temp = TempDir::new().unwrap();
    let subject = write_syllabus(temp.path());
    let index_root = temp.path().join("indexes");

    let build = |root: &Path| {
        let provider = Arc::new(FastEmbedProvider::with_default_model().unwrap());
        let builder = IndexBuilder::new(
            provider,
            &ChunkingConfig {
                chunk_size: 1000,
                chunk_overlap: 200,
            },
            IndexingConfig {
                hnsw_m: 16,
                hnsw_ef_construction: 200,
            },
            32,
        )
        .unwrap();
        IndexCacheManager::new(IndexStore::new(root.to_path_buf()), builder)
    };

    let built = build(&index_root).ensure_ready(&subject, false).unwrap();
    assert_eq!(built.index.dimension(), 384);

    let loaded = build(&index_root).ensure_ready(&subject, false).unwrap();
    assert_eq!(loaded.origin, IndexOrigin::Loaded);
}
