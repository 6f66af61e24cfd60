use crate::curriculum::Subject;
use crate::index::{CacheError, CurriculumIndex, IndexCacheManager, IndexOrigin, ReadyIndex};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// Retrieval components for one subject, shared by concurrent requests
#[derive(Debug)]
pub struct SubjectComponents {
    pub subject: Subject,
    pub index: Arc<CurriculumIndex>,
    pub origin: IndexOrigin,
}

/// Subject -> components map with lock-guarded get-or-build
///
/// An entry is either absent or fully initialized. Building happens under
/// the subject's mutex and the map is re-checked after acquiring it, so
/// concurrent first requests trigger a single build.
pub struct ComponentRegistry {
    cache: Arc<IndexCacheManager>,
    ready: RwLock<HashMap<String, Arc<SubjectComponents>>>,
    build_locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ComponentRegistry {
    pub fn new(cache: Arc<IndexCacheManager>) -> Self {
        Self {
            cache,
            ready: RwLock::new(HashMap::new()),
            build_locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &Arc<IndexCacheManager> {
        &self.cache
    }

    fn build_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.build_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn get(&self, subject: &Subject) -> Option<Arc<SubjectComponents>> {
        self.ready.read().await.get(&subject.slug()).cloned()
    }

    pub async fn is_ready(&self, subject: &Subject) -> bool {
        self.ready.read().await.contains_key(&subject.slug())
    }

    /// Cached components, or load/build them once
    pub async fn get_or_load(
        &self,
        subject: &Subject,
    ) -> Result<Arc<SubjectComponents>, CacheError> {
        if let Some(components) = self.get(subject).await {
            return Ok(components);
        }

        let key = subject.slug();
        let lock = self.build_lock(&key);
        let _guard = lock.lock().await;

        if let Some(components) = self.get(subject).await {
            return Ok(components);
        }

        let ready = self.ensure_ready(subject, false).await?;
        Ok(self.install(subject, ready).await)
    }

    /// Force a rebuild and replace the cached entry
    ///
    /// A failed rebuild leaves the previous entry in place.
    pub async fn rebuild(&self, subject: &Subject) -> Result<ReadyIndex, CacheError> {
        let lock = self.build_lock(&subject.slug());
        let _guard = lock.lock().await;

        let ready = self.ensure_ready(subject, true).await?;
        self.install(subject, ready.clone()).await;
        Ok(ready)
    }

    async fn ensure_ready(&self, subject: &Subject, force: bool) -> Result<ReadyIndex, CacheError> {
        let cache = self.cache.clone();
        let owned = subject.clone();
        tokio::task::spawn_blocking(move || cache.ensure_ready(&owned, force))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))?
    }

    async fn install(&self, subject: &Subject, ready: ReadyIndex) -> Arc<SubjectComponents> {
        let components = Arc::new(SubjectComponents {
            subject: subject.clone(),
            index: ready.index,
            origin: ready.origin,
        });
        info!(
            "Components ready for {} ({} chunks)",
            subject.name,
            components.index.chunk_count()
        );
        self.ready
            .write()
            .await
            .insert(subject.slug(), components.clone());
        components
    }
}
