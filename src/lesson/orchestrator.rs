use super::prompt::{build_context, build_prompt, retrieval_query};
use super::{ComponentRegistry, GenerationProvider, LessonError, LessonResult, Pace, SssLevel};
use crate::curriculum::SubjectCatalog;
use crate::embedding::EmbeddingProvider;
use crate::error::TutorError;
use crate::index::RetrievalResult;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Retrieval-augmented lesson generation over the subject registry
pub struct LessonOrchestrator {
    catalog: Arc<SubjectCatalog>,
    registry: Arc<ComponentRegistry>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    top_k: usize,
    ef_search: usize,
}

impl LessonOrchestrator {
    pub fn new(
        catalog: Arc<SubjectCatalog>,
        registry: Arc<ComponentRegistry>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        top_k: usize,
        ef_search: usize,
    ) -> Self {
        Self {
            catalog,
            registry,
            embedder,
            generator,
            top_k,
            ef_search,
        }
    }

    /// Generate lesson notes on `topic` for the requested (or default) subject
    pub async fn generate(
        &self,
        subject: Option<&str>,
        topic: &str,
        level: SssLevel,
        pace: Pace,
    ) -> Result<LessonResult, LessonError> {
        let subject = self
            .catalog
            .resolve(subject)
            .map_err(|e| match e {
                TutorError::UnknownSubject { name } => LessonError::UnknownSubject(name),
                other => LessonError::UnknownSubject(other.to_string()),
            })?
            .clone();
        let topic = topic.trim();
        let started = Instant::now();

        let components = self.registry.get_or_load(&subject).await.map_err(|e| {
            warn!("No index available for {}: {}", subject.name, e);
            LessonError::ComponentsNotReady(e.to_string())
        })?;

        let query = retrieval_query(&subject.name, topic, level);
        debug!("Retrieval query: {}", query);

        let embedder = self.embedder.clone();
        let index = components.index.clone();
        let (top_k, ef_search) = (self.top_k, self.ef_search);
        let sources: Vec<RetrievalResult> = tokio::task::spawn_blocking(move || {
            let vector = embedder
                .embed(&query)
                .map_err(|e| LessonError::Retrieval(e.to_string()))?;
            index
                .search(&vector, top_k, ef_search)
                .map_err(|e| LessonError::Retrieval(e.to_string()))
        })
        .await
        .map_err(|e| LessonError::Retrieval(e.to_string()))??;

        let prompt = build_prompt(&subject.name, topic, level, pace, &build_context(&sources));
        let lesson_notes = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| LessonError::GenerationFailure(e.to_string()))?;
        if lesson_notes.trim().is_empty() {
            return Err(LessonError::GenerationFailure(
                "provider returned empty lesson notes".to_string(),
            ));
        }

        info!(
            "Generated {} lesson on '{}' ({}, {}) from {} chunks in {}ms",
            subject.name,
            topic,
            level,
            pace,
            sources.len(),
            started.elapsed().as_millis()
        );

        Ok(LessonResult {
            subject: subject.name,
            topic: topic.to_string(),
            level,
            pace,
            lesson_notes,
            sources,
        })
    }

    pub fn catalog(&self) -> &Arc<SubjectCatalog> {
        &self.catalog
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChunkingConfig, IndexingConfig};
    use crate::curriculum::Subject;
    use crate::embedding::HashedEmbeddingProvider;
    use crate::index::{IndexBuilder, IndexCacheManager, IndexStore};
    use crate::lesson::GenerationError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records prompts and replies with a fixed text
    struct ScriptedGenerator {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl GenerationProvider for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn orchestrator(temp: &TempDir, reply: &str) -> (LessonOrchestrator, Arc<ScriptedGenerator>) {
        let source = temp.path().join("mathematics.txt");
        std::fs::write(
            &source,
            "Quadratic equations: solving by factorization and completing the square.\u{c}\
             Vectors in three dimensions and the dot product.\u{c}\
             Integers and rational numbers on the number line.",
        )
        .unwrap();

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashedEmbeddingProvider::new(256));
        let builder = IndexBuilder::new(
            embedder.clone(),
            &ChunkingConfig {
                chunk_size: 200,
                chunk_overlap: 20,
            },
            IndexingConfig {
                hnsw_m: 16,
                hnsw_ef_construction: 200,
            },
            8,
        )
        .unwrap();
        let cache = IndexCacheManager::new(IndexStore::new(temp.path().join("indexes")), builder);
        let catalog = SubjectCatalog::new(vec![Subject::new("Mathematics", source)], "Mathematics");
        let generator = Arc::new(ScriptedGenerator {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        });

        (
            LessonOrchestrator::new(
                Arc::new(catalog),
                Arc::new(ComponentRegistry::new(Arc::new(cache))),
                embedder,
                generator.clone(),
                2,
                16,
            ),
            generator,
        )
    }

    #[tokio::test]
    async fn test_generate_lesson() {
        let temp = TempDir::new().unwrap();
        let (orchestrator, generator) = orchestrator(&temp, "## Introduction\nLesson body");

        let lesson = orchestrator
            .generate(None, " Quadratic Equations ", SssLevel::Sss2, Pace::Moderate)
            .await
            .unwrap();

        assert_eq!(lesson.subject, "Mathematics");
        assert_eq!(lesson.topic, "Quadratic Equations");
        assert_eq!(lesson.lesson_notes, "## Introduction\nLesson body");
        assert_eq!(lesson.sources.len(), 2);
        assert!(lesson.sources[0].chunk.text.contains("Quadratic"));

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("- **SSS Level:** SSS 2"));
        assert!(prompts[0].contains(Pace::Moderate.instructions()));
    }

    #[tokio::test]
    async fn test_unknown_subject() {
        let temp = TempDir::new().unwrap();
        let (orchestrator, _) = orchestrator(&temp, "notes");

        let result = orchestrator
            .generate(Some("Latin"), "Declensions", SssLevel::Sss1, Pace::Low)
            .await;
        assert!(matches!(result, Err(LessonError::UnknownSubject(name)) if name == "Latin"));
    }

    #[tokio::test]
    async fn test_empty_completion_is_failure() {
        let temp = TempDir::new().unwrap();
        let (orchestrator, _) = orchestrator(&temp, "   ");

        let result = orchestrator
            .generate(None, "Vectors", SssLevel::Sss3, Pace::Advance)
            .await;
        assert!(matches!(result, Err(LessonError::GenerationFailure(_))));
    }

    #[tokio::test]
    async fn test_missing_source_is_not_ready() {
        let temp = TempDir::new().unwrap();
        let (orchestrator, generator) = orchestrator(&temp, "notes");
        std::fs::remove_file(temp.path().join("mathematics.txt")).unwrap();

        let result = orchestrator
            .generate(None, "Vectors", SssLevel::Sss3, Pace::Advance)
            .await;
        assert!(matches!(result, Err(LessonError::ComponentsNotReady(_))));
        assert!(generator.prompts.lock().unwrap().is_empty());
    }
}
