use crate::config::{Config, SCHEMA_VERSION};
use crate::curriculum::Subject;
use crate::error::{Result, TutorError, ValidationError};
use std::collections::HashSet;

/// Supported embedding backends
const EMBEDDING_BACKENDS: [&str; 2] = ["fastembed", "hashed"];

/// Supported generation providers (both speak the OpenAI chat API)
const LLM_PROVIDERS: [&str; 2] = ["huggingface", "openai"];

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_chunking(config, &mut errors);
        Self::validate_indexing(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_llm(config, &mut errors);
        Self::validate_subjects(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TutorError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        // Directories are created lazily, so only emptiness is checked here
        if config.storage.index_root.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.index_root",
                "Index root cannot be empty",
            ));
        }

        if config.storage.curriculum_root.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.curriculum_root",
                "Curriculum root cannot be empty",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let backend = &config.embedding.backend;
        if !EMBEDDING_BACKENDS.contains(&backend.as_str()) {
            errors.push(ValidationError::new(
                "embedding.backend",
                format!(
                    "Backend must be one of {:?}, got '{}'",
                    EMBEDDING_BACKENDS, backend
                ),
            ));
        }

        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "Dimension must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }
    }

    fn validate_chunking(config: &Config, errors: &mut Vec<ValidationError>) {
        let chunking = &config.chunking;
        if chunking.chunk_size == 0 {
            errors.push(ValidationError::new(
                "chunking.chunk_size",
                "Chunk size must be greater than 0",
            ));
        }

        if chunking.chunk_overlap >= chunking.chunk_size {
            errors.push(ValidationError::new(
                "chunking.chunk_overlap",
                format!(
                    "Overlap ({}) must be smaller than chunk size ({})",
                    chunking.chunk_overlap, chunking.chunk_size
                ),
            ));
        }
    }

    fn validate_indexing(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.indexing.hnsw_ef_construction == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_ef_construction",
                "HNSW ef_construction must be greater than 0",
            ));
        }

        if config.indexing.hnsw_m == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_m",
                "HNSW M must be greater than 0",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.retrieval.top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.top_k",
                "top_k must be greater than 0",
            ));
        }

        if config.retrieval.ef_search < config.retrieval.top_k {
            errors.push(ValidationError::new(
                "retrieval.ef_search",
                format!(
                    "ef_search ({}) must be at least top_k ({})",
                    config.retrieval.ef_search, config.retrieval.top_k
                ),
            ));
        }
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        // The token itself is checked when a generator is built, so that
        // offline commands like `status` work without one.
        let temp = config.llm.temperature;
        if !(0.0..=2.0).contains(&temp) {
            errors.push(ValidationError::new(
                "llm.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", temp),
            ));
        }

        let provider = &config.llm.provider;
        if !LLM_PROVIDERS.contains(&provider.as_str()) {
            errors.push(ValidationError::new(
                "llm.provider",
                format!(
                    "Provider must be one of {:?}, got '{}'",
                    LLM_PROVIDERS, provider
                ),
            ));
        }

        if config.llm.max_tokens == 0 {
            errors.push(ValidationError::new(
                "llm.max_tokens",
                "max_tokens must be greater than 0",
            ));
        }

        if config.llm.api_key_env.is_empty() {
            errors.push(ValidationError::new(
                "llm.api_key_env",
                "API key variable name cannot be empty",
            ));
        }
    }

    fn validate_subjects(config: &Config, errors: &mut Vec<ValidationError>) {
        let mut seen = HashSet::new();
        for (i, subject) in config.subjects.iter().enumerate() {
            if subject.name.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("subjects[{}].name", i),
                    "Subject name cannot be empty",
                ));
            } else if !seen.insert(Subject::new(subject.name.trim(), &subject.source).slug()) {
                // Names that differ only in case or punctuation share an index key
                errors.push(ValidationError::new(
                    format!("subjects[{}].name", i),
                    format!("Duplicate subject: {}", subject.name),
                ));
            }

            if subject.source.as_os_str().is_empty() {
                errors.push(ValidationError::new(
                    format!("subjects[{}].source", i),
                    "Source path cannot be empty",
                ));
            }
        }

        if config.default_subject.trim().is_empty() {
            errors.push(ValidationError::new(
                "default_subject",
                "Default subject cannot be empty",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_overlap_must_be_below_chunk_size() {
        let mut config = Config::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_invalid_backend() {
        let mut config = Config::default();
        config.embedding.backend = "word2vec".to_string();
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = Config::default();
        config.retrieval.top_k = 0;
        config.llm.temperature = 3.0;
        config.subjects.push(config.subjects[0].clone());

        match ConfigValidator::validate(&config) {
            Err(TutorError::ConfigValidation { errors }) => {
                let paths: Vec<_> = errors.iter().map(|e| e.path.as_str()).collect();
                assert!(paths.contains(&"retrieval.top_k"));
                assert!(paths.contains(&"llm.temperature"));
                assert!(paths.contains(&"subjects[1].name"));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_subjects_sharing_an_index_key() {
        let mut config = Config::default();
        let mut twin = config.subjects[0].clone();
        twin.name = format!("{}!", twin.name.to_uppercase());
        config.subjects.push(twin);

        match ConfigValidator::validate(&config) {
            Err(TutorError::ConfigValidation { errors }) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].path, "subjects[1].name");
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }
}
