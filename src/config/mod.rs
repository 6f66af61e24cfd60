//! Configuration management for the tutor service
//!
//! Configuration is a single TOML file. Every section has defaults so a
//! missing file still yields a runnable setup for the bundled mathematics
//! syllabus; `SSS_TUTOR_*` environment variables override common keys.

use crate::error::{Result, TutorError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Current configuration schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Prefix for environment variable overrides
const ENV_PREFIX: &str = "SSS_TUTOR_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub chunking: ChunkingConfig,
    pub indexing: IndexingConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
    /// Subjects with an explicitly configured source document
    #[serde(default)]
    pub subjects: Vec<SubjectConfig>,
    /// Subject used when a request does not name one
    pub default_subject: String,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root holding one folder per discovered subject
    pub curriculum_root: PathBuf,
    /// Root holding the per-subject index directories and metadata records
    pub index_root: PathBuf,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub backend: String, // "fastembed" or "hashed"
    pub model: String,
    /// Only used by the hashed backend; FastEmbed models fix their own
    pub dimension: usize,
    pub batch_size: usize,
}

/// Text chunking configuration (sizes in characters)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

/// HNSW build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    pub hnsw_m: usize,
    pub hnsw_ef_construction: usize,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub ef_search: usize,
}

/// Generation provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    /// Overrides the provider's public endpoint when set
    #[serde(default)]
    pub base_url: String,
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    /// Chat-completions endpoint: `base_url` if set, else the provider's
    pub fn api_base(&self) -> &str {
        let base_url = self.base_url.trim();
        if !base_url.is_empty() {
            return base_url;
        }
        match self.provider.as_str() {
            "openai" => "https://api.openai.com/v1",
            _ => "https://router.huggingface.co/v1",
        }
    }
}

/// A subject bound to its source document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubjectConfig {
    pub name: String,
    pub source: PathBuf,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TutorError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| TutorError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Load from `path` (or the default location), falling back to defaults
    /// when no file exists there
    pub fn load_or_default(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };

        if path.exists() {
            return Self::load(&path);
        }

        tracing::warn!(
            "Config file not found at {}, using defaults. Run 'sss-tutor config init' to create one.",
            path.display()
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| TutorError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: SSS_TUTOR_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "SERVER__HOST" => {
                self.server.host = value.to_string();
            }
            "SERVER__PORT" => {
                self.server.port = value.parse().map_err(|_| TutorError::InvalidConfigValue {
                    path: path.to_string(),
                    message: format!("Cannot parse '{}' as port number", value),
                })?;
            }
            "STORAGE__CURRICULUM_ROOT" => {
                self.storage.curriculum_root = PathBuf::from(value);
            }
            "STORAGE__INDEX_ROOT" => {
                self.storage.index_root = PathBuf::from(value);
            }
            "EMBEDDING__BACKEND" => {
                self.embedding.backend = value.to_string();
            }
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            "LLM__PROVIDER" => {
                self.llm.provider = value.to_string();
            }
            "LLM__MODEL" => {
                self.llm.model = value.to_string();
            }
            "LLM__BASE_URL" => {
                self.llm.base_url = value.to_string();
            }
            "DEFAULT_SUBJECT" => {
                self.default_subject = value.to_string();
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| TutorError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("sss-tutor").join("config.toml"))
    }

    /// Read the generation provider token from the configured env var
    pub fn llm_api_key(&self) -> Result<String> {
        match std::env::var(&self.llm.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(TutorError::Config(format!(
                "{} is not set. Export a token for the generation provider.",
                self.llm.api_key_env
            ))),
        }
    }
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| TutorError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| TutorError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            storage: StorageConfig {
                curriculum_root: PathBuf::from("curriculum"),
                index_root: PathBuf::from("indexes"),
            },
            embedding: EmbeddingConfig {
                backend: "fastembed".to_string(),
                model: "bge-small-en-v1.5".to_string(),
                dimension: 384,
                batch_size: 32,
            },
            chunking: ChunkingConfig {
                chunk_size: 1000,
                chunk_overlap: 200,
            },
            indexing: IndexingConfig {
                hnsw_m: 16,
                hnsw_ef_construction: 200,
            },
            retrieval: RetrievalConfig {
                top_k: 3,
                ef_search: 64,
            },
            llm: LlmConfig {
                provider: "huggingface".to_string(),
                base_url: String::new(),
                api_key_env: "HUGGINGFACEHUB_API_TOKEN".to_string(),
                model: "mistralai/Mixtral-8x7B-Instruct-v0.1".to_string(),
                temperature: 0.3,
                max_tokens: 800,
            },
            subjects: vec![SubjectConfig {
                name: "Mathematics".to_string(),
                source: PathBuf::from("SSS-Syllabus-Mathematics-for-STEAMM.pdf"),
            }],
            default_subject: "Mathematics".to_string(),
        }
    }
}
