//! Curriculum sources: subjects, their documents, and content fingerprints
//!
//! A subject is either configured explicitly (`[[subjects]]` in the config) or
//! discovered as a folder under the curriculum root holding a source document.

pub mod fingerprint;
pub mod loader;

pub use fingerprint::{empty_fingerprint, fingerprint};
pub use loader::{loader_for, DocumentLoader, LoadError, Page, PdfLoader, PlainTextLoader};

use crate::config::Config;
use crate::error::{Result, TutorError};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// File extensions accepted as subject source documents
pub const SOURCE_EXTENSIONS: [&str; 3] = ["pdf", "txt", "md"];

/// A subject bound to the document its index is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub name: String,
    pub source: PathBuf,
}

impl Subject {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Filesystem-safe key used for the subject's index directory
    pub fn slug(&self) -> String {
        static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
        let re = NON_ALNUM.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));
        let lowered = self.name.to_lowercase();
        let slug = re.replace_all(&lowered, "-");
        let slug = slug.trim_matches('-');
        if slug.is_empty() {
            "subject".to_string()
        } else {
            slug.to_string()
        }
    }

    /// Display name of the source document, used in source attributions
    pub fn source_label(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

/// Normalize a user-supplied subject name: "mathematics " -> "Mathematics"
pub fn capitalize(name: &str) -> String {
    let trimmed = name.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// All subjects known to the service, keyed case-insensitively
#[derive(Debug, Clone)]
pub struct SubjectCatalog {
    subjects: BTreeMap<String, Subject>,
    default_subject: String,
}

impl SubjectCatalog {
    /// Build from explicit subjects; the default subject does not have to be
    /// among them (lookups for it then fail as unknown)
    ///
    /// Earlier subjects win. A later subject whose slug is already taken is
    /// dropped, since it would share the other subject's index.
    pub fn new(subjects: Vec<Subject>, default_subject: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        let mut slugs: HashMap<String, String> = HashMap::new();
        for subject in subjects {
            let key = subject.name.to_lowercase();
            if map.contains_key(&key) {
                continue;
            }
            let slug = subject.slug();
            if let Some(owner) = slugs.get(&slug) {
                tracing::warn!(
                    "Ignoring subject '{}': index key '{}' already belongs to '{}'",
                    subject.name,
                    slug,
                    owner
                );
                continue;
            }
            slugs.insert(slug, subject.name.clone());
            map.insert(key, subject);
        }
        Self {
            subjects: map,
            default_subject: default_subject.into(),
        }
    }

    /// Configured subjects first, then anything discovered under the
    /// curriculum root that is not already configured
    ///
    /// Relative configured sources are resolved against the curriculum root.
    pub fn from_config(config: &Config) -> Result<Self> {
        let root = crate::config::expand_path(&config.storage.curriculum_root)?;

        let mut subjects = Vec::with_capacity(config.subjects.len());
        for s in &config.subjects {
            let source = crate::config::expand_path(&s.source)?;
            let source = if source.is_absolute() {
                source
            } else {
                root.join(source)
            };
            subjects.push(Subject::new(s.name.trim(), source));
        }

        subjects.extend(Self::discover(&root)?);

        let catalog = Self::new(subjects, config.default_subject.trim());
        if catalog.default_subject().is_none() {
            tracing::warn!(
                "Default subject '{}' has no source document configured or discovered",
                catalog.default_subject
            );
        }
        Ok(catalog)
    }

    /// Find subject folders under `root`. Each folder contributes one subject
    /// named after the folder, using its first source document in name order.
    pub fn discover(root: &Path) -> Result<Vec<Subject>> {
        if !root.is_dir() {
            tracing::debug!("Curriculum root {} not present", root.display());
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(root).map_err(|e| TutorError::Io {
            source: e,
            context: format!("Failed to read curriculum root: {}", root.display()),
        })?;

        let mut folders: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect();
        folders.sort();

        let mut subjects = Vec::new();
        for folder in folders {
            let Some(name) = folder.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            match Self::first_source_in(&folder)? {
                Some(source) => subjects.push(Subject::new(capitalize(&name), source)),
                None => tracing::debug!("Skipping {}: no source document", folder.display()),
            }
        }

        Ok(subjects)
    }

    fn first_source_in(folder: &Path) -> Result<Option<PathBuf>> {
        let entries = std::fs::read_dir(folder).map_err(|e| TutorError::Io {
            source: e,
            context: format!("Failed to read subject folder: {}", folder.display()),
        })?;

        let mut sources: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_source_document(path))
            .collect();
        sources.sort();
        Ok(sources.into_iter().next())
    }

    /// Case-insensitive lookup
    pub fn get(&self, name: &str) -> Option<&Subject> {
        self.subjects.get(&name.trim().to_lowercase())
    }

    /// Resolve a requested subject, falling back to the default one
    pub fn resolve(&self, name: Option<&str>) -> Result<&Subject> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.default_subject);
        self.get(name).ok_or_else(|| TutorError::UnknownSubject {
            name: name.to_string(),
        })
    }

    pub fn default_subject(&self) -> Option<&Subject> {
        self.get(&self.default_subject)
    }

    pub fn default_subject_name(&self) -> &str {
        &self.default_subject
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.values()
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

fn is_source_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
