/// Source document loaders: text extraction with page structure
use lopdf::Document;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Source document not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported source format: {0}")]
    Unsupported(String),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One page of extracted text
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 0-based page number, when the format has pages
    pub number: Option<u32>,
    pub text: String,
}

/// Trait for document loaders
///
/// Implementations return every page in reading order, including pages
/// without extractable text (their `text` is empty).
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Vec<Page>, LoadError>;
}

/// PDF loader backed by lopdf's text layer
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> Result<Vec<Page>, LoadError> {
        ensure_exists(path)?;

        let document = Document::load(path).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut pages = Vec::new();
        // get_pages is keyed by 1-based page number in document order
        for page_number in document.get_pages().keys().copied() {
            let text = match document.extract_text(&[page_number]) {
                Ok(raw) => normalize_text(&raw),
                Err(e) => {
                    tracing::warn!(
                        "No text extracted from page {} of {}: {}",
                        page_number,
                        path.display(),
                        e
                    );
                    String::new()
                }
            };
            pages.push(Page {
                number: Some(page_number.saturating_sub(1)),
                text,
            });
        }

        Ok(pages)
    }
}

/// Plain text / markdown loader; form feeds separate pages
pub struct PlainTextLoader;

impl DocumentLoader for PlainTextLoader {
    fn load(&self, path: &Path) -> Result<Vec<Page>, LoadError> {
        ensure_exists(path)?;

        let content = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        // A trailing form feed ends the last page rather than starting one
        let content = content.strip_suffix('\u{c}').unwrap_or(&content);
        let pages = content
            .split('\u{c}')
            .enumerate()
            .map(|(i, raw)| Page {
                number: Some(i as u32),
                text: normalize_text(raw),
            })
            .collect();

        Ok(pages)
    }
}

/// Pick a loader by file extension
pub fn loader_for(path: &Path) -> Result<Box<dyn DocumentLoader>, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => Ok(Box::new(PdfLoader)),
        "txt" | "md" => Ok(Box::new(PlainTextLoader)),
        other => Err(LoadError::Unsupported(if other.is_empty() {
            path.display().to_string()
        } else {
            format!(".{}", other)
        })),
    }
}

fn ensure_exists(path: &Path) -> Result<(), LoadError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(LoadError::NotFound(path.to_path_buf()))
    }
}

/// Collapse horizontal whitespace runs and excess blank lines
fn normalize_text(raw: &str) -> String {
    static SPACES: OnceLock<Regex> = OnceLock::new();
    static BLANK_LINES: OnceLock<Regex> = OnceLock::new();
    let spaces = SPACES.get_or_init(|| Regex::new(r"[ \t\u{a0}]+").expect("static regex"));
    let blank_lines = BLANK_LINES.get_or_init(|| Regex::new(r"\n\s*\n(\s*\n)+").expect("static regex"));

    let collapsed = spaces.replace_all(raw, " ");
    let trimmed_lines: Vec<&str> = collapsed.lines().map(str::trim).collect();
    let joined = trimmed_lines.join("\n");
    blank_lines.replace_all(&joined, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_plain_text_pages() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("syllabus.txt");
        std::fs::write(
            &path,
            "Unit 1: Number bases\u{c}\u{c}Unit 2:   Quadratic   equations\n\n\n\nFactorization\u{c}",
        )
        .unwrap();

        let pages = PlainTextLoader.load(&path).unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].number, Some(0));
        assert!(pages[1].text.is_empty());
        assert_eq!(pages[2].number, Some(2));
        assert_eq!(
            pages[2].text,
            "Unit 2: Quadratic equations\n\nFactorization"
        );
    }

    #[test]
    fn test_missing_source() {
        let temp = TempDir::new().unwrap();
        let result = PlainTextLoader.load(&temp.path().join("absent.txt"));
        assert!(matches!(result, Err(LoadError::NotFound(_))));

        let result = PdfLoader.load(&temp.path().join("absent.pdf"));
        assert!(matches!(result, Err(LoadError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_pdf_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();

        let result = PdfLoader.load(&path);
        assert!(matches!(result, Err(LoadError::Parse { .. })));
    }

    #[test]
    fn test_loader_for_extension() {
        assert!(loader_for(Path::new("a.PDF")).is_ok());
        assert!(loader_for(Path::new("a.md")).is_ok());
        assert!(matches!(
            loader_for(Path::new("a.docx")),
            Err(LoadError::Unsupported(ext)) if ext == ".docx"
        ));
    }
}
