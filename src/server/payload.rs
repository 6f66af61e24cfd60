use crate::index::{IndexStatus, RetrievalResult};
use crate::lesson::{LessonResult, Pace, SssLevel};
use serde::{Deserialize, Serialize};

/// Characters of chunk text shown in a source attribution
pub const PREVIEW_CHARS: usize = 150;

/// Label used when a chunk carries no source name
pub const FALLBACK_SOURCE: &str = "Curriculum Syllabus";

#[derive(Debug, Deserialize)]
pub struct SubjectQuery {
    pub subject: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LessonRequest {
    pub topic: String,
    pub sss_level: SssLevel,
    pub learning_pace: Pace,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SourceDocument {
    pub source: String,
    /// 1-based page number
    pub page: Option<u32>,
    pub content_preview: String,
}

impl From<&RetrievalResult> for SourceDocument {
    fn from(result: &RetrievalResult) -> Self {
        let chunk = &result.chunk;
        let source = if chunk.source.is_empty() {
            FALLBACK_SOURCE.to_string()
        } else {
            chunk.source.clone()
        };
        Self {
            source,
            page: chunk.page.map(|page| page + 1),
            content_preview: chunk.preview(PREVIEW_CHARS),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LessonResponse {
    pub subject: String,
    pub topic: String,
    pub sss_level: SssLevel,
    pub learning_pace: Pace,
    pub lesson_notes: String,
    pub sources: Vec<SourceDocument>,
    pub status: &'static str,
}

impl From<LessonResult> for LessonResponse {
    fn from(lesson: LessonResult) -> Self {
        Self {
            sources: lesson.sources.iter().map(SourceDocument::from).collect(),
            subject: lesson.subject,
            topic: lesson.topic,
            sss_level: lesson.level,
            learning_pace: lesson.pace,
            lesson_notes: lesson.lesson_notes,
            status: "success",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// "ready" once the subject's components are loaded
    pub status: &'static str,
    pub subject: String,
    pub last_build: Option<String>,
    pub num_chunks: Option<usize>,
    pub source_file: String,
}

impl StatusResponse {
    pub fn new(status: IndexStatus, ready: bool) -> Self {
        Self {
            status: if ready { "ready" } else { "error" },
            subject: status.subject,
            last_build: status.metadata.as_ref().map(|m| m.last_build.to_rfc3339()),
            num_chunks: status.metadata.as_ref().map(|m| m.num_chunks),
            source_file: status.source,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    pub message: String,
    pub status: &'static str,
    pub metadata: StatusResponse,
}

#[derive(Debug, Serialize)]
pub struct SubjectSummary {
    pub name: String,
    pub source_file: String,
    pub ready: bool,
}

#[derive(Debug, Serialize)]
pub struct SubjectsResponse {
    pub subjects: Vec<SubjectSummary>,
    pub default_subject: String,
}

#[derive(Debug, Serialize)]
pub struct ExampleRequest {
    pub topic: &'static str,
    pub sss_level: SssLevel,
    pub learning_pace: Pace,
}

#[derive(Debug, Serialize)]
pub struct ExamplesResponse {
    pub examples: Vec<ExampleRequest>,
    pub tips: Vec<&'static str>,
}

impl ExamplesResponse {
    pub fn builtin() -> Self {
        Self {
            examples: vec![
                ExampleRequest {
                    topic: "Integers and Rational Numbers",
                    sss_level: SssLevel::Sss1,
                    learning_pace: Pace::Low,
                },
                ExampleRequest {
                    topic: "Vectors in 3D (Dot Product)",
                    sss_level: SssLevel::Sss3,
                    learning_pace: Pace::Advance,
                },
                ExampleRequest {
                    topic: "Quadratic Equations (Factorization)",
                    sss_level: SssLevel::Sss2,
                    learning_pace: Pace::Moderate,
                },
            ],
            tips: vec![
                "Use topics found in the subject's SSS syllabus for best results.",
                "Test different learning paces (low, moderate, advance) to see the personalization.",
                "Pass \"subject\" to target a subject other than the default; see /subjects.",
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Chunk;

    fn result(page: Option<u32>, source: &str) -> RetrievalResult {
        RetrievalResult {
            chunk: Chunk {
                id: 0,
                text: "x".repeat(400),
                source: source.to_string(),
                page,
                offset: 0,
            },
            score: 0.5,
        }
    }

    #[test]
    fn test_source_document_pages_are_one_based() {
        let doc = SourceDocument::from(&result(Some(0), "maths.pdf"));
        assert_eq!(doc.page, Some(1));
        assert_eq!(doc.source, "maths.pdf");
        assert_eq!(doc.content_preview.chars().count(), PREVIEW_CHARS + 3);
        assert!(doc.content_preview.ends_with("..."));
    }

    #[test]
    fn test_unknown_page_serializes_as_null() {
        let doc = SourceDocument::from(&result(None, ""));
        assert_eq!(doc.source, FALLBACK_SOURCE);

        let json = serde_json::to_value(&doc).unwrap();
        assert!(json["page"].is_null());
    }

    #[test]
    fn test_lesson_request_rejects_bad_level() {
        let body = r#"{"topic": "Sets", "sss_level": "SSS 5", "learning_pace": "low"}"#;
        assert!(serde_json::from_str::<LessonRequest>(body).is_err());

        let body = r#"{"topic": "Sets", "sss_level": "SSS 1", "learning_pace": "low"}"#;
        let request: LessonRequest = serde_json::from_str(body).unwrap();
        assert!(request.subject.is_none());
    }
}
