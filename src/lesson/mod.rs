/// Lesson generation
///
/// Architecture:
/// - ComponentRegistry: lazily built, cached per-subject retrieval components
/// - prompt: retrieval query and pace-tailored prompt construction
/// - GenerationProvider trait with an OpenAI-compatible chat implementation
/// - LessonOrchestrator: retrieve top-K chunks, prompt, generate
mod generator;
mod orchestrator;
pub mod prompt;
mod registry;

pub use generator::{GenerationError, GenerationProvider, OpenAiCompatibleGenerator};
pub use orchestrator::LessonOrchestrator;
pub use registry::{ComponentRegistry, SubjectComponents};

use crate::index::RetrievalResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LessonError {
    #[error("Unknown subject: {0}")]
    UnknownSubject(String),

    #[error("Curriculum index not ready: {0}")]
    ComponentsNotReady(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Lesson generation failed: {0}")]
    GenerationFailure(String),
}

/// Student learning pace; selects the prompt's tailoring instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pace {
    Low,
    Moderate,
    Advance,
}

impl Pace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pace::Low => "low",
            Pace::Moderate => "moderate",
            Pace::Advance => "advance",
        }
    }

    /// Tailoring instructions for this pace
    pub fn instructions(&self) -> &'static str {
        match self {
            Pace::Low => {
                "The student is a beginner. Focus on basic concepts and fundamentals. \
                 Use very simple analogies. Provide many, highly detailed, step-by-step \
                 solved examples. Use short paragraphs and frequent bullet points."
            }
            Pace::Moderate => {
                "Provide a balanced explanation, covering both concepts and standard \
                 applications. Include a few key examples."
            }
            Pace::Advance => {
                "The student is advanced. Offer a quick theory recap. The main focus should \
                 be on complex problem-solving, advanced applications, and questions that \
                 require critical thinking or proof."
            }
        }
    }
}

impl fmt::Display for Pace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Pace::Low),
            "moderate" => Ok(Pace::Moderate),
            "advance" => Ok(Pace::Advance),
            other => Err(format!(
                "invalid learning pace '{}': expected low, moderate, or advance",
                other
            )),
        }
    }
}

/// Senior Secondary School year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SssLevel {
    #[serde(rename = "SSS 1")]
    Sss1,
    #[serde(rename = "SSS 2")]
    Sss2,
    #[serde(rename = "SSS 3")]
    Sss3,
}

impl SssLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SssLevel::Sss1 => "SSS 1",
            SssLevel::Sss2 => "SSS 2",
            SssLevel::Sss3 => "SSS 3",
        }
    }
}

impl fmt::Display for SssLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts "SSS 2", "sss2" or a bare "2"
impl FromStr for SssLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        let digit = compact.strip_prefix("SSS").unwrap_or(&compact);
        match digit {
            "1" => Ok(SssLevel::Sss1),
            "2" => Ok(SssLevel::Sss2),
            "3" => Ok(SssLevel::Sss3),
            _ => Err(format!("invalid SSS level '{}': expected 1, 2, or 3", s.trim())),
        }
    }
}

/// Generated lesson notes with the chunks they were grounded on
#[derive(Debug, Clone)]
pub struct LessonResult {
    pub subject: String,
    pub topic: String,
    pub level: SssLevel,
    pub pace: Pace,
    pub lesson_notes: String,
    pub sources: Vec<RetrievalResult>,
}
