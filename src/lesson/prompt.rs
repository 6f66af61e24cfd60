use super::{Pace, SssLevel};
use crate::index::RetrievalResult;

/// Separator placed between retrieved chunks in the prompt context
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Query embedded to retrieve curriculum chunks for a lesson
pub fn retrieval_query(subject: &str, topic: &str, level: SssLevel) -> String {
    format!(
        "{} {} syllabus content for the topic: {}",
        level, subject, topic
    )
}

pub fn build_context(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .map(|r| r.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Full generation prompt for one lesson
pub fn build_prompt(
    subject: &str,
    topic: &str,
    level: SssLevel,
    pace: Pace,
    context: &str,
) -> String {
    format!(
        r#"You are an AI tutor specializing in {subject} for a student in Sierra Leone's Senior Secondary School (SSS).
Your task is to generate a comprehensive, personalized lesson on a specific topic based on the provided curriculum context.

Curriculum Context (This defines WHAT should be taught):
---
{context}
---

User Request Details:
- **Subject:** {subject}
- **Topic:** {topic}
- **SSS Level:** {level}
- **Learning Pace:** {pace}

**INSTRUCTIONS for Lesson Tailoring:**
1. **Structure:** Start with a brief Introduction, followed by Detailed Notes, and conclude with Practice Exercises.
2. **Pace Adjustment:** {instructions}

Generate the complete, tailored lesson notes now. The output must be educational and structured clearly.
"#,
        subject = subject,
        context = context,
        topic = topic,
        level = level,
        pace = pace,
        instructions = pace.instructions(),
    )
}
