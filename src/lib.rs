//! SSS Tutor - curriculum-grounded lesson generation
//!
//! Indexes Senior Secondary School syllabus documents per subject, keeps each
//! index cached on disk until its source document changes, and generates
//! pace-tailored lesson notes by retrieval-augmented generation.

pub mod cli;
pub mod config;
pub mod curriculum;
pub mod embedding;
pub mod error;
pub mod index;
pub mod lesson;
pub mod server;

pub use error::{Result, TutorError};
