use super::Chunk;
use crate::config::ChunkingConfig;
use crate::curriculum::Page;
use text_splitter::{Characters, ChunkConfig, ChunkConfigError, TextSplitter};

/// Splits page text into overlapping, size-bounded chunks
///
/// Chunks never cross page boundaries, so each keeps a single page reference.
/// Chunks without a single letter or digit carry nothing to retrieve and are
/// skipped.
pub struct Chunker {
    splitter: TextSplitter<Characters>,
}

impl Chunker {
    pub fn new(config: &ChunkingConfig) -> Result<Self, ChunkConfigError> {
        let chunk_config = ChunkConfig::new(config.chunk_size).with_overlap(config.chunk_overlap)?;
        Ok(Self {
            splitter: TextSplitter::new(chunk_config),
        })
    }

    /// Chunk every page of `source`, numbering chunks in reading order
    pub fn split(&self, source: &str, pages: &[Page]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in pages {
            for (offset, text) in self.splitter.chunk_indices(&page.text) {
                if !text.chars().any(char::is_alphanumeric) {
                    continue;
                }
                chunks.push(Chunk {
                    id: chunks.len() as u64,
                    text: text.to_string(),
                    source: source.to_string(),
                    page: page.number,
                    offset,
                });
            }
        }
        chunks
    }
}
