use crate::error::IngestError;
use crate::models::{Chunk, ChunkMetadata, Document};

/// Boundaries tried in order before falling back to a hard character cut.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks of one document.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 100,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be positive".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than chunk size {}",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Cleans extracted text while keeping line and paragraph structure intact.
pub fn normalize_text(text: &str) -> String {
    let unified = text
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{a0}', " ");

    let mut normalized = String::with_capacity(unified.len());
    let mut pending_blank = false;

    for line in unified.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            pending_blank = true;
            continue;
        }

        if !normalized.is_empty() {
            normalized.push_str(if pending_blank { "\n\n" } else { "\n" });
        }
        normalized.push_str(&line);
        pending_blank = false;
    }

    normalized
}

/// Splits `text` into `(start_char, chunk_text)` pairs.
///
/// Every chunk is a contiguous span of `text`. A chunk after the first starts
/// exactly `overlap` characters before the end of its predecessor.
pub fn split_text(text: &str, config: ChunkingConfig) -> Result<Vec<(usize, String)>, IngestError> {
    config.validate()?;

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < total {
        if total - start <= config.chunk_size {
            pieces.push((start, chars[start..].iter().collect()));
            break;
        }

        let end = find_split(&chars, start, config);
        pieces.push((start, chars[start..end].iter().collect()));
        start = end - config.overlap;
    }

    Ok(pieces)
}

// The chosen end always lies in (start + overlap, start + chunk_size] so the
// next chunk starts strictly after `start`.
fn find_split(chars: &[char], start: usize, config: ChunkingConfig) -> usize {
    let lowest = start + config.overlap + 1;
    let highest = start + config.chunk_size;

    for separator in SEPARATORS {
        let pattern: Vec<char> = separator.chars().collect();
        let found = (lowest..=highest)
            .rev()
            .find(|&end| end >= pattern.len() && chars[end - pattern.len()..end] == pattern[..]);
        if let Some(end) = found {
            return end;
        }
    }

    highest
}

pub fn chunk_document(document: &Document, config: ChunkingConfig) -> Result<Vec<Chunk>, IngestError> {
    let chunks = split_text(&document.text, config)?
        .into_iter()
        .enumerate()
        .map(|(index, (start_char, text))| Chunk {
            text,
            metadata: ChunkMetadata::from_document(&document.metadata, index as u32, start_char),
        })
        .collect();

    Ok(chunks)
}

pub fn chunk_documents(documents: &[Document], config: ChunkingConfig) -> Result<Vec<Chunk>, IngestError> {
    let mut chunks = Vec::new();
    for document in documents {
        chunks.extend(chunk_document(document, config)?);
    }

    tracing::debug!(documents = documents.len(), chunks = chunks.len(), "chunked documents");
    Ok(chunks)
}
