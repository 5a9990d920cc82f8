use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// File name inside the raw directory.
    pub source: String,
    /// 1-based page number for PDF pages, absent for plain text files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub chunk_index: u32,
    pub start_char: usize,
}

impl ChunkMetadata {
    pub fn from_document(parent: &DocumentMetadata, chunk_index: u32, start_char: usize) -> Self {
        Self {
            source: parent.source.clone(),
            page: parent.page,
            chunk_index,
            start_char,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IndexingOutcome {
    Rebuilt { files: Vec<String>, chunks: usize },
    Updated { new_files: Vec<String>, chunks: usize },
    UpToDate,
    NoDocuments,
    /// Every new file failed to load; they stay out of the manifest.
    Skipped { files: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub context: String,
    pub sources: Vec<ChunkMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<ChunkMetadata>,
}

/// Locations of the raw documents and the persisted index.
#[derive(Debug, Clone)]
pub struct RagPaths {
    pub raw_dir: PathBuf,
    pub index_dir: PathBuf,
}

impl RagPaths {
    pub fn new(raw_dir: impl Into<PathBuf>, index_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            index_dir: index_dir.into(),
        }
    }
}

impl Default for RagPaths {
    fn default() -> Self {
        Self::new("data/raw", "vectorstore/index")
    }
}
