use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),
}

#[derive(Debug, Error)]
pub enum RagError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no vector index has been persisted at {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("invalid question: {0}")]
    InvalidQuestion(String),

    #[error("index was built with {expected} but the configured embedder is {found}")]
    EmbeddingMismatch { expected: String, found: String },

    #[error("invalid response from {backend}: {details}")]
    Service { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T, E = RagError> = std::result::Result<T, E>;
