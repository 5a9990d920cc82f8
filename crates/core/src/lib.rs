pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod indexer;
pub mod ingest;
pub mod manifest;
pub mod models;
pub mod pipeline;
pub mod retriever;
pub mod session;
pub mod store;
pub mod summarize;
pub mod traits;

pub use chunking::{chunk_document, chunk_documents, normalize_text, split_text, ChunkingConfig};
pub use embeddings::{CharacterNgramEmbedder, Embedder, HttpEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{IngestError, RagError};
pub use extractor::{extract_documents, DocumentKind, LopdfExtractor, PageText, PdfExtractor};
pub use generator::{
    ChatCompletionsGenerator, GeneratorConfig, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL,
};
pub use indexer::IndexManager;
pub use ingest::{
    discover_documents, load_all_documents, load_documents, supported_file_names, LoadReport,
    SkippedFile,
};
pub use manifest::{FileRecord, FileStatus, IndexedFileManifest};
pub use models::{
    Answer, Chunk, ChunkMetadata, Document, DocumentMetadata, IndexingOutcome, RagPaths,
    RetrievedContext,
};
pub use pipeline::{build_answer_prompt, QueryPipeline, UNKNOWN_ANSWER};
pub use retriever::{Retriever, DEFAULT_TOP_K};
pub use session::ChatSession;
pub use store::{ScoredChunk, VectorIndex};
pub use summarize::{
    truncate_to_budget, SummarizationPipeline, DEFAULT_SUMMARY_MAX_CHARS, NO_DOCUMENTS_SUMMARY,
    TRUNCATION_MARKER,
};
pub use traits::AnswerGenerator;
