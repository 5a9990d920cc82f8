use crate::embeddings::Embedder;
use crate::models::{Chunk, ChunkMetadata};
use crate::RagError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const INDEX_FILE_NAME: &str = "index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub score: f32,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Exact cosine-similarity index persisted as one JSON file.
///
/// The index remembers the embedder it was built with and refuses to load
/// under a different one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    model_id: String,
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new(model_id: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model_id: model_id.into(),
            dimensions,
            entries: Vec::new(),
        }
    }

    pub fn for_embedder<E: Embedder + ?Sized>(embedder: &E) -> Self {
        Self::new(embedder.model_id(), embedder.dimensions())
    }

    pub fn exists(index_dir: &Path) -> bool {
        index_dir.join(INDEX_FILE_NAME).is_file()
    }

    pub fn load<E: Embedder + ?Sized>(index_dir: &Path, embedder: &E) -> Result<Self, RagError> {
        let index = Self::read(index_dir)?;
        index.ensure_built_with(embedder)?;
        Ok(index)
    }

    /// Reads the saved index without checking which embedder built it.
    pub fn read(index_dir: &Path) -> Result<Self, RagError> {
        let path = index_dir.join(INDEX_FILE_NAME);
        if !path.is_file() {
            return Err(RagError::IndexNotFound(index_dir.to_path_buf()));
        }

        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn ensure_built_with<E: Embedder + ?Sized>(&self, embedder: &E) -> Result<(), RagError> {
        if self.model_id != embedder.model_id() || self.dimensions != embedder.dimensions() {
            return Err(RagError::EmbeddingMismatch {
                expected: format!("{} ({} dims)", self.model_id, self.dimensions),
                found: format!("{} ({} dims)", embedder.model_id(), embedder.dimensions()),
            });
        }
        Ok(())
    }

    pub fn save(&self, index_dir: &Path) -> Result<(), RagError> {
        fs::create_dir_all(index_dir)?;
        let payload = serde_json::to_vec(self)?;
        write_atomically(&index_dir.join(INDEX_FILE_NAME), &payload)?;
        tracing::info!(path = %index_dir.display(), entries = self.entries.len(), "vector index saved");
        Ok(())
    }

    pub fn add(&mut self, chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<(), RagError> {
        if chunks.len() != embeddings.len() {
            return Err(RagError::Service {
                backend: self.model_id.clone(),
                details: format!(
                    "embedding count {} doesn't match chunk count {}",
                    embeddings.len(),
                    chunks.len()
                ),
            });
        }

        if let Some(vector) = embeddings.iter().find(|vector| vector.len() != self.dimensions) {
            return Err(RagError::EmbeddingMismatch {
                expected: format!("{} dims", self.dimensions),
                found: format!("{} dims", vector.len()),
            });
        }

        self.entries.extend(
            chunks
                .into_iter()
                .zip(embeddings)
                .map(|(chunk, vector)| IndexEntry {
                    text: chunk.text,
                    metadata: chunk.metadata,
                    vector,
                }),
        );
        Ok(())
    }

    /// Returns the `k` entries most similar to `query`, best first. Equal
    /// scores keep insertion order.
    pub fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, RagError> {
        if query.len() != self.dimensions {
            return Err(RagError::EmbeddingMismatch {
                expected: format!("{} dims", self.dimensions),
                found: format!("{} dims", query.len()),
            });
        }

        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(query, &entry.vector), entry))
            .collect();
        scored.sort_by(|left, right| right.0.total_cmp(&left.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, entry)| ScoredChunk {
                score,
                text: entry.text.clone(),
                metadata: entry.metadata.clone(),
            })
            .collect())
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    let dot = left.iter().zip(right).map(|(a, b)| a * b).sum::<f32>();
    let left_norm = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|value| value * value).sum::<f32>().sqrt();

    if left_norm == 0.0 || right_norm == 0.0 {
        0.0
    } else {
        dot / (left_norm * right_norm)
    }
}

/// Replaces `path` through a sibling temp file so readers never see a torn write.
pub(crate) fn write_atomically(path: &Path, payload: &[u8]) -> Result<(), RagError> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    fs::write(&temp, payload)?;
    fs::rename(&temp, path)?;
    Ok(())
}

/// Runs file and parsing work off the async worker threads.
pub(crate) async fn run_blocking<T, F>(task: F) -> Result<T, RagError>
where
    F: FnOnce() -> Result<T, RagError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await?
}
