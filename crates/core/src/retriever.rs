use crate::embeddings::Embedder;
use crate::models::RetrievedContext;
use crate::store::{run_blocking, VectorIndex};
use crate::RagError;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_TOP_K: usize = 3;

pub struct Retriever<E: Embedder + ?Sized> {
    index_dir: PathBuf,
    embedder: Arc<E>,
}

impl<E: Embedder + ?Sized> Retriever<E> {
    /// `embedder` must be the one the index at `index_dir` was built with.
    pub fn new(index_dir: impl Into<PathBuf>, embedder: Arc<E>) -> Self {
        Self {
            index_dir: index_dir.into(),
            embedder,
        }
    }

    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievedContext, RagError> {
        let index_dir = self.index_dir.clone();
        let index = run_blocking(move || VectorIndex::read(&index_dir)).await?;
        index.ensure_built_with(self.embedder.as_ref())?;
        let query_vector = self.embedder.embed(query).await?;
        let hits = index.similarity_search(&query_vector, k)?;

        tracing::debug!(k, hits = hits.len(), "retrieved context");

        let context = hits
            .iter()
            .map(|hit| hit.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let sources = hits.into_iter().map(|hit| hit.metadata).collect();

        Ok(RetrievedContext { context, sources })
    }
}
