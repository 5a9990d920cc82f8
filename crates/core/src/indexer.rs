use crate::chunking::{chunk_documents, ChunkingConfig};
use crate::embeddings::Embedder;
use crate::ingest::{load_all_documents, load_documents, supported_file_names};
use crate::manifest::IndexedFileManifest;
use crate::models::{Chunk, IndexingOutcome, RagPaths};
use crate::store::{run_blocking, VectorIndex};
use crate::RagError;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

const EMBED_BATCH_SIZE: usize = 64;

/// Keeps the persisted vector index and its manifest in step with the raw
/// directory.
///
/// Runs are serialised through an internal lock, so a shared manager never
/// lets two runs append to the same loaded index. The index save and the
/// manifest save are separate writes: a crash between them leaves the
/// manifest behind the index and the affected files are embedded again on
/// the next incremental run.
pub struct IndexManager<E: Embedder + ?Sized> {
    paths: RagPaths,
    chunking: ChunkingConfig,
    embedder: Arc<E>,
    writer: Mutex<()>,
}

impl<E: Embedder + ?Sized> IndexManager<E> {
    pub fn new(paths: RagPaths, chunking: ChunkingConfig, embedder: Arc<E>) -> Result<Self, RagError> {
        chunking.validate()?;
        Ok(Self {
            paths,
            chunking,
            embedder,
            writer: Mutex::new(()),
        })
    }

    pub fn paths(&self) -> &RagPaths {
        &self.paths
    }

    pub fn embedder(&self) -> &Arc<E> {
        &self.embedder
    }

    /// Rebuilds the index from scratch when `incremental` is false or no
    /// index exists yet; otherwise embeds only files missing from the
    /// manifest.
    pub async fn run_indexing(&self, incremental: bool) -> Result<IndexingOutcome, RagError> {
        let _guard = self.writer.lock().await;

        if !incremental || !VectorIndex::exists(&self.paths.index_dir) {
            self.rebuild().await
        } else {
            self.update().await
        }
    }

    async fn rebuild(&self) -> Result<IndexingOutcome, RagError> {
        info!(raw_dir = %self.paths.raw_dir.display(), "starting full index rebuild");

        let raw_dir = self.paths.raw_dir.clone();
        let report = run_blocking(move || Ok(load_all_documents(&raw_dir))).await?;
        if report.documents.is_empty() {
            warn!(raw_dir = %self.paths.raw_dir.display(), "no documents found, nothing indexed");
            return Ok(IndexingOutcome::NoDocuments);
        }

        let chunks = chunk_documents(&report.documents, self.chunking)?;
        let mut index = VectorIndex::for_embedder(self.embedder.as_ref());
        let chunk_count = self.embed_into(&mut index, chunks).await?;

        let manifest = IndexedFileManifest::from_names(report.loaded_files.iter().cloned());
        self.persist(index, manifest).await?;

        let files: Vec<String> = report.loaded_files.into_iter().collect();
        info!(files = files.len(), chunks = chunk_count, "full index rebuild complete");
        Ok(IndexingOutcome::Rebuilt {
            files,
            chunks: chunk_count,
        })
    }

    async fn update(&self) -> Result<IndexingOutcome, RagError> {
        let raw_dir = self.paths.raw_dir.clone();
        let index_dir = self.paths.index_dir.clone();
        let (mut manifest, present) = run_blocking(move || {
            Ok((IndexedFileManifest::load(&index_dir)?, supported_file_names(&raw_dir)))
        })
        .await?;
        let new_files = manifest.new_files(&present);

        if new_files.is_empty() {
            info!(indexed = manifest.len(), "index is up to date");
            return Ok(IndexingOutcome::UpToDate);
        }

        info!(new_files = new_files.len(), "indexing new files");
        let raw_dir = self.paths.raw_dir.clone();
        let report = run_blocking(move || Ok(load_documents(&raw_dir, &new_files))).await?;
        if report.loaded_files.is_empty() {
            let files: Vec<String> = report.skipped_files.into_iter().map(|file| file.name).collect();
            warn!(skipped = files.len(), "no new file could be loaded");
            return Ok(IndexingOutcome::Skipped { files });
        }

        let chunks = chunk_documents(&report.documents, self.chunking)?;
        let index_dir = self.paths.index_dir.clone();
        let mut index = run_blocking(move || VectorIndex::read(&index_dir)).await?;
        index.ensure_built_with(self.embedder.as_ref())?;
        let chunk_count = self.embed_into(&mut index, chunks).await?;

        manifest.mark_indexed(report.loaded_files.iter().cloned());
        self.persist(index, manifest).await?;

        let new_files: Vec<String> = report.loaded_files.into_iter().collect();
        info!(files = new_files.len(), chunks = chunk_count, "incremental index update complete");
        Ok(IndexingOutcome::Updated {
            new_files,
            chunks: chunk_count,
        })
    }

    /// Saves the index before the manifest, so the manifest never names a
    /// file whose chunks are missing.
    async fn persist(&self, index: VectorIndex, manifest: IndexedFileManifest) -> Result<(), RagError> {
        let index_dir = self.paths.index_dir.clone();
        run_blocking(move || {
            index.save(&index_dir)?;
            manifest.save(&index_dir)
        })
        .await
    }

    async fn embed_into(&self, index: &mut VectorIndex, chunks: Vec<Chunk>) -> Result<usize, RagError> {
        let total = chunks.len();
        let mut remaining = chunks.into_iter().peekable();

        while remaining.peek().is_some() {
            let batch: Vec<Chunk> = remaining.by_ref().take(EMBED_BATCH_SIZE).collect();
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            index.add(batch, embeddings)?;
        }

        Ok(total)
    }
}
