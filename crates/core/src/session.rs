use crate::extractor::extract_documents;
use crate::models::Document;
use crate::RagError;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

/// Documents loaded during one conversation.
///
/// Owned by the caller; a fresh conversation is a new `ChatSession` or a
/// [`ChatSession::reset`]. Nothing here is persisted.
#[derive(Debug, Default)]
pub struct ChatSession {
    loaded_documents: Vec<Document>,
    loaded_files: BTreeSet<String>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_documents(&mut self, documents: Vec<Document>, file_name: &str) {
        self.loaded_documents.extend(documents);
        self.loaded_files.insert(file_name.to_string());
        info!(file = %file_name, files = self.loaded_files.len(), "added file to chat session");
    }

    pub fn has_file_loaded(&self, file_name: &str) -> bool {
        self.loaded_files.contains(file_name)
    }

    pub fn documents(&self) -> &[Document] {
        &self.loaded_documents
    }

    pub fn loaded_files(&self) -> &BTreeSet<String> {
        &self.loaded_files
    }

    pub fn reset(&mut self) {
        self.loaded_documents.clear();
        self.loaded_files.clear();
        info!("chat session cleared");
    }

    /// Loads `file_name` from `raw_dir` unless this session already holds it.
    /// Returns the number of documents added.
    pub fn load_uploaded_file(&mut self, raw_dir: &Path, file_name: &str) -> Result<usize, RagError> {
        if self.has_file_loaded(file_name) {
            warn!(file = %file_name, "file already loaded in this chat, skipping");
            return Ok(0);
        }

        let path = raw_dir.join(file_name);
        if !path.is_file() {
            return Err(RagError::NotFound(path.display().to_string()));
        }

        let documents = extract_documents(&path)?;
        let added = documents.len();
        self.add_documents(documents, file_name);
        Ok(added)
    }

    /// Loads each file in turn, skipping missing ones, and returns everything
    /// the session holds afterwards.
    pub fn load_uploaded_files<S: AsRef<str>>(
        &mut self,
        raw_dir: &Path,
        file_names: &[S],
    ) -> Result<&[Document], RagError> {
        for file_name in file_names {
            match self.load_uploaded_file(raw_dir, file_name.as_ref()) {
                Ok(_) => {}
                Err(RagError::NotFound(path)) => warn!(path = %path, "uploaded file not found"),
                Err(error) => return Err(error),
            }
        }

        info!(documents = self.loaded_documents.len(), "documents in chat session");
        Ok(&self.loaded_documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn the_same_file_is_loaded_once() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("faq.txt"), "Office hours are nine to five.")?;
        let mut session = ChatSession::new();

        assert_eq!(session.load_uploaded_file(dir.path(), "faq.txt")?, 1);
        assert_eq!(session.load_uploaded_file(dir.path(), "faq.txt")?, 0);
        assert_eq!(session.documents().len(), 1);
        assert!(session.has_file_loaded("faq.txt"));
        Ok(())
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let mut session = ChatSession::new();
        let result = session.load_uploaded_file(dir.path(), "ghost.pdf");
        assert!(matches!(result, Err(RagError::NotFound(_))));
        assert!(session.loaded_files().is_empty());
    }

    #[test]
    fn batch_load_skips_missing_files_and_reset_clears() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a.txt"), "Alpha.")?;
        fs::write(dir.path().join("b.txt"), "Beta.")?;
        let mut session = ChatSession::new();

        let documents = session.load_uploaded_files(dir.path(), &["a.txt", "missing.txt", "b.txt", "a.txt"])?;
        assert_eq!(documents.len(), 2);
        assert_eq!(session.loaded_files().len(), 2);

        session.reset();
        assert!(session.documents().is_empty());
        assert!(!session.has_file_loaded("a.txt"));
        Ok(())
    }
}
