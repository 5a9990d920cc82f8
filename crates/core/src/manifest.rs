use crate::store::write_atomically;
use crate::RagError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE_NAME: &str = "indexed_files.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Indexed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub status: FileStatus,
}

/// Record of the raw files whose chunks are all present in the saved index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexedFileManifest {
    files: BTreeMap<String, FileRecord>,
}

impl IndexedFileManifest {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut manifest = Self::default();
        manifest.mark_indexed(names);
        manifest
    }

    /// Reads the manifest in `index_dir`; a missing file is an empty manifest.
    pub fn load(index_dir: &Path) -> Result<Self, RagError> {
        let path = index_dir.join(MANIFEST_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, index_dir: &Path) -> Result<(), RagError> {
        fs::create_dir_all(index_dir)?;
        let payload = serde_json::to_vec_pretty(self)?;
        write_atomically(&index_dir.join(MANIFEST_FILE_NAME), &payload)
    }

    pub fn mark_indexed<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.files.insert(
                name.into(),
                FileRecord {
                    status: FileStatus::Indexed,
                },
            );
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn file_names(&self) -> BTreeSet<String> {
        self.files.keys().cloned().collect()
    }

    /// Names in `present` that have not been indexed yet.
    pub fn new_files(&self, present: &BTreeSet<String>) -> BTreeSet<String> {
        present
            .iter()
            .filter(|name| !self.files.contains_key(*name))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
