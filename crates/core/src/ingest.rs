use crate::extractor::{extract_documents, file_name_of, DocumentKind};
use crate::models::Document;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Lists the supported (`.pdf`, `.txt`) files directly inside `folder`.
pub fn discover_documents(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        if DocumentKind::from_path(entry.path()).is_some() {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn supported_file_names(folder: &Path) -> BTreeSet<String> {
    discover_documents(folder)
        .iter()
        .filter_map(|path| file_name_of(path).ok())
        .collect()
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    /// Files that were read successfully, even when they held no text.
    pub loaded_files: BTreeSet<String>,
    pub skipped_files: Vec<SkippedFile>,
}

/// Loads the named files from `folder`, skipping any that vanished or fail
/// to parse.
pub fn load_documents(folder: &Path, names: &BTreeSet<String>) -> LoadReport {
    let mut report = LoadReport::default();

    for name in names {
        let path = folder.join(name);

        if !path.is_file() {
            warn!(file = %name, "file disappeared before loading, skipping");
            report.skipped_files.push(SkippedFile {
                name: name.clone(),
                reason: "file not found".to_string(),
            });
            continue;
        }

        match extract_documents(&path) {
            Ok(documents) => {
                info!(file = %name, documents = documents.len(), "loaded file");
                report.documents.extend(documents);
                report.loaded_files.insert(name.clone());
            }
            Err(error) => {
                warn!(file = %name, reason = %error, "skipping unreadable file");
                report.skipped_files.push(SkippedFile {
                    name: name.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    report
}

pub fn load_all_documents(folder: &Path) -> LoadReport {
    load_documents(folder, &supported_file_names(folder))
}

#[cfg(test)]
mod tests {
    use super::{discover_documents, load_all_documents, load_documents, supported_file_names};
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn discovery_is_flat_and_filters_extensions() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        fs::write(base.join("a.pdf"), b"%PDF-1.4\n%fake")?;
        fs::write(base.join("B.TXT"), "upper case")?;
        fs::write(base.join("c.docx"), "ignored")?;
        fs::write(nested.join("d.txt"), "too deep")?;

        let files = discover_documents(base);
        assert_eq!(files.len(), 2);

        let names = supported_file_names(base);
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["B.TXT".to_string(), "a.pdf".to_string()]
        );
        Ok(())
    }

    #[test]
    fn missing_folder_has_no_documents() {
        let report = load_all_documents(std::path::Path::new("/definitely/not/here"));
        assert!(report.documents.is_empty());
        assert!(report.loaded_files.is_empty());
    }

    #[test]
    fn vanished_files_are_skipped() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("kept.txt"), "still here")?;

        let names: BTreeSet<String> = ["kept.txt", "gone.txt"].iter().map(|s| s.to_string()).collect();
        let report = load_documents(dir.path(), &names);

        assert_eq!(report.documents.len(), 1);
        assert!(report.loaded_files.contains("kept.txt"));
        assert_eq!(report.skipped_files.len(), 1);
        assert_eq!(report.skipped_files[0].name, "gone.txt");
        Ok(())
    }

    #[test]
    fn best_effort_skips_unreadable_pdfs() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("unreadable.pdf"), b"%PDF-1.4\n%broken")?;
        fs::write(dir.path().join("empty.txt"), "  \n")?;

        let report = load_all_documents(dir.path());

        assert_eq!(report.documents.len(), 0);
        assert!(report.loaded_files.contains("empty.txt"));
        assert_eq!(report.skipped_files.len(), 1);
        assert_eq!(report.skipped_files[0].name, "unreadable.pdf");
        Ok(())
    }
}
