use crate::chunking::normalize_text;
use crate::error::IngestError;
use crate::models::{Document, DocumentMetadata};
use lopdf::Document as PdfDocument;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    /// Classifies a path by its extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension().and_then(|ext| ext.to_str())?;
        if extension.eq_ignore_ascii_case("pdf") {
            Some(Self::Pdf)
        } else if extension.eq_ignore_ascii_case("txt") {
            Some(Self::Text)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        let document =
            PdfDocument::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            if !text.trim().is_empty() {
                pages.push(PageText {
                    number: page_no,
                    text,
                });
            }
        }

        if pages.is_empty() {
            return Err(IngestError::PdfParse(format!(
                "pdf had no readable page text: {}",
                path.display()
            )));
        }

        Ok(pages)
    }
}

pub fn file_name_of(path: &Path) -> Result<String, IngestError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))
}

/// Reads one raw file into normalized documents: one per PDF page, one per
/// text file. Blank pages and blank files yield no documents.
pub fn extract_documents(path: &Path) -> Result<Vec<Document>, IngestError> {
    extract_documents_with(&LopdfExtractor, path)
}

pub fn extract_documents_with<P: PdfExtractor>(
    pdf: &P,
    path: &Path,
) -> Result<Vec<Document>, IngestError> {
    let source = file_name_of(path)?;
    let kind = DocumentKind::from_path(path)
        .ok_or_else(|| IngestError::UnsupportedFile(path.display().to_string()))?;

    let raw_pages = match kind {
        DocumentKind::Pdf => pdf
            .extract_pages(path)?
            .into_iter()
            .map(|page| (Some(page.number), page.text))
            .collect::<Vec<_>>(),
        DocumentKind::Text => vec![(None, fs::read_to_string(path)?)],
    };

    Ok(raw_pages
        .into_iter()
        .filter_map(|(page, text)| {
            let text = normalize_text(&text);
            if text.is_empty() {
                return None;
            }
            Some(Document {
                text,
                metadata: DocumentMetadata {
                    source: source.clone(),
                    page,
                },
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    struct FakePdf;

    impl PdfExtractor for FakePdf {
        fn extract_pages(&self, _path: &Path) -> Result<Vec<PageText>, IngestError> {
            Ok(vec![
                PageText {
                    number: 1,
                    text: "Remote work   policy".to_string(),
                },
                PageText {
                    number: 2,
                    text: "  \n ".to_string(),
                },
                PageText {
                    number: 3,
                    text: "Expenses are reimbursed monthly.".to_string(),
                },
            ])
        }
    }

    #[test]
    fn kind_is_detected_case_insensitively() {
        assert_eq!(DocumentKind::from_path(Path::new("a.PDF")), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_path(Path::new("b.Txt")), Some(DocumentKind::Text));
        assert_eq!(DocumentKind::from_path(Path::new("c.docx")), None);
        assert_eq!(DocumentKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn text_file_becomes_one_document_without_page() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("notes.txt");
        fs::write(&path, "Leave  policy\r\n\r\nApplies to all staff.\n")?;

        let documents = extract_documents(&path)?;
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].text, "Leave policy\n\nApplies to all staff.");
        assert_eq!(documents[0].metadata.source, "notes.txt");
        assert_eq!(documents[0].metadata.page, None);
        Ok(())
    }

    #[test]
    fn pdf_pages_keep_their_numbers_and_blank_pages_are_dropped() {
        let documents = extract_documents_with(&FakePdf, &PathBuf::from("/tmp/handbook.pdf"))
            .expect("fake pdf should extract");

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].text, "Remote work policy");
        assert_eq!(documents[0].metadata.page, Some(1));
        assert_eq!(documents[1].metadata.page, Some(3));
        assert_eq!(documents[1].metadata.source, "handbook.pdf");
    }

    #[test]
    fn broken_pdf_is_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4\n%broken")?;

        assert!(matches!(extract_documents(&path), Err(IngestError::PdfParse(_))));
        Ok(())
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let result = extract_documents(Path::new("/tmp/slides.pptx"));
        assert!(matches!(result, Err(IngestError::UnsupportedFile(_))));
    }
}
