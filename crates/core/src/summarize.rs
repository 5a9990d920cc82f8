use crate::ingest::load_all_documents;
use crate::store::run_blocking;
use crate::traits::AnswerGenerator;
use crate::RagError;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub const NO_DOCUMENTS_SUMMARY: &str = "No documents found to summarize.";
pub const TRUNCATION_MARKER: &str = "... [Text truncated due to length limits]";
pub const DEFAULT_SUMMARY_MAX_CHARS: usize = 40_000;

const SUMMARY_TEMPERATURE: f32 = 0.3;

pub fn build_summary_prompt(text: &str) -> String {
    format!(
        "You are an assistant that summarizes policy and reference documents.\n\
         Write a section-wise summary of the documents below in markdown.\n\
         Use a heading for each major section, list its key points as bullets, \
         and quote or highlight the key policy language (obligations, limits, deadlines, exceptions).\n\
         \n\
         Documents:\n\
         {text}\n"
    )
}

/// Cuts `text` to `max_chars` characters and appends [`TRUNCATION_MARKER`]
/// when anything was removed.
pub fn truncate_to_budget(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &text[..cut]),
        None => text.to_string(),
    }
}

/// Summarises every document in the raw directory, bypassing the index.
pub struct SummarizationPipeline<G: AnswerGenerator + ?Sized> {
    raw_dir: PathBuf,
    generator: Arc<G>,
    max_chars: usize,
}

impl<G: AnswerGenerator + ?Sized> SummarizationPipeline<G> {
    pub fn new(raw_dir: impl Into<PathBuf>, generator: Arc<G>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            generator,
            max_chars: DEFAULT_SUMMARY_MAX_CHARS,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub async fn summarize(&self) -> Result<String, RagError> {
        let raw_dir = self.raw_dir.clone();
        let report = run_blocking(move || Ok(load_all_documents(&raw_dir))).await?;
        if report.documents.is_empty() {
            return Ok(NO_DOCUMENTS_SUMMARY.to_string());
        }

        let full_text = report
            .documents
            .iter()
            .map(|document| document.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let text = truncate_to_budget(&full_text, self.max_chars);

        info!(
            documents = report.documents.len(),
            chars = text.chars().count(),
            "generating summary"
        );
        self.generator
            .generate(&build_summary_prompt(&text), SUMMARY_TEMPERATURE)
            .await
    }
}
