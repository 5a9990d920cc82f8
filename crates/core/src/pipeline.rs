use crate::embeddings::Embedder;
use crate::models::Answer;
use crate::retriever::{Retriever, DEFAULT_TOP_K};
use crate::traits::AnswerGenerator;
use crate::RagError;
use std::sync::Arc;
use tracing::info;

/// Reply the model is told to give when the context does not hold the answer.
pub const UNKNOWN_ANSWER: &str = "I don't know.";

const ANSWER_TEMPERATURE: f32 = 0.2;

pub fn build_answer_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful assistant answering questions about a set of documents.\n\
         Answer the question ONLY using the context below.\n\
         If the answer is not contained in the context, reply with exactly \"{UNKNOWN_ANSWER}\" and nothing else.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question:\n\
         {question}\n"
    )
}

/// Retrieval followed by constrained generation.
pub struct QueryPipeline<E: Embedder + ?Sized, G: AnswerGenerator + ?Sized> {
    retriever: Retriever<E>,
    generator: Arc<G>,
    top_k: usize,
}

impl<E: Embedder + ?Sized, G: AnswerGenerator + ?Sized> QueryPipeline<E, G> {
    pub fn new(retriever: Retriever<E>, generator: Arc<G>) -> Self {
        Self {
            retriever,
            generator,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Generator failures propagate unchanged; nothing is retried.
    pub async fn ask(&self, question: &str) -> Result<Answer, RagError> {
        if question.trim().is_empty() {
            return Err(RagError::InvalidQuestion("question is empty".to_string()));
        }

        info!(top_k = self.top_k, "retrieving context");
        let retrieved = self.retriever.retrieve(question, self.top_k).await?;

        info!(sources = retrieved.sources.len(), "generating answer");
        let prompt = build_answer_prompt(&retrieved.context, question);
        let answer = self.generator.generate(&prompt, ANSWER_TEMPERATURE).await?;

        Ok(Answer {
            answer,
            sources: retrieved.sources,
        })
    }
}
