use crate::RagError;
use async_trait::async_trait;

/// Hosted text-completion service used to phrase answers and summaries.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, RagError>;
}
