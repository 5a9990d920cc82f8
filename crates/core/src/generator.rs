use crate::traits::AnswerGenerator;
use crate::RagError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "openai/gpt-oss-120b";

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            api_key: String::new(),
            timeout_secs: 120,
        }
    }
}

/// Joins `path` onto `base_url`, keeping any path prefix of the base.
pub fn endpoint_url(base_url: &str, path: &str) -> Result<String, RagError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let base = Url::parse(&format!("{trimmed}/"))?;
    Ok(base.join(path)?.to_string())
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionsGenerator {
    endpoint: String,
    model: String,
    api_key: String,
    client: Client,
}

impl ChatCompletionsGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self, RagError> {
        if config.api_key.trim().is_empty() {
            return Err(RagError::Config(
                "an API key for the answer generator is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            endpoint: endpoint_url(&config.base_url, "chat/completions")?,
            model: config.model,
            api_key: config.api_key,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl AnswerGenerator for ChatCompletionsGenerator {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, RagError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Service {
                backend: self.endpoint.clone(),
                details: format!("{status}: {body}"),
            });
        }

        let payload: ChatResponse = response.json().await?;
        first_choice_text(payload).ok_or_else(|| RagError::Service {
            backend: self.endpoint.clone(),
            details: "completion response has no choices".to_string(),
        })
    }
}

fn first_choice_text(payload: ChatResponse) -> Option<String> {
    payload
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
}
