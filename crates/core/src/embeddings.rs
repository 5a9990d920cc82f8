use crate::error::RagError;
use crate::generator::endpoint_url;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 128;

/// Maps text into a fixed-dimension vector space.
///
/// An index must be queried with an embedder reporting the same
/// [`Embedder::model_id`] and [`Embedder::dimensions`] it was built with.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;

    fn dimensions(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Service {
                backend: self.model_id().to_string(),
                details: "empty embedding response".to_string(),
            })
    }
}

#[derive(Debug, Clone)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
    model_id: String,
}

impl CharacterNgramEmbedder {
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            model_id: format!("char-trigram-{dimensions}"),
        }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

/// Client for an OpenAI-compatible `/embeddings` endpoint.
pub struct HttpEmbedder {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimensions: usize,
    client: Client,
}

impl HttpEmbedder {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        dimensions: usize,
    ) -> Result<Self, RagError> {
        if dimensions == 0 {
            return Err(RagError::Config(
                "embedding dimensions must be positive".to_string(),
            ));
        }

        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            endpoint: endpoint_url(base_url, "embeddings")?,
            model: model.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            dimensions,
            client,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&embedding_request(&self.model, texts, self.dimensions));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Service {
                backend: self.endpoint.clone(),
                details: format!("{status}: {body}"),
            });
        }

        let parsed: Value = response.json().await?;
        parse_embedding_response(&parsed, texts.len(), self.dimensions).map_err(|details| {
            RagError::Service {
                backend: self.endpoint.clone(),
                details,
            }
        })
    }
}

/// Asks for `dimensions`-long vectors so models with a larger native size
/// (`text-embedding-3-*`) shorten them to what the index expects.
fn embedding_request(model: &str, texts: &[String], dimensions: usize) -> Value {
    json!({ "model": model, "input": texts, "dimensions": dimensions })
}

fn parse_embedding_response(
    parsed: &Value,
    expected: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>, String> {
    let mut items = parsed
        .pointer("/data")
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| "response has no data array".to_string())?;

    items.sort_by_key(|item| item.pointer("/index").and_then(Value::as_u64).unwrap_or(0));

    let vectors = items
        .iter()
        .map(|item| {
            item.pointer("/embedding")
                .and_then(Value::as_array)
                .map(|values| {
                    values
                        .iter()
                        .filter_map(Value::as_f64)
                        .map(|value| value as f32)
                        .collect::<Vec<_>>()
                })
                .ok_or_else(|| "data item has no embedding".to_string())
        })
        .collect::<Result<Vec<_>, _>>()?;

    if vectors.len() != expected {
        return Err(format!(
            "expected {expected} embeddings, received {}",
            vectors.len()
        ));
    }
    if let Some(vector) = vectors.iter().find(|vector| vector.len() != dimensions) {
        return Err(format!(
            "embedding dimension {} != {dimensions}",
            vector.len()
        ));
    }

    Ok(vectors)
}
