//! HTTP embedding providers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::config::ProviderKind;
use super::EmbeddingProvider;
use crate::types::{AppError, Result};

const OPENAI_EMBED_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";
const VOYAGE_EMBED_ENDPOINT: &str = "https://api.voyageai.com/v1/embeddings";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Embedding(format!("Failed to build HTTP client: {e}")))
}

async fn error_body(provider: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    AppError::Embedding(format!("{provider} API error: {status} - {body}"))
}

/// OpenAI and Voyage share the `/v1/embeddings` wire format.
pub struct OpenAiCompatibleProvider {
    label: &'static str,
    endpoint: String,
    model_id: String,
    api_key: String,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn openai(api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            label: "OpenAI",
            endpoint: OPENAI_EMBED_ENDPOINT.to_string(),
            model_id: ProviderKind::OpenAi.model_id().to_string(),
            api_key,
            client: http_client(timeout)?,
        })
    }

    pub fn voyage(api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            label: "Voyage",
            endpoint: VOYAGE_EMBED_ENDPOINT.to_string(),
            model_id: ProviderKind::Voyage.model_id().to_string(),
            api_key,
            client: http_client(timeout)?,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatibleProvider {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let payload = if self.label == "OpenAI" {
            json!({ "model": self.model_id, "input": texts, "encoding_format": "float" })
        } else {
            json!({ "model": self.model_id, "input": texts })
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_body(self.label, response).await);
        }

        let body: EmbeddingApiResponse = response.json().await?;
        align_embeddings(body.data, texts.len())
    }
}

/// Orders a batch response by its `index` field. Responses without indices
/// are taken positionally.
fn align_embeddings(data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(AppError::Embedding(format!(
            "embedding count mismatch: expected {expected}, got {}",
            data.len()
        )));
    }

    let indexed = data.iter().filter(|d| d.index.is_some()).count();
    if indexed == 0 {
        return Ok(data.into_iter().map(|d| d.embedding).collect());
    }
    if indexed != data.len() {
        return Err(AppError::Embedding(
            "embedding response mixes indexed and unindexed items".to_string(),
        ));
    }

    let mut ordered: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in data {
        let index = item.index.unwrap_or(usize::MAX);
        let slot = ordered.get_mut(index).ok_or_else(|| {
            AppError::Embedding(format!("embedding index {index} out of range"))
        })?;
        if slot.is_some() {
            return Err(AppError::Embedding(format!(
                "duplicate embedding index {index}"
            )));
        }
        *slot = Some(item.embedding);
    }

    ordered
        .into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or_else(|| AppError::Embedding(format!("missing embedding {i}"))))
        .collect()
}

pub struct GeminiProvider {
    base_url: String,
    model_id: String,
    api_key: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: GEMINI_BASE_URL.to_string(),
            model_id: ProviderKind::Gemini.model_id().to_string(),
            api_key,
            client: http_client(timeout)?,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct GeminiBatchResponse {
    #[serde(default)]
    embeddings: Vec<GeminiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct GeminiEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = format!("models/{}", self.model_id);
        let requests: Vec<_> = texts
            .iter()
            .map(|text| json!({ "model": model, "content": { "parts": [{ "text": text }] } }))
            .collect();

        let url = format!("{}/{}:batchEmbedContents", self.base_url, self.model_id);
        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&json!({ "requests": requests }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_body("Gemini", response).await);
        }

        let body: GeminiBatchResponse = response.json().await?;
        let data = body
            .embeddings
            .into_iter()
            .map(|e| EmbeddingData {
                index: None,
                embedding: e.values,
            })
            .collect();
        align_embeddings(data, texts.len())
    }
}
