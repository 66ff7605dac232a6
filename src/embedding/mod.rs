mod cache;
mod config;
mod mock;
mod remote;
mod service;

use async_trait::async_trait;

use crate::types::{AppError, Result};

pub use cache::{CacheStats, EmbeddingCache};
pub use config::{EmbeddingConfig, ProviderKind};
pub use mock::{MockEmbedding, MOCK_DIMENSIONS};
pub use remote::{GeminiProvider, OpenAiCompatibleProvider};
pub use service::EmbeddingService;

/// Turns text into vectors. Batch results are index-aligned with the input.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn model_id(&self) -> &str;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| AppError::Embedding("provider returned no embedding".to_string()))
    }
}
