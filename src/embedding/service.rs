use std::sync::Arc;

use tracing::{info, warn};

use super::cache::{CacheStats, EmbeddingCache};
use super::config::{EmbeddingConfig, ProviderKind};
use super::mock::MockEmbedding;
use super::remote::{GeminiProvider, OpenAiCompatibleProvider};
use super::EmbeddingProvider;
use crate::types::{AppError, Result};

/// Provider plus the query embedding cache.
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    kind: ProviderKind,
    cache: EmbeddingCache,
}

impl EmbeddingService {
    /// Builds the configured provider, reading API keys from the environment.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let kind = config
            .provider
            .resolve(|var| std::env::var(var).is_ok_and(|v| !v.is_empty()));
        if config.provider == ProviderKind::Auto && kind == ProviderKind::Mock {
            warn!("No embedding API key found, semantic search uses offline mock embeddings");
        }

        let api_key = || -> Result<String> {
            let var = kind.api_key_var().unwrap_or_default();
            std::env::var(var)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::Embedding(format!("{var} is not set")))
        };

        let provider: Arc<dyn EmbeddingProvider> = match kind {
            ProviderKind::OpenAi => {
                Arc::new(OpenAiCompatibleProvider::openai(api_key()?, config.timeout)?)
            }
            ProviderKind::Voyage => {
                Arc::new(OpenAiCompatibleProvider::voyage(api_key()?, config.timeout)?)
            }
            ProviderKind::Gemini => Arc::new(GeminiProvider::new(api_key()?, config.timeout)?),
            ProviderKind::Mock | ProviderKind::Auto => Arc::new(MockEmbedding::new()),
        };

        info!(provider = %kind, model = provider.model_id(), "Embedding provider ready");
        Ok(Self::with_provider(provider, kind, config.cache_size))
    }

    pub fn with_provider(
        provider: Arc<dyn EmbeddingProvider>,
        kind: ProviderKind,
        cache_size: usize,
    ) -> Self {
        Self {
            provider,
            kind,
            cache: EmbeddingCache::new(cache_size),
        }
    }

    pub fn mock(cache_size: usize) -> Self {
        Self::with_provider(Arc::new(MockEmbedding::new()), ProviderKind::Mock, cache_size)
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.lookup(self.kind, text) {
            return Ok(cached.to_vec());
        }

        let embedding = self.provider.embed(text).await?;
        self.cache
            .store(self.kind, text, Arc::from(embedding.as_slice()));
        Ok(embedding)
    }

    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.provider.embed_batch(texts).await
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
