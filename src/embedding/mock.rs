use async_trait::async_trait;

use super::EmbeddingProvider;
use crate::types::Result;

pub const MOCK_DIMENSIONS: usize = 256;

/// Deterministic offline embeddings derived from a blake3 hash of the text.
/// Bag-of-words style: texts sharing words end up close to each other.
#[derive(Debug, Clone, Default)]
pub struct MockEmbedding;

impl MockEmbedding {
    pub fn new() -> Self {
        Self
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; MOCK_DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|w| !w.is_empty())
        {
            let hash = blake3::hash(word.to_lowercase().as_bytes());
            let bytes = hash.as_bytes();
            let slot = u16::from_le_bytes([bytes[0], bytes[1]]) as usize % MOCK_DIMENSIONS;
            vec[slot] += 1.0 + (bytes[2] as f32) / 255.0;
        }

        let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vec.iter_mut().for_each(|v| *v /= norm);
        }
        vec
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedding {
    fn model_id(&self) -> &str {
        "mock"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_is_deterministic_and_ordered() {
        let mock = MockEmbedding::new();
        let texts = vec!["alpha beta".to_string(), "gamma".to_string()];
        let batch = mock.embed_batch(&texts).await.unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], mock.embed("alpha beta").await.unwrap());
        assert_eq!(batch[1], MockEmbedding::vector("gamma"));
        assert_eq!(batch[0].len(), MOCK_DIMENSIONS);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        assert!(MockEmbedding::vector("  ").iter().all(|v| *v == 0.0));
    }
}
