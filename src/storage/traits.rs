//! Vector store trait definition
//!
//! Defines the async interface the semantic indexer writes to and searches.
//! Implemented by InMemoryVectorStore and ChromaStore.

use async_trait::async_trait;
use serde_json::Value;

use crate::types::{AppError, ScoredCodeChunk};
use crate::Result;

/// One batch of records; all four vectors are index-aligned.
#[derive(Debug, Clone, Default)]
pub struct UpsertBatch {
    pub ids: Vec<String>,
    pub vectors: Vec<Vec<f32>>,
    pub documents: Vec<String>,
    pub metadata: Vec<Value>,
}

impl UpsertBatch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Rejects batches whose columns disagree in length.
    pub fn validate(&self) -> Result<()> {
        let n = self.ids.len();
        if self.vectors.len() != n || self.documents.len() != n || self.metadata.len() != n {
            return Err(AppError::VectorStore(format!(
                "misaligned batch: {} ids, {} vectors, {} documents, {} metadata",
                n,
                self.vectors.len(),
                self.documents.len(),
                self.metadata.len()
            )));
        }
        Ok(())
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Insert or replace records by id
    async fn upsert(&self, batch: UpsertBatch) -> Result<()>;

    /// Nearest `k` records to `vector`, closest first
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredCodeChunk>>;

    /// Number of stored records
    async fn count(&self) -> Result<usize>;
}
