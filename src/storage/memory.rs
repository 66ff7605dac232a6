use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::traits::{UpsertBatch, VectorStore};
use crate::types::ScoredCodeChunk;
use crate::Result;

#[derive(Debug, Clone)]
struct Record {
    vector: Vec<f32>,
    document: String,
    metadata: Value,
}

/// Process-local store with brute-force cosine search.
#[derive(Default)]
pub struct InMemoryVectorStore {
    records: RwLock<HashMap<String, Record>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cosine distance: 0 for identical direction, 2 for opposite. Zero vectors
/// are treated as maximally distant from everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let dot: f32 = a[..len].iter().zip(&b[..len]).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 1.0;
    }
    1.0 - dot / (na * nb)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upsert(&self, batch: UpsertBatch) -> Result<()> {
        batch.validate()?;
        let mut records = self.records.write().await;
        let UpsertBatch {
            ids,
            vectors,
            documents,
            metadata,
        } = batch;
        for (((id, vector), document), metadata) in
            ids.into_iter().zip(vectors).zip(documents).zip(metadata)
        {
            records.insert(
                id,
                Record {
                    vector,
                    document,
                    metadata,
                },
            );
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredCodeChunk>> {
        let records = self.records.read().await;
        let mut scored: Vec<ScoredCodeChunk> = records
            .iter()
            .map(|(id, r)| ScoredCodeChunk {
                id: id.clone(),
                document: r.document.clone(),
                metadata: r.metadata.clone(),
                distance: cosine_distance(vector, &r.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn batch(items: &[(&str, Vec<f32>)]) -> UpsertBatch {
        UpsertBatch {
            ids: items.iter().map(|(id, _)| id.to_string()).collect(),
            vectors: items.iter().map(|(_, v)| v.clone()).collect(),
            documents: items.iter().map(|(id, _)| format!("doc {id}")).collect(),
            metadata: items.iter().map(|(id, _)| json!({ "source": id })).collect(),
        }
    }

    #[tokio::test]
    async fn test_query_orders_by_distance() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(batch(&[
                ("far", vec![0.0, 1.0]),
                ("near", vec![1.0, 0.1]),
                ("exact", vec![2.0, 0.0]),
            ]))
            .await
            .unwrap();

        let hits = store.query(&[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near"]);
        assert!(hits[0].distance.abs() < 1e-6);
        assert_eq!(hits[0].document, "doc exact");
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = InMemoryVectorStore::new();
        store.upsert(batch(&[("a", vec![1.0])])).await.unwrap();
        store.upsert(batch(&[("a", vec![-1.0])])).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let hits = store.query(&[1.0], 1).await.unwrap();
        assert!((hits[0].distance - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_distance() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }
}
