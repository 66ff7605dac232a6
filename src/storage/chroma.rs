//! ChromaDB REST client for the v2 API. Collections live under a tenant
//! and database; the server defaults are used unless configured.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::info;

use super::traits::{UpsertBatch, VectorStore};
use crate::types::{AppError, ScoredCodeChunk};
use crate::Result;

pub const DEFAULT_TENANT: &str = "default_tenant";
pub const DEFAULT_DATABASE: &str = "default_database";

pub struct ChromaStore {
    base_url: String,
    tenant: String,
    database: String,
    collection: String,
    client: Client,
    collection_id: OnceCell<String>,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Debug, Deserialize, Default)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Value>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
}

fn store_error(e: reqwest::Error) -> AppError {
    AppError::VectorStore(e.to_string())
}

impl ChromaStore {
    pub fn new(base_url: &str, collection: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(store_error)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            tenant: DEFAULT_TENANT.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            collection: collection.to_string(),
            client,
            collection_id: OnceCell::new(),
        })
    }

    pub fn with_database(mut self, tenant: &str, database: &str) -> Self {
        self.tenant = tenant.to_string();
        self.database = database.to_string();
        self
    }

    fn collections_url(&self) -> String {
        format!(
            "{}/api/v2/tenants/{}/databases/{}/collections",
            self.base_url, self.tenant, self.database
        )
    }

    fn collection_url(&self, id: &str, op: &str) -> String {
        format!("{}/{id}/{op}", self.collections_url())
    }

    /// Gets or creates the collection on first use.
    async fn collection_id(&self) -> Result<&str> {
        let id = self
            .collection_id
            .get_or_try_init(|| async {
                let body = json!({
                    "name": self.collection,
                    "metadata": { "hnsw:space": "cosine" },
                    "get_or_create": true,
                });
                let response: CollectionResponse = self
                    .post(&self.collections_url(), &body)
                    .await?
                    .json()
                    .await
                    .map_err(store_error)?;
                info!(collection = %self.collection, id = %response.id, "Connected to Chroma collection");
                Ok::<_, AppError>(response.id)
            })
            .await?;
        Ok(id.as_str())
    }

    async fn post(&self, url: &str, body: &Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(store_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::VectorStore(format!(
                "Chroma {url} failed: {status} - {text}"
            )));
        }
        Ok(response)
    }
}

fn flatten_query(response: QueryResponse) -> Vec<ScoredCodeChunk> {
    let ids = response.ids.into_iter().next().unwrap_or_default();
    let documents = response
        .documents
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default();
    let metadatas = response
        .metadatas
        .and_then(|m| m.into_iter().next())
        .unwrap_or_default();
    let distances = response
        .distances
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default();

    ids.into_iter()
        .enumerate()
        .map(|(i, id)| ScoredCodeChunk {
            id,
            document: documents.get(i).cloned().flatten().unwrap_or_default(),
            metadata: metadatas.get(i).cloned().flatten().unwrap_or(Value::Null),
            distance: distances.get(i).copied().flatten().unwrap_or(f32::MAX),
        })
        .collect()
}

#[async_trait]
impl VectorStore for ChromaStore {
    fn name(&self) -> &'static str {
        "chroma"
    }

    async fn upsert(&self, batch: UpsertBatch) -> Result<()> {
        batch.validate()?;
        if batch.is_empty() {
            return Ok(());
        }
        let id = self.collection_id().await?;
        let body = json!({
            "ids": batch.ids,
            "embeddings": batch.vectors,
            "documents": batch.documents,
            "metadatas": batch.metadata,
        });
        self.post(&self.collection_url(id, "upsert"), &body).await?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredCodeChunk>> {
        let id = self.collection_id().await?;
        let body = json!({
            "query_embeddings": [vector],
            "n_results": k,
            "include": ["documents", "metadatas", "distances"],
        });
        let response: QueryResponse = self
            .post(&self.collection_url(id, "query"), &body)
            .await?
            .json()
            .await
            .map_err(store_error)?;
        Ok(flatten_query(response))
    }

    async fn count(&self) -> Result<usize> {
        let id = self.collection_id().await?;
        let url = self.collection_url(id, "count");
        let response = self.client.get(&url).send().await.map_err(store_error)?;
        if !response.status().is_success() {
            return Err(AppError::VectorStore(format!(
                "Chroma count failed: {}",
                response.status()
            )));
        }
        response.json::<usize>().await.map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_query_response() {
        let raw = json!({
            "ids": [["a#chunk0", "b#chunk1"]],
            "documents": [["first", null]],
            "metadatas": [[{ "source": "a", "chunkIndex": 0 }, null]],
            "distances": [[0.1, 0.4]],
        });
        let response: QueryResponse = serde_json::from_value(raw).unwrap();
        let hits = flatten_query(response);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a#chunk0");
        assert_eq!(hits[0].metadata["chunkIndex"], 0);
        assert_eq!(hits[1].document, "");
        assert!((hits[1].distance - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_v2_routes() {
        let store = ChromaStore::new("http://localhost:8000/", "code", Duration::from_secs(1)).unwrap();
        assert_eq!(
            store.collections_url(),
            "http://localhost:8000/api/v2/tenants/default_tenant/databases/default_database/collections"
        );

        let store = store.with_database("acme", "search");
        assert_eq!(
            store.collection_url("c-1", "query"),
            "http://localhost:8000/api/v2/tenants/acme/databases/search/collections/c-1/query"
        );
    }

    #[test]
    fn test_empty_response() {
        assert!(flatten_query(QueryResponse::default()).is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_vector_store_error() {
        let store = ChromaStore::new("http://127.0.0.1:9", "codebase_index", Duration::from_millis(500))
            .unwrap();
        let err = store.query(&[1.0], 1).await.unwrap_err();
        assert_eq!(err.code(), "vector_store_error");
    }
}
