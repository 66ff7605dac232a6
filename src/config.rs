use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::codebase::SemanticIndexer;
use crate::embedding::{EmbeddingConfig, EmbeddingService, ProviderKind};
use crate::storage::{build_store, ChromaTarget, StoreKind, DEFAULT_DATABASE, DEFAULT_TENANT};
use crate::structural::{EngineOptions, StructuralEngine};
use crate::Result;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub workspace: PathBuf,
    pub embedding_provider: ProviderKind,
    pub vector_store: StoreKind,
    pub chroma_url: String,
    pub chroma_tenant: String,
    pub chroma_database: String,
    pub collection: String,
    pub cache_size: usize,
    pub snapshot_cache_size: usize,
    pub max_watched_projects: usize,
    pub timeout_ms: u64,
    pub log_level: String,
    pub watch: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("."),
            embedding_provider: ProviderKind::Auto,
            vector_store: StoreKind::Memory,
            chroma_url: "http://localhost:8000".to_string(),
            chroma_tenant: DEFAULT_TENANT.to_string(),
            chroma_database: DEFAULT_DATABASE.to_string(),
            collection: "codebase_index".to_string(),
            cache_size: 1000,
            snapshot_cache_size: 512,
            max_watched_projects: 64,
            timeout_ms: 30000,
            log_level: "info".to_string(),
            watch: true,
        }
    }
}

impl AppConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            snapshot_cache_size: self.snapshot_cache_size,
            max_watched_projects: self.max_watched_projects,
            watch: self.watch,
        }
    }

    pub fn embedding_config(&self) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: self.embedding_provider,
            cache_size: self.cache_size,
            timeout: self.timeout(),
        }
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub structural: Arc<StructuralEngine>,
    pub indexer: Arc<SemanticIndexer>,
    pub embedding: Arc<EmbeddingService>,
}

impl AppState {
    /// Wires collaborators from the config. The structural engine is built
    /// but not initialized; call `structural.initialize()` before serving.
    pub fn new(config: AppConfig) -> Result<Self> {
        let embedding = Arc::new(EmbeddingService::new(&config.embedding_config())?);
        let store = build_store(
            config.vector_store,
            ChromaTarget {
                url: &config.chroma_url,
                tenant: &config.chroma_tenant,
                database: &config.chroma_database,
                collection: &config.collection,
            },
            config.timeout(),
        )?;
        let indexer = Arc::new(SemanticIndexer::new(embedding.clone(), store));
        let structural = Arc::new(StructuralEngine::new(
            &config.workspace,
            config.engine_options(),
        ));

        Ok(Self {
            config,
            structural,
            indexer,
            embedding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::VectorStore;
    use crate::test_utils::fixture_workspace;

    #[tokio::test]
    async fn test_state_from_config() {
        let ws = fixture_workspace(&[
            ("tsconfig.json", "{}"),
            ("src/a.ts", "export const a = 1;\n"),
        ]);
        let config = AppConfig {
            workspace: ws.path().to_path_buf(),
            embedding_provider: ProviderKind::Mock,
            watch: false,
            ..AppConfig::default()
        };

        let state = AppState::new(config).unwrap();
        assert_eq!(state.embedding.kind(), ProviderKind::Mock);
        assert_eq!(state.indexer.store().name(), "memory");

        let report = state.structural.initialize().await.unwrap();
        assert_eq!(report.projects, 1);
        assert_eq!(report.watched, 0);
    }

    #[test]
    fn test_chroma_store_connects_lazily() {
        let ws = fixture_workspace(&[]);
        let config = AppConfig {
            workspace: ws.path().to_path_buf(),
            embedding_provider: ProviderKind::Mock,
            vector_store: StoreKind::Chroma,
            chroma_url: "http://127.0.0.1:9".to_string(),
            watch: false,
            ..AppConfig::default()
        };

        let state = AppState::new(config).unwrap();
        assert_eq!(state.indexer.store().name(), "chroma");
        assert_eq!(state.config.chroma_tenant, "default_tenant");
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.engine_options().snapshot_cache_size, 512);
        assert_eq!(config.embedding_config().cache_size, 1000);
    }
}
