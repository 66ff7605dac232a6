use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use crate::codebase::SemanticIndexer;
use crate::config::{AppConfig, AppState};
use crate::embedding::{EmbeddingService, ProviderKind};
use crate::storage::{InMemoryVectorStore, StoreKind};
use crate::structural::{EngineOptions, StructuralEngine};

/// Writes `(relative path, contents)` pairs into a fresh temp directory.
pub fn fixture_workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (rel, contents) in files {
        write_file(dir.path(), rel, contents);
    }
    dir
}

pub fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create fixture dir");
    }
    std::fs::write(&path, contents).expect("Failed to write fixture file");
}

pub struct TestContext {
    pub state: Arc<AppState>,
    pub _workspace: TempDir, // Kept so the workspace lives as long as the context
}

impl TestContext {
    /// Initialized state over a fixture workspace with the mock embedding
    /// provider, the in-memory vector store and no watchers.
    pub async fn new(files: &[(&str, &str)]) -> Self {
        let workspace = fixture_workspace(files);

        let config = AppConfig {
            workspace: workspace.path().to_path_buf(),
            embedding_provider: ProviderKind::Mock,
            vector_store: StoreKind::Memory,
            cache_size: 100,
            watch: false,
            log_level: "debug".to_string(),
            ..AppConfig::default()
        };

        let structural = Arc::new(StructuralEngine::new(
            &config.workspace,
            EngineOptions {
                snapshot_cache_size: config.snapshot_cache_size,
                max_watched_projects: config.max_watched_projects,
                watch: false,
            },
        ));
        structural
            .initialize()
            .await
            .expect("Failed to initialize structural engine");

        let embedding = Arc::new(EmbeddingService::mock(config.cache_size));
        let indexer = Arc::new(SemanticIndexer::new(
            embedding.clone(),
            Arc::new(InMemoryVectorStore::new()),
        ));

        let state = Arc::new(AppState {
            config,
            structural,
            indexer,
            embedding,
        });

        Self {
            state,
            _workspace: workspace,
        }
    }
}
