use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::embedding::EmbeddingService;
use crate::storage::{UpsertBatch, VectorStore};
use crate::types::ScoredCodeChunk;
use crate::Result;

use super::chunker::chunk_file;
use super::scanner::scan_directory;

pub const BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FileIndexReport {
    pub path: PathBuf,
    pub chunks: usize,
    /// Batches whose embedding or upsert failed. They are logged, not retried.
    pub failed_batches: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DirectoryIndexReport {
    pub root: PathBuf,
    pub files: usize,
    pub chunks: usize,
    pub failed_batches: usize,
    pub failed_files: usize,
}

/// Chunks source files, embeds them and writes them to the vector store.
pub struct SemanticIndexer {
    embedding: Arc<EmbeddingService>,
    store: Arc<dyn VectorStore>,
}

impl SemanticIndexer {
    pub fn new(embedding: Arc<EmbeddingService>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedding, store }
    }

    pub fn store(&self) -> &dyn VectorStore {
        self.store.as_ref()
    }

    pub async fn index_file(&self, path: &Path) -> Result<FileIndexReport> {
        let content = fs::read_to_string(path).await?;
        let chunks = chunk_file(path, &content);
        let mut report = FileIndexReport {
            path: path.to_path_buf(),
            chunks: chunks.len(),
            failed_batches: 0,
        };

        for batch in chunks.chunks(BATCH_SIZE) {
            let documents: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let outcome = async {
                let vectors = self.embedding.embed_batch(&documents).await?;
                self.store
                    .upsert(UpsertBatch {
                        ids: batch.iter().map(|c| c.id.clone()).collect(),
                        vectors,
                        documents: documents.clone(),
                        metadata: batch.iter().map(|c| c.metadata()).collect(),
                    })
                    .await
            }
            .await;

            if let Err(e) = outcome {
                error!(
                    file = %path.display(),
                    first_chunk = batch.first().map(|c| c.chunk_index).unwrap_or_default(),
                    error = %e,
                    "Failed to index chunk batch"
                );
                report.failed_batches += 1;
            }
        }

        info!(file = %path.display(), chunks = report.chunks, "Indexed file");
        Ok(report)
    }

    pub async fn index_directory(&self, dir: &Path) -> Result<DirectoryIndexReport> {
        let files = scan_directory(dir)?;
        let mut report = DirectoryIndexReport {
            root: dir.to_path_buf(),
            ..DirectoryIndexReport::default()
        };

        for file in files {
            match self.index_file(&file).await {
                Ok(file_report) => {
                    report.files += 1;
                    report.chunks += file_report.chunks;
                    report.failed_batches += file_report.failed_batches;
                }
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Skipping unreadable file");
                    report.failed_files += 1;
                }
            }
        }

        info!(
            root = %dir.display(),
            files = report.files,
            chunks = report.chunks,
            failed_batches = report.failed_batches,
            "Indexing finished"
        );
        Ok(report)
    }

    /// Runs `index_directory` in the background; errors end up in the log.
    pub fn spawn_index_directory(
        self: &Arc<Self>,
        dir: PathBuf,
    ) -> JoinHandle<Option<DirectoryIndexReport>> {
        let indexer = self.clone();
        tokio::spawn(async move {
            match indexer.index_directory(&dir).await {
                Ok(report) => Some(report),
                Err(e) => {
                    error!(root = %dir.display(), error = %e, "Background indexing failed");
                    None
                }
            }
        })
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredCodeChunk>> {
        let vector = self.embedding.embed(query).await?;
        self.store.query(&vector, limit).await
    }
}
