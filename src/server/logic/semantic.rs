use std::sync::Arc;

use rmcp::model::CallToolResult;
use serde_json::json;

use crate::config::AppState;
use crate::server::params::{IndexCodebaseParams, SemanticSearchParams};
use crate::{AppError, Result};

use super::{error_response, normalize_limit, success_json};

pub async fn semantic_search(
    state: &Arc<AppState>,
    params: SemanticSearchParams,
) -> Result<CallToolResult> {
    if params.query.trim().is_empty() {
        return Ok(error_response(&AppError::Embedding(
            "query must not be empty".into(),
        )));
    }

    let limit = normalize_limit(params.limit);
    let results = match state.indexer.search(&params.query, limit).await {
        Ok(r) => r,
        Err(e) => return Ok(error_response(&e)),
    };

    Ok(success_json(json!({
        "results": results,
        "count": results.len(),
        "query": params.query,
        "cache": state.embedding.cache_stats()
    })))
}

/// Validates the directory and hands it to a background task. The caller
/// gets an acceptance message right away; progress goes to the log.
pub async fn index_codebase(
    state: &Arc<AppState>,
    params: IndexCodebaseParams,
) -> Result<CallToolResult> {
    let dir = match params.dir_path.as_deref() {
        Some(path) => state.structural.resolve_path(path),
        None => state.structural.workspace().to_path_buf(),
    };

    if !dir.is_dir() {
        return Ok(error_response(&AppError::InvalidPath(format!(
            "not a directory: {}",
            dir.display()
        ))));
    }

    let started_at = chrono::Utc::now();
    state.indexer.spawn_index_directory(dir.clone());

    Ok(success_json(json!({
        "message": format!(
            "Started background indexing of {}. It may take a few minutes depending on the size of the project.",
            dir.display()
        ),
        "dirPath": dir.display().to_string(),
        "startedAt": started_at.to_rfc3339()
    })))
}
