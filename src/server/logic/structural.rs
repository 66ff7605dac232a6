use std::sync::Arc;

use rmcp::model::CallToolResult;

use crate::config::AppState;
use crate::server::params::{FileParams, PositionParams};
use crate::structural::StructuralEngine;
use crate::Result;

use super::{error_response, success_serialize};

/// Runs a synchronous engine query on the blocking pool and renders the outcome.
async fn run_query<T, F>(state: &Arc<AppState>, query: F) -> Result<CallToolResult>
where
    T: serde::Serialize + Send + 'static,
    F: FnOnce(&StructuralEngine) -> Result<T> + Send + 'static,
{
    let engine = state.structural.clone();
    let outcome = tokio::task::spawn_blocking(move || query(&engine)).await?;
    Ok(match outcome {
        Ok(value) => success_serialize(&value),
        Err(e) => error_response(&e),
    })
}

pub async fn get_definition(
    state: &Arc<AppState>,
    params: PositionParams,
) -> Result<CallToolResult> {
    run_query(state, move |engine| {
        engine.get_definition(&params.file_path, params.line, params.character)
    })
    .await
}

pub async fn get_references(
    state: &Arc<AppState>,
    params: PositionParams,
) -> Result<CallToolResult> {
    run_query(state, move |engine| {
        engine.get_references(&params.file_path, params.line, params.character)
    })
    .await
}

pub async fn get_file_structure(
    state: &Arc<AppState>,
    params: FileParams,
) -> Result<CallToolResult> {
    run_query(state, move |engine| engine.get_file_structure(&params.file_path)).await
}
