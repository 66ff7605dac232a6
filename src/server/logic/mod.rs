pub mod semantic;
pub mod structural;

use rmcp::model::{CallToolResult, Content};
use serde_json::json;

use crate::AppError;

// ============================================================================
// Logic Constants & Helpers
// ============================================================================

pub const DEFAULT_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 100;

pub fn normalize_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

// ============================================================================
// Response Helpers
// ============================================================================

/// Error result carrying `{ "error": message, "code": code }`.
pub fn error_response(e: &AppError) -> CallToolResult {
    CallToolResult::error(vec![Content::text(
        json!({ "error": e.to_string(), "code": e.code() }).to_string(),
    )])
}

/// Create success response from JSON value
pub fn success_json(value: serde_json::Value) -> CallToolResult {
    CallToolResult::success(vec![Content::text(value.to_string())])
}

/// Create success response from serializable value
pub fn success_serialize<T: serde::Serialize>(value: &T) -> CallToolResult {
    match serde_json::to_string(value) {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => error_response(&AppError::from(e)),
    }
}

#[cfg(test)]
pub(crate) fn payload(result: &CallToolResult) -> serde_json::Value {
    let text = result
        .content
        .first()
        .and_then(|c| c.as_text())
        .map(|t| t.text.clone())
        .expect("text content");
    serde_json::from_str(&text).expect("json payload")
}
