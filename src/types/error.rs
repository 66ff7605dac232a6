use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to parse project config {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("File not in any known project: {}", .0.display())]
    ProjectNotFound(PathBuf),

    #[error("File is not tracked by its project: {}", .0.display())]
    FileNotTracked(PathBuf),

    #[error("Position {line}:{character} is out of range: {reason}")]
    PositionOutOfRange {
        line: u32,
        character: u32,
        reason: String,
    },

    #[error("Failed to watch {}: {message}", root.display())]
    WatchSetup { root: PathBuf, message: String },

    #[error("Analysis engine error: {0}")]
    EngineQuery(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code carried in tool error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ConfigParse { .. } => "config_parse_error",
            AppError::ProjectNotFound(_) => "project_not_found",
            AppError::FileNotTracked(_) => "file_not_tracked",
            AppError::PositionOutOfRange { .. } => "position_out_of_range",
            AppError::WatchSetup { .. } => "watch_setup_failure",
            AppError::EngineQuery(_) => "engine_query_failure",
            AppError::Embedding(_) => "embedding_error",
            AppError::VectorStore(_) => "vector_store_error",
            AppError::InvalidPath(_) => "invalid_path",
            AppError::Io(_) => "io_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn out_of_range(line: u32, character: u32, reason: impl Into<String>) -> Self {
        AppError::PositionOutOfRange {
            line,
            character,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {e}"))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Embedding(e.to_string())
    }
}

impl From<notify::Error> for AppError {
    fn from(e: notify::Error) -> Self {
        AppError::Internal(format!("Watcher error: {e}"))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Task failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            AppError::ProjectNotFound(PathBuf::from("/x")).code(),
            "project_not_found"
        );
        assert_eq!(
            AppError::FileNotTracked(PathBuf::from("/x")).code(),
            "file_not_tracked"
        );
        assert_eq!(
            AppError::out_of_range(3, 1, "past end").code(),
            "position_out_of_range"
        );
    }

    #[test]
    fn test_error_messages() {
        let err = AppError::out_of_range(10, 2, "file has 3 lines");
        assert_eq!(
            err.to_string(),
            "Position 10:2 is out of range: file has 3 lines"
        );

        let err = AppError::ConfigParse {
            path: PathBuf::from("/p/tsconfig.json"),
            message: "bad".into(),
        };
        assert!(err.to_string().contains("/p/tsconfig.json"));
    }
}
