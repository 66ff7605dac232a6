use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    Tsx,
    JavaScript,
    #[default]
    Unknown,
}

impl Language {
    pub fn is_javascript(self) -> bool {
        self == Language::JavaScript
    }
}

/// A fixed-size slice of a source file prepared for embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeChunk {
    pub id: String,
    pub source: String,
    pub chunk_index: usize,
    pub content: String,
    pub start_line: u32,
    pub end_line: u32,
}

impl CodeChunk {
    pub fn metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "source": self.source,
            "chunkIndex": self.chunk_index,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCodeChunk {
    pub id: String,
    pub document: String,
    pub metadata: serde_json::Value,
    /// Cosine distance (0 = identical), as reported by the vector store.
    pub distance: f32,
}
