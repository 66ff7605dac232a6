use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SemanticSearchParams {
    /// The natural language query describing the code you are looking for.
    pub query: String,
    /// Number of top results to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PositionParams {
    /// Absolute path to the TypeScript file
    pub file_path: String,
    /// 1-indexed line number of the symbol
    pub line: u32,
    /// 1-indexed character position on the line
    pub character: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileParams {
    /// Absolute path to the TypeScript file
    pub file_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndexCodebaseParams {
    /// Optional path to index. Defaults to the starting target directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_are_camel_case() {
        let p: PositionParams = serde_json::from_value(serde_json::json!({
            "filePath": "/p/a.ts",
            "line": 3,
            "character": 7
        }))
        .unwrap();
        assert_eq!(p.file_path, "/p/a.ts");
        assert_eq!((p.line, p.character), (3, 7));

        let p: IndexCodebaseParams = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(p.dir_path.is_none());

        let p: SemanticSearchParams =
            serde_json::from_value(serde_json::json!({ "query": "auth" })).unwrap();
        assert!(p.limit.is_none());
    }
}
