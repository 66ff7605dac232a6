use std::sync::Arc;

use rmcp::{
    handler::server::{
        tool::ToolCallContext, tool::ToolRouter, wrapper::Parameters, ServerHandler,
    },
    model::*,
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::config::AppState;

use super::logic::{self, error_response};
use super::params::{FileParams, IndexCodebaseParams, PositionParams, SemanticSearchParams};

#[derive(Clone)]
pub struct CodeIntelServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

/// Turns a logic-layer failure into an error payload instead of a protocol error.
fn respond(outcome: crate::Result<CallToolResult>) -> Result<CallToolResult, ErrorData> {
    Ok(outcome.unwrap_or_else(|e| error_response(&e)))
}

#[tool_router]
impl CodeIntelServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Search the codebase for code snippets based on semantic meaning or natural language description."
    )]
    async fn semantic_search(
        &self,
        params: Parameters<SemanticSearchParams>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(logic::semantic::semantic_search(&self.state, params.0).await)
    }

    #[tool(description = "Get the location where a symbol is defined, using strict TypeScript analysis.")]
    async fn get_definition(
        &self,
        params: Parameters<PositionParams>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(logic::structural::get_definition(&self.state, params.0).await)
    }

    #[tool(description = "Find all usages/references of a symbol across the entire TypeScript project.")]
    async fn get_references(
        &self,
        params: Parameters<PositionParams>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(logic::structural::get_references(&self.state, params.0).await)
    }

    #[tool(description = "Get the AST outline of a file (classes, functions, interfaces, constants).")]
    async fn get_file_structure(
        &self,
        params: Parameters<FileParams>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(logic::structural::get_file_structure(&self.state, params.0).await)
    }

    #[tool(
        description = "Recursively index the entire codebase directory for semantic search. Do this if semantic_search is returning empty or missing results."
    )]
    async fn index_codebase(
        &self,
        params: Parameters<IndexCodebaseParams>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(logic::semantic::index_codebase(&self.state, params.0).await)
    }
}

impl ServerHandler for CodeIntelServer {
    fn get_info(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
                ..ServerCapabilities::default()
            },
            server_info: Implementation {
                name: "headless-codebase-indexer".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
                description: None,
            },
            instructions: Some(
                "Structural navigation (definitions, references, outlines) and semantic search for TypeScript/JavaScript workspaces."
                    .into(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tool_router.list_all()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let tool_context = ToolCallContext::new(self, request, context);
        self.tool_router.call(tool_context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestContext;

    #[tokio::test]
    async fn test_exposes_five_tools() {
        let ctx = TestContext::new(&[]).await;
        let server = CodeIntelServer::new(ctx.state.clone());

        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "get_definition",
                "get_file_structure",
                "get_references",
                "index_codebase",
                "semantic_search"
            ]
        );
        assert_eq!(server.get_info().server_info.name, "headless-codebase-indexer");
    }

    #[test]
    fn test_respond_maps_failures_to_payloads() {
        let result = respond(Err(crate::AppError::Internal("boom".into()))).unwrap();
        assert_eq!(result.is_error, Some(true));
    }
}
