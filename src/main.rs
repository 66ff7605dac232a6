use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use code_intel_mcp::config::{AppConfig, AppState};
use code_intel_mcp::embedding::ProviderKind;
use code_intel_mcp::server::CodeIntelServer;
use code_intel_mcp::storage::StoreKind;

#[derive(Parser)]
#[command(name = "code-intel-mcp")]
#[command(about = "MCP server for structural and semantic code intelligence")]
struct Cli {
    /// Workspace root to discover projects under.
    #[arg(env = "WORKSPACE_ROOT", default_value = ".")]
    workspace: PathBuf,

    #[arg(long, env, default_value = "auto")]
    embedding_provider: ProviderKind,

    #[arg(long, env, default_value = "memory")]
    vector_store: StoreKind,

    #[arg(long, env, default_value = "http://localhost:8000")]
    chroma_url: String,

    #[arg(long, env, default_value = "default_tenant")]
    chroma_tenant: String,

    #[arg(long, env, default_value = "default_database")]
    chroma_database: String,

    #[arg(long, env = "CHROMA_COLLECTION", default_value = "codebase_index")]
    collection: String,

    #[arg(long, env, default_value = "1000")]
    cache_size: usize,

    #[arg(long, env, default_value = "512")]
    snapshot_cache_size: usize,

    /// Projects beyond this many are served but not watched.
    #[arg(long, env, default_value = "64")]
    max_watched_projects: usize,

    #[arg(long, env = "TIMEOUT_MS", default_value = "30000")]
    timeout: u64,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(&cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig {
        workspace: cli.workspace,
        embedding_provider: cli.embedding_provider,
        vector_store: cli.vector_store,
        chroma_url: cli.chroma_url,
        chroma_tenant: cli.chroma_tenant,
        chroma_database: cli.chroma_database,
        collection: cli.collection,
        cache_size: cli.cache_size,
        snapshot_cache_size: cli.snapshot_cache_size,
        max_watched_projects: cli.max_watched_projects,
        timeout_ms: cli.timeout,
        log_level: cli.log_level,
        watch: !cli.no_watch,
    };

    let state = Arc::new(AppState::new(config)?);
    tracing::info!(
        workspace = %state.structural.workspace().display(),
        provider = %state.embedding.kind(),
        store = state.indexer.store().name(),
        "Starting headless codebase indexer"
    );

    let report = state.structural.initialize().await?;
    tracing::info!(
        projects = report.projects,
        files = report.tracked_files,
        "Structural engine initialized"
    );

    let server = CodeIntelServer::new(state.clone());
    let transport = rmcp::transport::io::stdio();
    let service = rmcp::service::serve_server(server, transport).await?;

    tracing::info!("Server started, waiting for signals...");

    #[cfg(unix)]
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    let shutdown_reason: &str;

    tokio::select! {
        res = service.waiting() => {
            match res {
                Err(e) => {
                    tracing::error!("Server error: {}", e);
                    shutdown_reason = "server_error";
                }
                Ok(_) => shutdown_reason = "connection_closed",
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down gracefully... (SIGINT)");
            shutdown_reason = "sigint";
        },
        _ = async {
            #[cfg(unix)]
            {
                terminate.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            tracing::info!("Shutting down gracefully... (SIGTERM)");
            shutdown_reason = "sigterm";
        }
    }

    tracing::info!(reason = shutdown_reason, "Initiating graceful shutdown...");

    tracing::info!("Stopping file watchers...");
    state.structural.shutdown();

    tracing::info!("Shutdown complete");
    Ok(())
}
