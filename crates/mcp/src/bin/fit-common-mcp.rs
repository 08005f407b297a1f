// Standalone MCP server binary

use anyhow::Result;
use clap::Parser;
use fit_common_core::DocumentRouter;
use fit_common_mcp::config::{ConfigOverrides, ServerConfig};
use fit_common_mcp::protocol::ServerInfo;
use fit_common_mcp::server::McpServer;
use fit_common_mcp::tools::ToolRegistry;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "fit-common-mcp")]
#[command(about = "Serves fit skill and project docs to MCP clients over stdio", long_about = None)]
struct Args {
    /// Root of the document tree (skills/, docs/, <app>/)
    #[arg(long, env = "DOCS_PATH")]
    docs_path: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, env = "FIT_COMMON_CONFIG", default_value = "fit-common.toml")]
    config: PathBuf,

    /// Maximum size of one JSON-RPC message in bytes
    #[arg(long)]
    max_line_length: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();

    let args = Args::parse();

    tracing::info!("fit-common MCP server starting...");

    let config = ServerConfig::load(
        &args.config,
        ConfigOverrides {
            docs_path: args.docs_path,
            max_line_length: args.max_line_length,
        },
    )?;
    tracing::info!("Document root: {}", config.docs_root.display());

    let router = Arc::new(DocumentRouter::new(config.docs_root.clone()));
    let registry = ToolRegistry::with_document_tools(router);

    tracing::info!("Registered {} tools", registry.len());

    let server = McpServer::new(registry, ServerInfo::default())
        .with_max_line_length(config.max_line_length);
    server.start().await?;

    Ok(())
}
