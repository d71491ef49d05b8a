//! # GraphMem - Knowledge Graph Memory Server
//!
//! The main binary for the GraphMem HTTP facade.
//!
//! This application provides:
//! - HTTP REST API server (axum-based) over a knowledge graph
//! - MCP client (stdio and StreamableHTTP transports)
//! - JSONL memory-file fallback for offline operation
//! - CLI interface for local graph queries
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                   apps/graphmem (THE BINARY)                   │
//! │                                                                │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐    │
//! │  │   CLI       │    │   HTTP API  │    │   /mcp proxy     │    │
//! │  │  (clap)     │    │   (axum)    │    │  (passthrough)   │    │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘    │
//! │         │                  │                    │              │
//! │         └────────┬─────────┘                    │              │
//! │                  ▼                              ▼              │
//! │        ┌─────────────────┐          ┌────────────────────┐     │
//! │        │  GraphSource    │          │  MCP service       │     │
//! │        │ (live or file)  │─────────▶│ (stdio / http)     │     │
//! │        └────────┬────────┘          └────────────────────┘     │
//! │                 ▼                                              │
//! │        ┌─────────────────┐                                     │
//! │        │  graphmem-core  │                                     │
//! │        │  (THE MODEL)    │                                     │
//! │        └─────────────────┘                                     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Serve a live MCP service
//! GRAPHMEM_MCP_COMMAND="npx @modelcontextprotocol/server-memory" graphmem server
//!
//! # Serve a memory file directly
//! graphmem server --memory-file memory.json
//!
//! # Local queries
//! graphmem search alice
//! graphmem entity Alice
//! graphmem stats
//! ```

use clap::Parser;
use graphmem::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — GRAPHMEM_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("GRAPHMEM_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "graphmem=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
