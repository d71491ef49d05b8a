//! # GraphMem CLI Module
//!
//! This module implements the CLI interface for GraphMem.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP API server
//! - `search` - Search the memory file for entities and relations
//! - `entity` - Show one entity with its relations
//! - `relations` - Show the directional relation view for a node
//! - `stats` - Show entity/relation counts
//! - `call` - Invoke an MCP tool against the configured live service

mod commands;

use crate::mcp::{McpError, SourceError};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

pub use commands::*;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Mcp(#[from] McpError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidArgument(String),
}

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// GraphMem - HTTP facade over an MCP knowledge-graph memory service
///
/// Serves REST reads from a live MCP session when one is configured,
/// or directly from a JSONL memory file otherwise.
#[derive(Parser, Debug)]
#[command(name = "graphmem")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the JSONL memory file used when no MCP service is configured
    #[arg(short = 'm', long, global = true, default_value = "memory.json")]
    pub memory_file: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Search the memory file
    Search {
        /// Substring to match against entities and relations
        query: String,
    },

    /// Show one entity with its relations
    Entity {
        /// Entity name (exact match)
        name: String,
    },

    /// Show outgoing/incoming relations for a node
    Relations {
        /// Node name
        name: String,
    },

    /// Show entity and relation counts
    Stats,

    /// Invoke an MCP tool against the configured live service
    Call {
        /// Tool name (read_graph, search_nodes, open_nodes, get_node_relations)
        tool: String,

        /// JSON arguments for the tool
        #[arg(default_value = "{}")]
        args: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), CliError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            cmd_server(&cli.memory_file, &host, port, cli.quiet).await
        }
        Some(Commands::Search { query }) => cmd_search(&cli.memory_file, json_mode, &query).await,
        Some(Commands::Entity { name }) => cmd_entity(&cli.memory_file, json_mode, &name).await,
        Some(Commands::Relations { name }) => {
            cmd_relations(&cli.memory_file, json_mode, &name).await
        }
        Some(Commands::Call { tool, args }) => cmd_call(&tool, &args).await,
        Some(Commands::Stats) | None => {
            // No subcommand - show stats by default
            cmd_stats(&cli.memory_file, json_mode).await
        }
    }
}
