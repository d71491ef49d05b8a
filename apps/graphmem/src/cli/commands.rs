//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! The offline commands (`search`, `entity`, `relations`, `stats`) always
//! read the JSONL memory file directly; only `server` and `call` ever
//! open a live MCP session.

use super::CliError;
use crate::api::{self, AppState, AuthGate};
use crate::mcp::{
    FileSource, GraphSource, HttpTransport, LiveSource, LogicalTool, McpError, McpTransport,
    StdioTransport,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// SOURCE SELECTION
// =============================================================================

/// Build a live transport from environment configuration, if any.
///
/// `GRAPHMEM_MCP_COMMAND` (a whitespace-split command line) selects the
/// stdio transport and wins over `GRAPHMEM_MCP_URL`, which selects the
/// StreamableHTTP transport.
fn live_transport_from_env() -> Result<Option<Box<dyn McpTransport>>, McpError> {
    if let Ok(command) = std::env::var("GRAPHMEM_MCP_COMMAND") {
        let argv: Vec<String> = command.split_whitespace().map(String::from).collect();
        if !argv.is_empty() {
            return Ok(Some(Box::new(StdioTransport::new(argv))));
        }
    }
    if let Ok(url) = std::env::var("GRAPHMEM_MCP_URL")
        && !url.is_empty()
    {
        return Ok(Some(Box::new(HttpTransport::new(url)?)));
    }
    Ok(None)
}

/// Pick the graph source for the server: a connected live session when
/// one is configured and reachable, the memory file otherwise.
async fn select_source(memory_file: &Path) -> Arc<dyn GraphSource> {
    match live_transport_from_env() {
        Ok(Some(mut transport)) => match transport.connect().await {
            Ok(()) => {
                tracing::info!(transport = transport.label(), "connected to MCP service");
                Arc::new(LiveSource::new(transport))
            }
            Err(e) => {
                tracing::warn!(
                    "MCP connection failed ({}); falling back to memory file {}",
                    e,
                    memory_file.display()
                );
                Arc::new(FileSource::new(memory_file.to_path_buf()))
            }
        },
        Ok(None) => {
            tracing::info!(
                path = %memory_file.display(),
                "no MCP service configured; serving from memory file"
            );
            Arc::new(FileSource::new(memory_file.to_path_buf()))
        }
        Err(e) => {
            tracing::warn!(
                "invalid MCP configuration ({}); falling back to memory file {}",
                e,
                memory_file.display()
            );
            Arc::new(FileSource::new(memory_file.to_path_buf()))
        }
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    memory_file: &Path,
    host: &str,
    port: u16,
    quiet: bool,
) -> Result<(), CliError> {
    let source = select_source(memory_file).await;
    let gate = Arc::new(AuthGate::from_env());
    let proxy_target = api::target_from_env();

    if !quiet {
        println!("GraphMem Knowledge Graph Server Starting...");
        println!();
        println!("Configuration:");
        println!("  Host:        {}", host);
        println!("  Port:        {}", port);
        println!("  Source:      {}", source.label());
        println!("  Memory file: {}", memory_file.display());
        println!("  Auth:        {}", if gate.enabled() { "enabled" } else { "disabled" });
        println!();
        println!("Endpoints:");
        println!("  GET /api/graph          - Full graph snapshot");
        println!("  GET /api/search?q=      - Search entities and relations");
        println!("  GET /api/entity?name=   - One entity with relations");
        println!("  GET /api/node-relations?name= - Directional relation view");
        println!("  GET /api/health         - Health check");
        println!("  ANY /mcp                - MCP passthrough");
        println!();
        println!("Press Ctrl+C to stop");
        println!();
    }

    let state = AppState::new(source, proxy_target);
    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, state, gate).await?;
    Ok(())
}

// =============================================================================
// OFFLINE COMMANDS
// =============================================================================

/// Search the memory file.
pub async fn cmd_search(memory_file: &Path, json_mode: bool, query: &str) -> Result<(), CliError> {
    let source = FileSource::new(memory_file.to_path_buf());
    let snapshot = source.search(query).await?;

    if json_mode {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!(
        "{} entities, {} relations matching \"{}\"",
        snapshot.entities.len(),
        snapshot.relations.len(),
        query
    );
    for entity in &snapshot.entities {
        println!("  {} ({})", entity.name, entity.entity_type);
    }
    for relation in &snapshot.relations {
        println!(
            "  {} --{}--> {}",
            relation.from, relation.relation_type, relation.to
        );
    }
    Ok(())
}

/// Show one entity with its relations.
pub async fn cmd_entity(memory_file: &Path, json_mode: bool, name: &str) -> Result<(), CliError> {
    let source = FileSource::new(memory_file.to_path_buf());
    let details = source.get_entity(name).await?;

    if json_mode {
        println!("{}", serde_json::to_string_pretty(&details)?);
        return Ok(());
    }

    println!("{} ({})", details.entity.name, details.entity.entity_type);
    for observation in &details.entity.observations {
        println!("  - {}", observation);
    }
    if !details.relations.is_empty() {
        println!("Relations:");
        for relation in &details.relations {
            println!(
                "  {} --{}--> {}",
                relation.from, relation.relation_type, relation.to
            );
        }
    }
    Ok(())
}

/// Show the directional relation view for a node.
pub async fn cmd_relations(
    memory_file: &Path,
    json_mode: bool,
    name: &str,
) -> Result<(), CliError> {
    let source = FileSource::new(memory_file.to_path_buf());
    let relations = source.get_relations(name).await?;

    if json_mode {
        println!("{}", serde_json::to_string_pretty(&relations)?);
        return Ok(());
    }

    println!("{}: {} relations", name, relations.total());
    for relation in &relations.outgoing {
        println!("  -> {} ({})", relation.to, relation.relation_type);
    }
    for relation in &relations.incoming {
        println!("  <- {} ({})", relation.from, relation.relation_type);
    }
    if !relations.connected_entities.is_empty() {
        println!("Connected: {}", relations.connected_entities.join(", "));
    }
    Ok(())
}

/// Show entity/relation counts with a per-type breakdown.
pub async fn cmd_stats(memory_file: &Path, json_mode: bool) -> Result<(), CliError> {
    let source = FileSource::new(memory_file.to_path_buf());
    let snapshot = source.read_graph().await?;

    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for entity in &snapshot.entities {
        *by_type.entry(entity.entity_type.as_str()).or_insert(0) += 1;
    }

    if json_mode {
        let stats = serde_json::json!({
            "entity_count": snapshot.entities.len(),
            "relation_count": snapshot.relations.len(),
            "entity_types": by_type,
        });
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Memory file: {}", memory_file.display());
    println!("  Entities:  {}", snapshot.entities.len());
    println!("  Relations: {}", snapshot.relations.len());
    if !by_type.is_empty() {
        println!("Entity types:");
        for (entity_type, count) in &by_type {
            println!("  {:<20} {}", entity_type, count);
        }
    }
    Ok(())
}

// =============================================================================
// CALL COMMAND
// =============================================================================

/// Invoke an MCP tool against the configured live service.
///
/// Unlike the server, this command does not fall back to the memory
/// file: an unreachable service is a hard error here.
pub async fn cmd_call(tool: &str, args: &str) -> Result<(), CliError> {
    let tool = LogicalTool::parse(tool)
        .ok_or_else(|| CliError::InvalidArgument(format!("unknown tool: {tool}")))?;
    let args: serde_json::Value = serde_json::from_str(args)?;

    let Some(mut transport) = live_transport_from_env()? else {
        return Err(CliError::InvalidArgument(
            "no MCP service configured; set GRAPHMEM_MCP_COMMAND or GRAPHMEM_MCP_URL".to_string(),
        ));
    };

    transport.connect().await?;
    let result = transport.call_tool(tool, args).await;
    transport.disconnect().await;

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}
