//! # Graph Sources
//!
//! The capability seam between the HTTP route layer and wherever the graph
//! actually lives. Two implementations exist and are selected once at
//! startup:
//!
//! - [`LiveSource`] — adapts the four logical read operations onto MCP
//!   tool calls over a transport.
//! - [`FileSource`] — parses the JSONL graph file directly, for
//!   local/offline use when no live service is configured or reachable.
//!
//! Route handlers only ever see the trait, which keeps them testable with
//! a fake source and keeps transport selection out of per-call code.

use super::McpError;
use super::protocol::LogicalTool;
use super::transport::{ConnectionState, McpTransport};
use async_trait::async_trait;
use graphmem_core::{
    Entity, GraphSnapshot, NodeRelations, Relation, parse_jsonl, snapshot_from_records,
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::Mutex;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors surfaced by a graph source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The named entity is absent from the graph.
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// The underlying MCP client failed.
    #[error(transparent)]
    Mcp(#[from] McpError),
}

// =============================================================================
// RESULT SHAPES
// =============================================================================

/// An entity together with every relation touching it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EntityDetails {
    pub entity: Entity,
    pub relations: Vec<Relation>,
}

/// Liveness probe result.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HealthInfo {
    pub entity_count: usize,
    pub relation_count: usize,
}

// =============================================================================
// GRAPH SOURCE TRAIT
// =============================================================================

/// Read operations over the knowledge graph.
#[async_trait]
pub trait GraphSource: Send + Sync {
    /// Full snapshot.
    async fn read_graph(&self) -> Result<GraphSnapshot, SourceError>;

    /// Snapshot filtered by substring search. An empty query
    /// short-circuits to an empty result without touching the backend.
    async fn search(&self, query: &str) -> Result<GraphSnapshot, SourceError>;

    /// One entity with all its relations, or `NotFound`.
    async fn get_entity(&self, name: &str) -> Result<EntityDetails, SourceError>;

    /// Directional relation view for one node.
    async fn get_relations(&self, name: &str) -> Result<NodeRelations, SourceError>;

    /// Liveness probe; an error here means the source is unhealthy.
    async fn health(&self) -> Result<HealthInfo, SourceError>;

    /// Whether a live MCP session is currently established.
    fn connected(&self) -> bool;

    /// Short label for health payloads and logs.
    fn label(&self) -> &'static str;

    /// Release any subordinate process or session. Called on shutdown.
    async fn shutdown(&self);
}

// =============================================================================
// LIVE SOURCE (MCP tool adapter)
// =============================================================================

/// Tool adapter over a single MCP transport.
///
/// The transport supports one outstanding call at a time, so concurrent
/// HTTP requests are serialized through a mutex here rather than each
/// holding their own session.
pub struct LiveSource {
    transport: Mutex<Box<dyn McpTransport>>,
    label: &'static str,
}

impl LiveSource {
    /// Wrap an already-connected transport.
    #[must_use]
    pub fn new(transport: Box<dyn McpTransport>) -> Self {
        let label = transport.label();
        Self {
            transport: Mutex::new(transport),
            label,
        }
    }

    async fn call(&self, tool: LogicalTool, args: serde_json::Value) -> Result<serde_json::Value, SourceError> {
        let mut transport = self.transport.lock().await;
        Ok(transport.call_tool(tool, args).await?)
    }

    async fn snapshot_call(
        &self,
        tool: LogicalTool,
        args: serde_json::Value,
    ) -> Result<GraphSnapshot, SourceError> {
        let value = self.call(tool, args).await?;
        serde_json::from_value(value)
            .map_err(|e| McpError::MalformedResult(format!("snapshot decode: {e}")).into())
    }
}

#[async_trait]
impl GraphSource for LiveSource {
    async fn read_graph(&self) -> Result<GraphSnapshot, SourceError> {
        self.snapshot_call(LogicalTool::ReadGraph, json!({})).await
    }

    async fn search(&self, query: &str) -> Result<GraphSnapshot, SourceError> {
        if query.is_empty() {
            return Ok(GraphSnapshot::empty());
        }
        self.snapshot_call(LogicalTool::SearchNodes, json!({ "query": query }))
            .await
    }

    async fn get_entity(&self, name: &str) -> Result<EntityDetails, SourceError> {
        let opened = self
            .snapshot_call(LogicalTool::OpenNodes, json!({ "names": [name] }))
            .await?;
        let entity = opened
            .entities
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::NotFound(name.to_string()))?;

        // Outgoing then incoming, concatenated; duplicates are preserved.
        let relations = self.get_relations(name).await?;
        let mut all = relations.outgoing;
        all.extend(relations.incoming);

        Ok(EntityDetails {
            entity,
            relations: all,
        })
    }

    async fn get_relations(&self, name: &str) -> Result<NodeRelations, SourceError> {
        let value = self
            .call(
                LogicalTool::GetNodeRelations,
                json!({ "node_name": name }),
            )
            .await?;
        serde_json::from_value(value)
            .map_err(|e| McpError::MalformedResult(format!("relations decode: {e}")).into())
    }

    async fn health(&self) -> Result<HealthInfo, SourceError> {
        let snapshot = self
            .snapshot_call(LogicalTool::HealthCheck, json!({}))
            .await?;
        Ok(HealthInfo {
            entity_count: snapshot.entities.len(),
            relation_count: snapshot.relations.len(),
        })
    }

    fn connected(&self) -> bool {
        // try_lock: a held lock means a call is in flight on a connected
        // session, which counts as connected.
        self.transport
            .try_lock()
            .map(|t| t.state() == ConnectionState::Connected)
            .unwrap_or(true)
    }

    fn label(&self) -> &'static str {
        self.label
    }

    async fn shutdown(&self) {
        let mut transport = self.transport.lock().await;
        transport.disconnect().await;
    }
}

// =============================================================================
// FILE SOURCE (JSONL fallback)
// =============================================================================

/// Direct JSONL file access, sharing the snapshot query logic with core.
///
/// Reads degrade gracefully: a missing or partly corrupt file yields an
/// empty (or partial) snapshot instead of an error.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn load(&self) -> GraphSnapshot {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => snapshot_from_records(parse_jsonl(&content)),
            Err(e) => {
                tracing::debug!(path = %self.path.display(), "memory file unreadable: {}", e);
                GraphSnapshot::empty()
            }
        }
    }
}

#[async_trait]
impl GraphSource for FileSource {
    async fn read_graph(&self) -> Result<GraphSnapshot, SourceError> {
        Ok(self.load().await)
    }

    async fn search(&self, query: &str) -> Result<GraphSnapshot, SourceError> {
        if query.is_empty() {
            return Ok(GraphSnapshot::empty());
        }
        Ok(self.load().await.search(query))
    }

    async fn get_entity(&self, name: &str) -> Result<EntityDetails, SourceError> {
        let snapshot = self.load().await;
        let entity = snapshot
            .require_entity(name)
            .map_err(|_| SourceError::NotFound(name.to_string()))?
            .clone();
        Ok(EntityDetails {
            relations: snapshot.relations_touching(name),
            entity,
        })
    }

    async fn get_relations(&self, name: &str) -> Result<NodeRelations, SourceError> {
        Ok(self.load().await.relations_for(name))
    }

    async fn health(&self) -> Result<HealthInfo, SourceError> {
        let snapshot = self.load().await;
        Ok(HealthInfo {
            entity_count: snapshot.entities.len(),
            relation_count: snapshot.relations.len(),
        })
    }

    fn connected(&self) -> bool {
        false
    }

    fn label(&self) -> &'static str {
        "file"
    }

    async fn shutdown(&self) {}
}

// =============================================================================
// TESTS
// =============================================================================
