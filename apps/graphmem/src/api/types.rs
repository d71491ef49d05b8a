//! # API Request/Response Types
//!
//! JSON shapes for the HTTP API. Snapshot-shaped endpoints (`/api/graph`,
//! `/api/search`) serialize [`graphmem_core::GraphSnapshot`] directly; the
//! types here cover everything else.

use graphmem_core::{Entity, NodeRelations, Relation};
use serde::{Deserialize, Serialize};

// =============================================================================
// QUERY PARAMETERS
// =============================================================================

/// `?q=` for search endpoints.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// `?name=` for entity-scoped endpoints.
#[derive(Debug, Deserialize)]
pub struct NameParams {
    pub name: Option<String>,
}

// =============================================================================
// ENTITY RESPONSE
// =============================================================================

/// One entity with every relation touching it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityResponse {
    pub entity: Entity,
    pub relations: Vec<Relation>,
}

// =============================================================================
// NODE RELATIONS RESPONSE
// =============================================================================

/// Directional relation view for one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRelationsResponse {
    pub entity_name: String,
    pub outgoing_relations: Vec<Relation>,
    pub incoming_relations: Vec<Relation>,
    pub connected_entities: Vec<String>,
    pub total_relations: usize,
}

impl NodeRelationsResponse {
    #[must_use]
    pub fn from_relations(name: &str, relations: NodeRelations) -> Self {
        let total = relations.total();
        Self {
            entity_name: name.to_string(),
            outgoing_relations: relations.outgoing,
            incoming_relations: relations.incoming,
            connected_entities: relations.connected_entities,
            total_relations: total,
        }
    }
}

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Capabilities advertised in the health payload.
const FEATURES: &[&str] = &["search", "entity", "node-relations", "mcp-proxy"];

/// Route inventory advertised in the health payload.
const ENDPOINTS: &[&str] = &[
    "/api/graph",
    "/api/search",
    "/api/entity",
    "/api/node-relations",
    "/api/health",
    "/mcp",
];

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    /// Which backend is serving reads: "mcp-stdio", "mcp-http", or "file".
    pub source: String,
    pub mcp_connected: bool,
    pub entity_count: usize,
    pub relation_count: usize,
    pub features: Vec<String>,
    pub endpoints: Vec<String>,
}

impl HealthResponse {
    fn base(status: &str, source: &str) -> Self {
        Self {
            status: status.to_string(),
            service: "graphmem".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            source: source.to_string(),
            mcp_connected: false,
            entity_count: 0,
            relation_count: 0,
            features: FEATURES.iter().map(ToString::to_string).collect(),
            endpoints: ENDPOINTS.iter().map(ToString::to_string).collect(),
        }
    }

    #[must_use]
    pub fn healthy(source: &str, connected: bool, entities: usize, relations: usize) -> Self {
        Self {
            mcp_connected: connected,
            entity_count: entities,
            relation_count: relations,
            ..Self::base("ok", source)
        }
    }

    #[must_use]
    pub fn degraded(source: &str) -> Self {
        Self::base("degraded", source)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use graphmem_core::Relation;

    #[test]
    fn test_node_relations_response_shape() {
        let relations = NodeRelations {
            outgoing: vec![Relation::new("Alice", "Bob", "knows")],
            incoming: vec![Relation::new("Carol", "Alice", "manages")],
            connected_entities: vec!["Bob".to_string(), "Carol".to_string()],
        };
        let response = NodeRelationsResponse::from_relations("Alice", relations);

        assert_eq!(response.entity_name, "Alice");
        assert_eq!(response.total_relations, 2);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("outgoing_relations").is_some());
        assert!(json.get("incoming_relations").is_some());
        // Relations keep their upstream wire field name.
        assert_eq!(
            json["outgoing_relations"][0]["relationType"],
            serde_json::json!("knows")
        );
    }

    #[test]
    fn test_health_response_states() {
        let ok = HealthResponse::healthy("file", false, 3, 2);
        assert_eq!(ok.status, "ok");
        assert_eq!(ok.entity_count, 3);
        assert!(ok.features.contains(&"mcp-proxy".to_string()));
        assert!(ok.endpoints.contains(&"/api/health".to_string()));

        let bad = HealthResponse::degraded("mcp-stdio");
        assert_eq!(bad.status, "degraded");
        assert!(!bad.mcp_connected);
    }
}
