//! # Snapshot Types
//!
//! The wire-level data model shared with the external MCP memory service,
//! plus the pure query operations over a full graph snapshot.
//!
//! Field names follow the upstream JSON contract (`entityType`,
//! `relationType`), so a snapshot serialized here is byte-compatible with
//! what the memory service returns from a `read_graph` call.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors produced by snapshot-level operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// The named entity is absent from the snapshot.
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// A JSONL record could not be decoded.
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
}

// =============================================================================
// ENTITY
// =============================================================================

/// A named, typed node in the knowledge graph with free-text observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique name within a graph snapshot.
    pub name: String,
    /// Free-form type label.
    #[serde(rename = "entityType")]
    pub entity_type: String,
    /// Ordered free-text observations attached to this entity.
    #[serde(default)]
    pub observations: Vec<String>,
}

impl Entity {
    /// Create an entity with no observations.
    #[must_use]
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            observations: Vec::new(),
        }
    }

    /// Case-insensitive substring match against name, type, and observations.
    #[must_use]
    pub fn matches(&self, needle_lower: &str) -> bool {
        self.name.to_lowercase().contains(needle_lower)
            || self.entity_type.to_lowercase().contains(needle_lower)
            || self
                .observations
                .iter()
                .any(|obs| obs.to_lowercase().contains(needle_lower))
    }
}

// =============================================================================
// RELATION
// =============================================================================

/// A directed, typed edge between two entities by name.
///
/// Endpoints are name references, not enforced foreign keys: a relation may
/// mention an entity that is absent from the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Source entity name.
    pub from: String,
    /// Target entity name.
    pub to: String,
    /// Free-form edge label.
    #[serde(rename = "relationType")]
    pub relation_type: String,
}

impl Relation {
    /// Create a relation between two named entities.
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            relation_type: relation_type.into(),
        }
    }

    /// Whether this relation starts or ends at `name` (exact match).
    #[must_use]
    pub fn touches(&self, name: &str) -> bool {
        self.from == name || self.to == name
    }

    /// Case-insensitive substring match against endpoints and edge label.
    #[must_use]
    pub fn matches(&self, needle_lower: &str) -> bool {
        self.from.to_lowercase().contains(needle_lower)
            || self.to.to_lowercase().contains(needle_lower)
            || self.relation_type.to_lowercase().contains(needle_lower)
    }
}

// =============================================================================
// GRAPH SNAPSHOT
// =============================================================================

/// A full, unversioned read of all entities and relations at one instant.
///
/// There are no deltas and no timestamps; every read from the memory
/// service (or the file fallback) materializes the whole graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl GraphSnapshot {
    /// An empty snapshot.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the snapshot holds no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }

    /// Filter the snapshot by case-insensitive substring search.
    ///
    /// Entities match on name, type, or observation text. Relations match
    /// on their own endpoints/label, or transitively because they touch a
    /// matched entity. This is the canonical search contract; the upstream
    /// `search_nodes` tool implements the same semantics when live.
    #[must_use]
    pub fn search(&self, query: &str) -> Self {
        let needle = query.to_lowercase();

        let entities: Vec<Entity> = self
            .entities
            .iter()
            .filter(|e| e.matches(&needle))
            .cloned()
            .collect();

        let matched_names: BTreeSet<&str> = entities.iter().map(|e| e.name.as_str()).collect();

        let relations: Vec<Relation> = self
            .relations
            .iter()
            .filter(|r| {
                r.matches(&needle)
                    || matched_names.contains(r.from.as_str())
                    || matched_names.contains(r.to.as_str())
            })
            .cloned()
            .collect();

        Self {
            entities,
            relations,
        }
    }

    /// Look up an entity by exact name.
    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Like [`GraphSnapshot::entity`], but absence is an error.
    pub fn require_entity(&self, name: &str) -> Result<&Entity, GraphError> {
        self.entity(name)
            .ok_or_else(|| GraphError::EntityNotFound(name.to_string()))
    }

    /// All relations touching `name`, in snapshot order.
    #[must_use]
    pub fn relations_touching(&self, name: &str) -> Vec<Relation> {
        self.relations
            .iter()
            .filter(|r| r.touches(name))
            .cloned()
            .collect()
    }

    /// Directional relation view for one node.
    #[must_use]
    pub fn relations_for(&self, name: &str) -> NodeRelations {
        let outgoing: Vec<Relation> = self
            .relations
            .iter()
            .filter(|r| r.from == name)
            .cloned()
            .collect();
        let incoming: Vec<Relation> = self
            .relations
            .iter()
            .filter(|r| r.to == name)
            .cloned()
            .collect();

        // BTreeSet gives deduplication and a stable sorted order.
        let connected: BTreeSet<String> = outgoing
            .iter()
            .map(|r| r.to.clone())
            .chain(incoming.iter().map(|r| r.from.clone()))
            .collect();

        NodeRelations {
            outgoing,
            incoming,
            connected_entities: connected.into_iter().collect(),
        }
    }
}

// =============================================================================
// NODE RELATIONS
// =============================================================================

/// Outgoing/incoming edges of one node plus its deduplicated neighbors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRelations {
    #[serde(default)]
    pub outgoing: Vec<Relation>,
    #[serde(default)]
    pub incoming: Vec<Relation>,
    /// Sorted, deduplicated names of entities adjacent to the node.
    #[serde(default)]
    pub connected_entities: Vec<String>,
}

impl NodeRelations {
    /// Total number of edges touching the node.
    #[must_use]
    pub fn total(&self) -> usize {
        self.outgoing.len() + self.incoming.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> GraphSnapshot {
        GraphSnapshot {
            entities: vec![
                Entity {
                    name: "Alice".into(),
                    entity_type: "Person".into(),
                    observations: vec!["Works on compilers".into()],
                },
                Entity {
                    name: "Acme Corp".into(),
                    entity_type: "Company".into(),
                    observations: vec![],
                },
            ],
            relations: vec![
                Relation::new("Alice", "Bob", "knows"),
                Relation::new("Alice", "Acme Corp", "works_at"),
                Relation::new("Carol", "Dave", "manages"),
            ],
        }
    }

    #[test]
    fn entity_wire_names_roundtrip() {
        let entity = Entity {
            name: "Alice".into(),
            entity_type: "Person".into(),
            observations: vec!["obs".into()],
        };
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["entityType"], "Person");

        let relation = Relation::new("Alice", "Bob", "knows");
        let json = serde_json::to_value(&relation).unwrap();
        assert_eq!(json["relationType"], "knows");
        assert_eq!(json["from"], "Alice");
    }

    #[test]
    fn search_is_case_insensitive() {
        let snapshot = sample();
        let result = snapshot.search("alice");
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.entities[0].name, "Alice");
    }

    #[test]
    fn search_matches_observations() {
        let snapshot = sample();
        let result = snapshot.search("compilers");
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.entities[0].name, "Alice");
    }

    #[test]
    fn search_includes_relations_touching_matched_entities() {
        let snapshot = sample();
        let result = snapshot.search("alice");
        // Both Alice relations come along; Carol→Dave does not.
        assert_eq!(result.relations.len(), 2);
        assert!(result.relations.iter().all(|r| r.from == "Alice"));
    }

    #[test]
    fn search_matches_relation_label_without_entity_match() {
        let snapshot = sample();
        let result = snapshot.search("manages");
        assert!(result.entities.is_empty());
        assert_eq!(result.relations.len(), 1);
        assert_eq!(result.relations[0].from, "Carol");
    }

    #[test]
    fn search_no_match_is_empty() {
        let snapshot = sample();
        let result = snapshot.search("zzz-not-here");
        assert!(result.is_empty());
    }

    #[test]
    fn entity_lookup_is_exact() {
        let snapshot = sample();
        assert!(snapshot.entity("Alice").is_some());
        assert!(snapshot.entity("alice").is_none());
        assert!(snapshot.entity("Carol").is_none());
        assert_eq!(
            snapshot.require_entity("Carol"),
            Err(GraphError::EntityNotFound("Carol".into()))
        );
    }

    #[test]
    fn relations_for_splits_directions() {
        let mut snapshot = sample();
        snapshot.relations.push(Relation::new("Bob", "Alice", "knows"));

        let rels = snapshot.relations_for("Alice");
        assert_eq!(rels.outgoing.len(), 2);
        assert_eq!(rels.incoming.len(), 1);
        assert_eq!(rels.total(), 3);
        // Sorted and deduplicated: Bob appears once even though he is both
        // a target and a source.
        assert_eq!(rels.connected_entities, vec!["Acme Corp", "Bob"]);
    }

    #[test]
    fn relations_for_unknown_node_is_empty() {
        let snapshot = sample();
        let rels = snapshot.relations_for("Nobody");
        assert_eq!(rels.total(), 0);
        assert!(rels.connected_entities.is_empty());
    }

    #[test]
    fn duplicate_relations_are_preserved() {
        let mut snapshot = sample();
        snapshot.relations.push(Relation::new("Alice", "Bob", "knows"));

        let rels = snapshot.relations_for("Alice");
        // Edges are not collapsed; only the neighbor list deduplicates.
        assert_eq!(rels.outgoing.len(), 3);
        assert_eq!(
            rels.connected_entities
                .iter()
                .filter(|n| *n == "Bob")
                .count(),
            1
        );
    }
}
