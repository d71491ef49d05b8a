//! # graphmem-core
//!
//! The knowledge-graph snapshot model for graphmem - THE MODEL.
//!
//! This crate defines the entity/relation wire types exchanged with the
//! external MCP memory service, the pure query operations over a full
//! graph snapshot (search, entity lookup, relation views), and the JSONL
//! file-fallback reader used when no live service is reachable.
//!
//! ## Architectural Constraints
//!
//! The MODEL:
//! - Holds no state of its own; every read is a full snapshot
//! - Has NO async, NO network dependencies (pure Rust)
//! - Produces deterministic output (sorted neighbor lists, stable order)
//! - Never invents data: graph storage and indexing belong to the
//!   external memory service

// =============================================================================
// MODULES
// =============================================================================

pub mod fallback;
pub mod types;

// =============================================================================
// RE-EXPORTS: Snapshot Model (from types module)
// =============================================================================

pub use types::{Entity, GraphError, GraphSnapshot, NodeRelations, Relation};

// =============================================================================
// RE-EXPORTS: File Fallback (from fallback module)
// =============================================================================

pub use fallback::{parse_jsonl, snapshot_from_records};
