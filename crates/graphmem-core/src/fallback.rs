//! # JSONL File Fallback
//!
//! Reads a newline-delimited JSON graph file into the same snapshot shape
//! a live `read_graph` call would produce. Each line is either
//! `{"type":"entity",...}` or `{"type":"relation",...}`.
//!
//! ## Degrade-gracefully policy
//!
//! A malformed line never fails a read: [`snapshot_from_records`] skips
//! bad records. This trades correctness for availability in local/offline
//! use. Callers needing to distinguish "empty graph" from "read failed"
//! inspect the per-line errors [`parse_jsonl`] reports.

use crate::types::{Entity, GraphError, GraphSnapshot, Relation};
use serde::Deserialize;

// =============================================================================
// LINE RECORDS
// =============================================================================

/// One JSONL line, discriminated by its `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonlRecord {
    Entity(Entity),
    Relation(Relation),
}

// =============================================================================
// PARSING
// =============================================================================

/// Parse JSONL content line by line, reporting malformed lines.
///
/// Blank lines are ignored. Line numbers are 1-based.
pub fn parse_jsonl(content: &str) -> Vec<Result<JsonlRecord, GraphError>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<JsonlRecord>(line.trim()).map_err(|e| {
                GraphError::MalformedRecord {
                    line: idx + 1,
                    reason: e.to_string(),
                }
            })
        })
        .collect()
}

/// Assemble parsed records into a snapshot, dropping malformed lines.
#[must_use]
pub fn snapshot_from_records(records: Vec<Result<JsonlRecord, GraphError>>) -> GraphSnapshot {
    let mut snapshot = GraphSnapshot::empty();
    for record in records.into_iter().flatten() {
        match record {
            JsonlRecord::Entity(entity) => snapshot.entities.push(entity),
            JsonlRecord::Relation(relation) => snapshot.relations.push(relation),
        }
    }
    snapshot
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    const SAMPLE: &str = concat!(
        r#"{"type":"entity","name":"Alice","entityType":"Person","observations":["likes graphs"]}"#,
        "\n",
        r#"{"type":"relation","from":"Alice","to":"Bob","relationType":"knows"}"#,
        "\n",
    );

    #[test]
    fn parses_entities_and_relations() {
        let records = parse_jsonl(SAMPLE);
        assert_eq!(records.len(), 2);
        let snapshot = snapshot_from_records(records);
        assert_eq!(snapshot.entities.len(), 1);
        assert_eq!(snapshot.relations.len(), 1);
        assert_eq!(snapshot.entities[0].name, "Alice");
        assert_eq!(snapshot.relations[0].relation_type, "knows");
    }

    #[test]
    fn blank_lines_are_ignored() {
        let content = format!("\n{SAMPLE}\n\n");
        let snapshot = snapshot_from_records(parse_jsonl(&content));
        assert_eq!(snapshot.entities.len(), 1);
        assert_eq!(snapshot.relations.len(), 1);
    }

    #[test]
    fn malformed_line_is_reported_with_line_number() {
        let content = format!("{SAMPLE}not json at all\n");
        let records = parse_jsonl(&content);
        assert_eq!(records.len(), 3);
        match &records[2] {
            Err(GraphError::MalformedRecord { line, .. }) => assert_eq!(*line, 3),
            other => panic!("expected malformed record, got {other:?}"),
        }
    }

    #[test]
    fn malformed_lines_are_skipped_in_snapshot() {
        let content = format!("garbage\n{SAMPLE}{{\"type\":\"unknown\"}}\n");
        let snapshot = snapshot_from_records(parse_jsonl(&content));
        assert_eq!(snapshot.entities.len(), 1);
        assert_eq!(snapshot.relations.len(), 1);
    }

}
