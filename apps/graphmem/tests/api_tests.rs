//! Integration tests for the GraphMem HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.
//! Auth is configured through `AuthGate::new` rather than env vars, so
//! tests run in parallel without coordination.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use graphmem::api::{
    AppState, AuthGate, HealthResponse, NodeRelationsResponse, Permission, create_router,
};
use graphmem::mcp::{
    EntityDetails, FileSource, GraphSource, HealthInfo, McpError, SourceError,
};
use graphmem_core::{GraphSnapshot, NodeRelations};
use std::io::Write;
use std::sync::Arc;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Memory file with Alice, Bob, and one relation between them.
fn populated_memory_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{"type":"entity","name":"Alice","entityType":"Person","observations":["Works on the graph service"]}}"#
    )
    .unwrap();
    writeln!(
        file,
        r#"{{"type":"entity","name":"Bob","entityType":"Person","observations":[]}}"#
    )
    .unwrap();
    writeln!(
        file,
        r#"{{"type":"relation","from":"Alice","to":"Bob","relationType":"manages"}}"#
    )
    .unwrap();
    file.flush().unwrap();
    file
}

fn open_gate() -> Arc<AuthGate> {
    Arc::new(AuthGate::new(false, vec![]))
}

fn keyed_gate() -> Arc<AuthGate> {
    Arc::new(AuthGate::new(
        true,
        vec![
            (
                "reader-key".to_string(),
                "reader".to_string(),
                vec![Permission::Read],
            ),
            (
                "writer-key".to_string(),
                "writer".to_string(),
                vec![Permission::Write],
            ),
            (
                "admin-key".to_string(),
                "root".to_string(),
                vec![Permission::Admin],
            ),
        ],
    ))
}

/// Test server over the populated memory file, no auth.
/// The temp file guard must be kept alive during the test.
fn create_test_server() -> (TestServer, tempfile::NamedTempFile) {
    let file = populated_memory_file();
    let source = Arc::new(FileSource::new(file.path().to_path_buf()));
    let state = AppState::new(source, None);
    let server = TestServer::new(create_router(state, open_gate())).unwrap();
    (server, file)
}

/// Same data, but every request must carry a key.
fn create_authed_test_server() -> (TestServer, tempfile::NamedTempFile) {
    let file = populated_memory_file();
    let source = Arc::new(FileSource::new(file.path().to_path_buf()));
    let state = AppState::new(source, None);
    let server = TestServer::new(create_router(state, keyed_gate())).unwrap();
    (server, file)
}

// =============================================================================
// GRAPH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_graph_returns_full_snapshot() {
    let (server, _file) = create_test_server();

    let response = server.get("/api/graph").await;

    response.assert_status_ok();
    let snapshot: GraphSnapshot = response.json();
    assert_eq!(snapshot.entities.len(), 2);
    assert_eq!(snapshot.relations.len(), 1);
    assert_eq!(snapshot.relations[0].relation_type, "manages");
}

#[tokio::test]
async fn test_graph_missing_file_is_empty_not_error() {
    let source = Arc::new(FileSource::new("/nonexistent/memory.json".into()));
    let state = AppState::new(source, None);
    let server = TestServer::new(create_router(state, open_gate())).unwrap();

    let response = server.get("/api/graph").await;

    response.assert_status_ok();
    let snapshot: GraphSnapshot = response.json();
    assert!(snapshot.is_empty());
}

// =============================================================================
// SEARCH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_search_matches_entities_and_their_relations() {
    let (server, _file) = create_test_server();

    let response = server.get("/api/search").add_query_param("q", "alice").await;

    response.assert_status_ok();
    let snapshot: GraphSnapshot = response.json();
    assert_eq!(snapshot.entities.len(), 1);
    assert_eq!(snapshot.entities[0].name, "Alice");
    // The Alice->Bob relation rides along with the matched entity.
    assert_eq!(snapshot.relations.len(), 1);
}

#[tokio::test]
async fn test_search_matches_observations() {
    let (server, _file) = create_test_server();

    let response = server
        .get("/api/search")
        .add_query_param("q", "graph service")
        .await;

    response.assert_status_ok();
    let snapshot: GraphSnapshot = response.json();
    assert_eq!(snapshot.entities.len(), 1);
    assert_eq!(snapshot.entities[0].name, "Alice");
}

#[tokio::test]
async fn test_search_empty_query_returns_empty_snapshot() {
    let (server, _file) = create_test_server();

    let response = server.get("/api/search").add_query_param("q", "").await;

    response.assert_status_ok();
    let snapshot: GraphSnapshot = response.json();
    assert!(snapshot.is_empty());
}

#[tokio::test]
async fn test_search_missing_query_is_treated_as_empty() {
    let (server, _file) = create_test_server();

    let response = server.get("/api/search").await;

    response.assert_status_ok();
    let snapshot: GraphSnapshot = response.json();
    assert!(snapshot.is_empty());
}

// =============================================================================
// ENTITY ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_entity_found_with_relations() {
    let (server, _file) = create_test_server();

    let response = server.get("/api/entity").add_query_param("name", "Alice").await;

    response.assert_status_ok();
    let details: EntityDetails = response.json();
    assert_eq!(details.entity.entity_type, "Person");
    assert_eq!(details.relations.len(), 1);
    assert_eq!(details.relations[0].to, "Bob");
}

#[tokio::test]
async fn test_entity_lookup_is_exact_match() {
    let (server, _file) = create_test_server();

    // Search is case-insensitive, but entity lookup is not.
    let response = server.get("/api/entity").add_query_param("name", "alice").await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_entity_unknown_is_not_found() {
    let (server, _file) = create_test_server();

    let response = server.get("/api/entity").add_query_param("name", "Carol").await;

    response.assert_status_not_found();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_entity_missing_name_is_bad_request() {
    let (server, _file) = create_test_server();

    let response = server.get("/api/entity").await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_entity_empty_name_is_bad_request() {
    let (server, _file) = create_test_server();

    let response = server.get("/api/entity").add_query_param("name", "").await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "missing_parameter");
}

// =============================================================================
// NODE RELATIONS ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_node_relations_direction_split() {
    let (server, _file) = create_test_server();

    let response = server
        .get("/api/node-relations")
        .add_query_param("name", "Bob")
        .await;

    response.assert_status_ok();
    let view: NodeRelationsResponse = response.json();
    assert_eq!(view.entity_name, "Bob");
    assert!(view.outgoing_relations.is_empty());
    assert_eq!(view.incoming_relations.len(), 1);
    assert_eq!(view.connected_entities, vec!["Alice"]);
    assert_eq!(view.total_relations, 1);
}

#[tokio::test]
async fn test_node_relations_unknown_node_is_empty_view() {
    let (server, _file) = create_test_server();

    let response = server
        .get("/api/node-relations")
        .add_query_param("name", "Nobody")
        .await;

    response.assert_status_ok();
    let view: NodeRelationsResponse = response.json();
    assert_eq!(view.total_relations, 0);
    assert!(view.connected_entities.is_empty());
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_reports_counts_and_source() {
    let (server, _file) = create_test_server();

    let response = server.get("/api/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(health.source, "file");
    assert!(!health.mcp_connected);
    assert_eq!(health.entity_count, 2);
    assert_eq!(health.relation_count, 1);
}

/// Source whose backend is gone; every call fails.
struct DeadSource;

#[async_trait]
impl GraphSource for DeadSource {
    async fn read_graph(&self) -> Result<GraphSnapshot, SourceError> {
        Err(McpError::NotConnected.into())
    }
    async fn search(&self, _query: &str) -> Result<GraphSnapshot, SourceError> {
        Err(McpError::NotConnected.into())
    }
    async fn get_entity(&self, _name: &str) -> Result<EntityDetails, SourceError> {
        Err(McpError::NotConnected.into())
    }
    async fn get_relations(&self, _name: &str) -> Result<NodeRelations, SourceError> {
        Err(McpError::NotConnected.into())
    }
    async fn health(&self) -> Result<HealthInfo, SourceError> {
        Err(McpError::NotConnected.into())
    }
    fn connected(&self) -> bool {
        false
    }
    fn label(&self) -> &'static str {
        "mcp-stdio"
    }
    async fn shutdown(&self) {}
}

#[tokio::test]
async fn test_health_degraded_when_source_fails() {
    let state = AppState::new(Arc::new(DeadSource), None);
    let server = TestServer::new(create_router(state, open_gate())).unwrap();

    let response = server.get("/api/health").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "degraded");
    assert_eq!(health.source, "mcp-stdio");
}

#[tokio::test]
async fn test_dead_source_read_maps_to_unavailable() {
    let state = AppState::new(Arc::new(DeadSource), None);
    let server = TestServer::new(create_router(state, open_gate())).unwrap();

    let response = server.get("/api/graph").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "source_unavailable");
}

// =============================================================================
// AUTH TESTS
// =============================================================================

#[tokio::test]
async fn test_auth_missing_credential_is_unauthorized() {
    let (server, _file) = create_authed_test_server();

    let response = server.get("/api/graph").await;

    response.assert_status_unauthorized();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_auth_unknown_key_is_unauthorized() {
    let (server, _file) = create_authed_test_server();

    let response = server
        .get("/api/graph")
        .add_header("x-api-key", "wrong-key")
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_auth_reader_key_reads() {
    let (server, _file) = create_authed_test_server();

    let response = server
        .get("/api/graph")
        .add_header("x-api-key", "reader-key")
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_bearer_token_accepted() {
    let (server, _file) = create_authed_test_server();

    let response = server
        .get("/api/graph")
        .add_header("authorization", "Bearer reader-key")
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_health_is_also_gated() {
    let (server, _file) = create_authed_test_server();

    let response = server.get("/api/health").await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_auth_write_only_key_cannot_read() {
    let (server, _file) = create_authed_test_server();

    let response = server
        .get("/api/graph")
        .add_header("x-api-key", "writer-key")
        .await;

    response.assert_status_forbidden();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn test_auth_reader_key_passes_proxy_gate() {
    let (server, _file) = create_authed_test_server();

    // The proxy needs the same read permission as the REST endpoints.
    // With no proxy target configured the request then fails with 503,
    // not 401/403.
    let response = server
        .post("/mcp")
        .add_header("x-api-key", "reader-key")
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "source_unavailable");
}

#[tokio::test]
async fn test_auth_admin_key_passes_read_gate() {
    let (server, _file) = create_authed_test_server();

    let response = server
        .get("/api/graph")
        .add_header("x-api-key", "admin-key")
        .await;

    response.assert_status_ok();
}
