//! # API Endpoint Handlers
//!
//! Thin translation layer: extract parameters, call the graph source,
//! shape the response. All policy (auth, rate limits) lives in middleware;
//! all graph behavior lives behind [`GraphSource`].

use super::{
    AppState,
    error::ApiError,
    types::{EntityResponse, HealthResponse, NameParams, NodeRelationsResponse, SearchParams},
};
use axum::{Json, extract::Query, extract::State, http::StatusCode, response::IntoResponse};
use graphmem_core::GraphSnapshot;

// =============================================================================
// GRAPH HANDLER
// =============================================================================

/// `GET /api/graph` - full snapshot.
pub async fn graph_handler(State(state): State<AppState>) -> Result<Json<GraphSnapshot>, ApiError> {
    let snapshot = state.source.read_graph().await?;
    Ok(Json(snapshot))
}

// =============================================================================
// SEARCH HANDLER
// =============================================================================

/// `GET /api/search?q=` - substring search over entities and relations.
///
/// A missing `q` is treated like an empty one: both return an empty
/// snapshot with 200, never an error.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<GraphSnapshot>, ApiError> {
    let query = params.q.unwrap_or_default();
    let snapshot = state.source.search(&query).await?;
    Ok(Json(snapshot))
}

// =============================================================================
// ENTITY HANDLER
// =============================================================================

/// `GET /api/entity?name=` - one entity with all its relations.
///
/// Missing and empty names are both a 400; no entity has an empty name.
pub async fn entity_handler(
    State(state): State<AppState>,
    Query(params): Query<NameParams>,
) -> Result<Json<EntityResponse>, ApiError> {
    let name = params
        .name
        .filter(|n| !n.is_empty())
        .ok_or(ApiError::MissingParameter("name"))?;
    let details = state.source.get_entity(&name).await?;
    Ok(Json(EntityResponse {
        entity: details.entity,
        relations: details.relations,
    }))
}

// =============================================================================
// NODE RELATIONS HANDLER
// =============================================================================

/// `GET /api/node-relations?name=` - directional relation view.
///
/// An unknown name yields an empty view rather than a 404; relations
/// can reference entities that were never created.
pub async fn node_relations_handler(
    State(state): State<AppState>,
    Query(params): Query<NameParams>,
) -> Result<Json<NodeRelationsResponse>, ApiError> {
    let name = params
        .name
        .filter(|n| !n.is_empty())
        .ok_or(ApiError::MissingParameter("name"))?;
    let relations = state.source.get_relations(&name).await?;
    Ok(Json(NodeRelationsResponse::from_relations(&name, relations)))
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// `GET /api/health` - liveness probe.
///
/// 200 with counts when the source answers, 503 with a degraded payload
/// when it does not. Never an error body: monitoring expects this shape.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let label = state.source.label();
    match state.source.health().await {
        Ok(info) => (
            StatusCode::OK,
            Json(HealthResponse::healthy(
                label,
                state.source.connected(),
                info.entity_count,
                info.relation_count,
            )),
        ),
        Err(e) => {
            tracing::warn!(source = label, "health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::degraded(label)),
            )
        }
    }
}
