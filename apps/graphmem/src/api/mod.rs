//! # GraphMem HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /api/graph` - Full graph snapshot
//! - `GET /api/search?q=` - Substring search over entities and relations
//! - `GET /api/entity?name=` - One entity with its relations
//! - `GET /api/node-relations?name=` - Directional relation view
//! - `GET /api/health` - Health check with source status
//! - `ANY /mcp`, `/mcp/*` - Raw passthrough to the MCP endpoint
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `GRAPHMEM_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `GRAPHMEM_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `GRAPHMEM_AUTH_ENABLED` / `GRAPHMEM_API_KEYS`: see [`auth`]

mod auth;
mod error;
mod handlers;
mod proxy;
mod types;

// Re-exports for external use
pub use auth::{AuthGate, Permission, Principal};
pub use error::{ApiError, ErrorBody};
pub use proxy::target_from_env;
// Re-export handlers and types for integration tests (via `graphmem::api::*`)
#[allow(unused_imports)]
pub use handlers::{
    entity_handler, graph_handler, health_handler, node_relations_handler, search_handler,
};
#[allow(unused_imports)]
pub use types::{EntityResponse, HealthResponse, NodeRelationsResponse};

use crate::mcp::GraphSource;
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware as axum_middleware,
    middleware::Next,
    response::Response,
    routing::{any, get},
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// Where graph reads go: live MCP session or JSONL file.
    pub source: Arc<dyn GraphSource>,
    /// Target base URL for the `/mcp` passthrough, if configured.
    pub proxy_target: Option<String>,
    /// Untimed client for proxied requests (SSE streams stay open).
    pub http: reqwest::Client,
}

impl AppState {
    /// Create new app state around a graph source.
    #[must_use]
    pub fn new(source: Arc<dyn GraphSource>, proxy_target: Option<String>) -> Self {
        Self {
            source,
            proxy_target,
            http: reqwest::Client::new(),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from environment configuration.
///
/// Reads `GRAPHMEM_CORS_ORIGINS`:
/// - If "*": allows all origins (development mode - use with caution!)
/// - If not set: defaults to localhost only (restrictive default)
/// - Otherwise: parses comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("GRAPHMEM_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (GRAPHMEM_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in GRAPHMEM_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No GRAPHMEM_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let localhost_origins = vec![
        "http://localhost:3000".parse::<HeaderValue>().ok(),
        "http://localhost:8080".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:3000".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:8080".parse::<HeaderValue>().ok(),
    ];
    let origins: Vec<HeaderValue> = localhost_origins.into_iter().flatten().collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// RATE LIMITING
// =============================================================================

/// Default rate limit: 100 requests per second.
const DEFAULT_RPS: NonZeroU32 = NonZeroU32::new(100).unwrap();

/// Global rate limiter type alias.
type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Get rate limit from `GRAPHMEM_RATE_LIMIT`, default 100, 0 disables.
fn get_rate_limit_from_env() -> u32 {
    std::env::var("GRAPHMEM_RATE_LIMIT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(100)
}

fn create_rate_limiter(requests_per_second: u32) -> GlobalRateLimiter {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(DEFAULT_RPS);
    Arc::new(RateLimiter::direct(Quota::per_second(rps)))
}

/// Rate limiting middleware, 429 when the global quota is exhausted.
async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    match limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!("Rate limit exceeded");
            Err((StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"))
        }
    }
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit - caps request bodies at 2 MiB
/// 4. Rate Limiting - global quota (if enabled)
/// 5. Authentication - every route, the MCP passthrough included,
///    requires the `read` permission (admin implies it)
pub fn create_router(state: AppState, gate: Arc<AuthGate>) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    // The proxy needs the same minimum permission as the adapted read
    // endpoints, so one gate covers everything.
    let mut router = Router::new()
        .route("/api/graph", get(handlers::graph_handler))
        .route("/api/search", get(handlers::search_handler))
        .route("/api/entity", get(handlers::entity_handler))
        .route("/api/node-relations", get(handlers::node_relations_handler))
        .route("/api/health", get(handlers::health_handler))
        .route("/mcp", any(proxy::proxy_handler))
        .route("/mcp/{*path}", any(proxy::proxy_handler))
        .layer(axum_middleware::from_fn_with_state(
            auth::AuthRequirement {
                gate,
                needed: Permission::Read,
            },
            auth::require_permission,
        ));

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and run until the process receives a shutdown
/// signal. The graph source is shut down (subordinate process killed,
/// session dropped) before this returns.
pub async fn run_server(addr: &str, state: AppState, gate: Arc<AuthGate>) -> std::io::Result<()> {
    let source = Arc::clone(&state.source);
    let router = create_router(state, gate);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("GraphMem HTTP server listening on {}", addr);

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    source.shutdown().await;
    result
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl-C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

// =============================================================================
// TESTS
// =============================================================================
