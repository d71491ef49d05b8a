//! # MCP Passthrough Proxy
//!
//! Forwards `/mcp` and `/mcp/*` verbatim to the configured MCP endpoint,
//! streaming bodies in both directions. Clients that speak MCP directly
//! (session headers, SSE responses) go through untouched; the REST
//! endpoints exist for everyone else.
//!
//! The target is `GRAPHMEM_MCP_INTERNAL_URL`, falling back to
//! `GRAPHMEM_MCP_URL`. With neither set the proxy answers 503.

use super::{AppState, error::ApiError};
use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    response::Response,
};

/// Hop-by-hop headers that must not be forwarded in either direction.
const HOP_HEADERS: &[header::HeaderName] = &[
    header::HOST,
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::CONTENT_LENGTH,
];

/// Resolve the proxy target at startup.
#[must_use]
pub fn target_from_env() -> Option<String> {
    std::env::var("GRAPHMEM_MCP_INTERNAL_URL")
        .or_else(|_| std::env::var("GRAPHMEM_MCP_URL"))
        .ok()
        .filter(|url| !url.is_empty())
        .map(|url| url.trim_end_matches('/').to_string())
}

/// Map an incoming `/mcp...` path onto the target base URL.
fn target_url(base: &str, path: &str, query: Option<&str>) -> String {
    let suffix = path.strip_prefix("/mcp").unwrap_or(path);
    let mut url = format!("{base}{suffix}");
    if let Some(query) = query {
        url.push('?');
        url.push_str(query);
    }
    url
}

/// `ANY /mcp` and `ANY /mcp/{*path}` - raw passthrough.
pub async fn proxy_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Response, ApiError> {
    let Some(base) = state.proxy_target.as_deref() else {
        return Err(ApiError::Unavailable(
            "no MCP endpoint configured for proxying".to_string(),
        ));
    };

    let (parts, body) = request.into_parts();
    let url = target_url(base, parts.uri.path(), parts.uri.query());

    let mut upstream = state
        .http
        .request(parts.method.clone(), &url)
        .body(reqwest::Body::wrap_stream(body.into_data_stream()));
    for (name, value) in &parts.headers {
        if !HOP_HEADERS.contains(name) {
            upstream = upstream.header(name, value);
        }
    }

    tracing::debug!(method = %parts.method, url = %url, "proxying MCP request");

    let upstream_response = upstream
        .send()
        .await
        .map_err(|e| ApiError::Proxy(format!("{url}: {e}")))?;

    let mut response = Response::builder().status(upstream_response.status());
    for (name, value) in upstream_response.headers() {
        if !HOP_HEADERS.contains(name) {
            response = response.header(name, value);
        }
    }
    response
        .body(Body::from_stream(upstream_response.bytes_stream()))
        .map_err(|e| ApiError::Proxy(format!("assembling proxied response: {e}")))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_url_root() {
        assert_eq!(
            target_url("http://127.0.0.1:8787/mcp", "/mcp", None),
            "http://127.0.0.1:8787/mcp"
        );
    }

    #[test]
    fn test_target_url_subpath_and_query() {
        assert_eq!(
            target_url("http://127.0.0.1:8787/mcp", "/mcp/session", Some("id=7")),
            "http://127.0.0.1:8787/mcp/session?id=7"
        );
    }
}
