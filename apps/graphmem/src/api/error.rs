//! # API Error Taxonomy
//!
//! Every failure a handler can produce maps onto one HTTP status and a
//! uniform `{"error": ..., "message": ...}` JSON body, so clients never
//! have to branch on body shape.

use crate::mcp::{McpError, SourceError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Errors returned by API handlers and middleware.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No credential, or a credential that matches no configured key.
    #[error("Invalid or missing API key")]
    Unauthenticated,

    /// Authenticated, but the key lacks the required permission.
    #[error("Insufficient permissions: {needed} required")]
    Forbidden { needed: &'static str },

    /// A required query parameter was not supplied.
    #[error("Missing required query parameter: {0}")]
    MissingParameter(&'static str),

    /// The requested entity does not exist.
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// The graph backend is not reachable.
    #[error("Graph source unavailable: {0}")]
    Unavailable(String),

    /// The graph backend answered, but with something unusable.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Forwarding a request to the MCP endpoint failed.
    #[error("Proxy error: {0}")]
    Proxy(String),
}

impl ApiError {
    /// Stable machine-readable error code for the response body.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::MissingParameter(_) => "missing_parameter",
            Self::NotFound(_) => "not_found",
            Self::Unavailable(_) => "source_unavailable",
            Self::Upstream(_) => "upstream_error",
            Self::Proxy(_) => "proxy_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::MissingParameter(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) | Self::Proxy(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SourceError> for ApiError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(name) => Self::NotFound(name),
            SourceError::Mcp(mcp) => match mcp {
                McpError::NotConnected | McpError::Connect(_) => Self::Unavailable(mcp.to_string()),
                other => Self::Upstream(other.to_string()),
            },
        }
    }
}

// =============================================================================
// RESPONSE BODY
// =============================================================================

/// Uniform error body: `{"error": "<code>", "message": "<detail>"}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "request failed");
        }
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Forbidden { needed: "admin" }.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::MissingParameter("q").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("Alice".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Unavailable("down".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::Proxy("http://internal/mcp: refused".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_source_error_conversion() {
        let api: ApiError = SourceError::NotFound("Bob".into()).into();
        assert!(matches!(api, ApiError::NotFound(name) if name == "Bob"));

        let api: ApiError = SourceError::Mcp(McpError::NotConnected).into();
        assert!(matches!(api, ApiError::Unavailable(_)));

        let api: ApiError = SourceError::Mcp(McpError::MalformedResult("junk".into())).into();
        assert!(matches!(api, ApiError::Upstream(_)));
    }
}
