//! # MCP Client Module
//!
//! JSON-RPC 2.0 client for the external memory service, speaking MCP over
//! one of two transports:
//!
//! - **stdio** — the memory server runs as a subordinate process; requests
//!   are newline-delimited JSON on its stdin, responses on its stdout.
//! - **StreamableHTTP** — requests are POSTed to an HTTP endpoint; results
//!   arrive as JSON or as a Server-Sent-Events payload in the response body.
//!
//! Both transports share one contract ([`McpTransport`]) and one session
//! model: a strictly increasing request-id counter, an `initialize`
//! handshake followed by an `initialized` notification, and at most one
//! outstanding call at a time (no pipelining). The client never retries;
//! retry policy belongs to the caller.

mod http;
mod protocol;
mod source;
mod stdio;
mod transport;

pub use http::HttpTransport;
pub use protocol::{LogicalTool, PROTOCOL_VERSION};
pub use source::{EntityDetails, FileSource, GraphSource, HealthInfo, LiveSource, SourceError};
pub use stdio::StdioTransport;
pub use transport::{ConnectionState, McpTransport};

use thiserror::Error;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors from the MCP client layer.
#[derive(Debug, Error)]
pub enum McpError {
    /// `call_tool` before a successful `connect`.
    #[error("Not connected to MCP server")]
    NotConnected,

    /// The transport could not be established (spawn/connect failure).
    #[error("Connect failed: {0}")]
    Connect(String),

    /// The `initialize` exchange failed.
    #[error("MCP handshake failed: {0}")]
    Handshake(String),

    /// I/O failure on an in-flight call (broken pipe, reset, bad status).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server returned a JSON-RPC error envelope.
    #[error("MCP tool call failed ({code}): {message}")]
    Rpc { code: i64, message: String },

    /// The `result` payload matched neither known result shape.
    #[error("Malformed tool result: {0}")]
    MalformedResult(String),
}
