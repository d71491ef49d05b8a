//! # Transport Contract
//!
//! The shared contract for both MCP transports. Implementations own a
//! single logical session and are NOT safe for concurrent use: one
//! subordinate process/connection, one id counter, one outstanding call.
//! Callers sharing a transport must serialize access externally (the
//! [`super::LiveSource`] wraps it in a `tokio::sync::Mutex`).

use super::McpError;
use super::protocol::LogicalTool;
use async_trait::async_trait;
use serde_json::Value;

// =============================================================================
// CONNECTION STATE
// =============================================================================

/// Transport session lifecycle.
///
/// `Disconnected → Connecting → Connected → Disconnected`. There is no
/// automatic reconnect: a failed call leaves the session `Connected` and
/// surfaces the error; a failed connect returns to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

// =============================================================================
// TRANSPORT TRAIT
// =============================================================================

/// One logical JSON-RPC session to the memory service.
#[async_trait]
pub trait McpTransport: Send {
    /// Establish the session: handshake (`initialize` request, correlated
    /// response, `initialized` notification), then transition to
    /// `Connected`. A handshake failure releases the underlying
    /// process/connection and leaves the session `Disconnected`.
    async fn connect(&mut self) -> Result<(), McpError>;

    /// Invoke one upstream tool and await its correlated response.
    /// At most one call may be outstanding; no retry is attempted.
    async fn call_tool(&mut self, tool: LogicalTool, args: Value) -> Result<Value, McpError>;

    /// Tear the session down, releasing the subordinate process or HTTP
    /// session. Idempotent.
    async fn disconnect(&mut self);

    /// Current session state.
    fn state(&self) -> ConnectionState;

    /// Short transport label for health payloads and logs.
    fn label(&self) -> &'static str;
}
