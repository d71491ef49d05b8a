//! # JSON-RPC Envelopes and Tool Mapping
//!
//! Wire types for the MCP JSON-RPC 2.0 protocol, the request-id allocator,
//! the logical-tool translation table, and result unwrapping.

use super::McpError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// MCP protocol revision sent during the `initialize` handshake.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Client identity advertised to the memory service.
const CLIENT_NAME: &str = "graphmem";

// =============================================================================
// REQUEST ID ALLOCATION
// =============================================================================

/// Allocates strictly increasing request ids for one transport session.
///
/// Ids must never be reused while a response is outstanding; since the
/// client allows at most one in-flight call, monotonicity alone guarantees
/// correct correlation.
#[derive(Debug, Default)]
pub struct RequestIdCounter {
    next: u64,
}

impl RequestIdCounter {
    /// Allocate the next id.
    pub fn next_id(&mut self) -> u64 {
        self.next += 1;
        self.next
    }
}

// =============================================================================
// ENVELOPES
// =============================================================================

/// Outbound JSON-RPC message. Notifications carry no `id`.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// A request expecting a correlated response.
    pub fn call(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: Some(id),
            method: method.into(),
            params: Some(params),
        }
    }

    /// A notification: no id, no reply expected.
    pub fn notification(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: None,
            method: method.into(),
            params: None,
        }
    }

    /// The `initialize` handshake request.
    pub fn initialize(id: u64) -> Self {
        Self::call(
            id,
            "initialize",
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "clientInfo": {
                    "name": CLIENT_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        )
    }

    /// The post-handshake `initialized` notification.
    pub fn initialized() -> Self {
        Self::notification("notifications/initialized")
    }

    /// A `tools/call` request for an upstream tool.
    pub fn tool_call(id: u64, tool_name: &str, arguments: Value) -> Self {
        Self::call(
            id,
            "tools/call",
            json!({ "name": tool_name, "arguments": arguments }),
        )
    }
}

/// Inbound JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
pub struct RpcErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl JsonRpcResponse {
    /// Correlate this response against the id of the in-flight request and
    /// extract the `result`, surfacing server-side error envelopes.
    pub fn take_result(self, expected_id: u64) -> Result<Value, McpError> {
        if let Some(err) = self.error {
            return Err(McpError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        match self.id {
            Some(id) if id == expected_id => {}
            other => {
                return Err(McpError::Transport(format!(
                    "response id {other:?} does not match request id {expected_id}"
                )));
            }
        }
        self.result
            .ok_or_else(|| McpError::MalformedResult("response has neither result nor error".into()))
    }
}

// =============================================================================
// RESULT UNWRAPPING
// =============================================================================

/// Unwrap a successful `tools/call` result.
///
/// Two shapes exist upstream: (a) a `content` array whose first element
/// carries a JSON-encoded string needing a second decode pass, or (b) a
/// direct JSON value. Shape (a) is attempted first; an absent, non-array,
/// or empty `content` falls back to shape (b). Only a present `content[0]`
/// that cannot be decoded is an error.
pub fn unwrap_tool_result(result: Value) -> Result<Value, McpError> {
    let first = result
        .get("content")
        .and_then(Value::as_array)
        .and_then(|items| items.first());
    let Some(first) = first else {
        return Ok(result);
    };

    let text = first
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| McpError::MalformedResult("content[0] carries no text field".into()))?;

    serde_json::from_str(text)
        .map_err(|e| McpError::MalformedResult(format!("content[0].text is not JSON: {e}")))
}

// =============================================================================
// TOOL MAPPING
// =============================================================================

/// The façade's logical operations, translated to upstream tool names and
/// argument shapes by a static table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalTool {
    /// Full snapshot.
    ReadGraph,
    /// Filtered snapshot.
    SearchNodes,
    /// Entities by exact name.
    OpenNodes,
    /// Outgoing/incoming edges plus neighbors for one node.
    GetNodeRelations,
    /// Liveness probe. The upstream has no dedicated health tool, so this
    /// maps to the same tool as [`LogicalTool::ReadGraph`].
    HealthCheck,
}

/// Per-tool argument key renames applied before dispatch.
///
/// Extend this table rather than special-casing call sites.
const ARG_RENAMES: &[(LogicalTool, &str, &str)] =
    &[(LogicalTool::GetNodeRelations, "node_name", "nodeName")];

impl LogicalTool {
    /// The memory service's tool identifier for this operation.
    pub fn upstream_name(self) -> &'static str {
        match self {
            Self::ReadGraph | Self::HealthCheck => "read_graph",
            Self::SearchNodes => "search_nodes",
            Self::OpenNodes => "open_nodes",
            Self::GetNodeRelations => "get_node_relations",
        }
    }

    /// Parse a logical tool from its canonical name.
    ///
    /// `search_graph` is accepted as a legacy alias for the canonical
    /// search contract; both filter on the same fields.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "read_graph" => Some(Self::ReadGraph),
            "search_nodes" | "search_graph" => Some(Self::SearchNodes),
            "open_nodes" => Some(Self::OpenNodes),
            "get_node_relations" => Some(Self::GetNodeRelations),
            "health_check" => Some(Self::HealthCheck),
            _ => None,
        }
    }

    /// Apply the per-tool argument key renames.
    pub fn map_args(self, args: Value) -> Value {
        let Value::Object(mut map) = args else {
            return args;
        };
        for (tool, from, to) in ARG_RENAMES {
            if *tool == self
                && let Some(value) = map.remove(*from)
            {
                map.insert((*to).to_string(), value);
            }
        }
        Value::Object(map)
    }
}

// =============================================================================
// TESTS
// =============================================================================
