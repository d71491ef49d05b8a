//! # StreamableHTTP Transport
//!
//! JSON-RPC over HTTP POST. The memory service answers either with a
//! plain JSON body or with a Server-Sent-Events payload whose `data:`
//! lines carry the JSON-RPC response. A session identifier issued during
//! the handshake (`Mcp-Session-Id` header) is echoed on every later call.
//!
//! Unlike the stdio pipe, this transport enforces a fixed connect/read
//! timeout; a dead upstream fails the in-flight call instead of hanging.

use super::McpError;
use super::protocol::{JsonRpcRequest, JsonRpcResponse, LogicalTool, RequestIdCounter};
use super::transport::{ConnectionState, McpTransport};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;

/// Connect/read timeout applied to every request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the server-issued session identifier.
const SESSION_HEADER: &str = "Mcp-Session-Id";

// =============================================================================
// SSE PAYLOAD PARSING
// =============================================================================

/// Extract the JSON payload from a Server-Sent-Events body.
///
/// The response body carries one event whose `data:` lines hold the
/// JSON-RPC response; multi-line data is joined per the SSE framing rules.
fn sse_data_payload(body: &str) -> Option<String> {
    let mut data_lines = Vec::new();
    for line in body.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        } else if line.is_empty() && !data_lines.is_empty() {
            // Blank line ends the first event; later events are ignored.
            break;
        }
    }
    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

// =============================================================================
// HTTP TRANSPORT
// =============================================================================

/// JSON-RPC over StreamableHTTP.
pub struct HttpTransport {
    endpoint: String,
    http: reqwest::Client,
    session_id: Option<String>,
    ids: RequestIdCounter,
    state: ConnectionState,
}

impl HttpTransport {
    /// Create a transport targeting the given MCP endpoint URL.
    pub fn new(endpoint: String) -> Result<Self, McpError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| McpError::Connect(format!("build HTTP client: {e}")))?;
        Ok(Self {
            endpoint,
            http,
            session_id: None,
            ids: RequestIdCounter::default(),
            state: ConnectionState::Disconnected,
        })
    }

    /// POST one message and decode the reply.
    ///
    /// Returns `None` for an empty body, which the protocol uses to
    /// acknowledge notifications; callers treat it as `{}`.
    async fn exchange(&mut self, message: &JsonRpcRequest) -> Result<Option<Value>, McpError> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .json(message);
        if let Some(ref session) = self.session_id {
            request = request.header(SESSION_HEADER, session);
        }

        let response = request
            .send()
            .await
            .map_err(|e| McpError::Transport(format!("POST {}: {e}", self.endpoint)))?;

        let status = response.status();
        if !(status.is_success() || status.as_u16() == 202) {
            return Err(McpError::Transport(format!(
                "unexpected HTTP status {status} from {}",
                self.endpoint
            )));
        }

        // The session id is issued once, during the initialize exchange.
        if self.session_id.is_none()
            && let Some(session) = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
        {
            self.session_id = Some(session.to_string());
        }

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("text/event-stream"));

        let body = response
            .text()
            .await
            .map_err(|e| McpError::Transport(format!("read response body: {e}")))?;

        if body.trim().is_empty() {
            return Ok(None);
        }

        let payload = if is_event_stream {
            sse_data_payload(&body).ok_or_else(|| {
                McpError::Transport("event stream carried no data lines".into())
            })?
        } else {
            body
        };

        serde_json::from_str(&payload)
            .map_err(|e| McpError::Transport(format!("invalid JSON response: {e}")))
            .map(Some)
    }

    /// Exchange a request that must produce a correlated response.
    async fn call(&mut self, id: u64, message: &JsonRpcRequest) -> Result<Value, McpError> {
        let value = self
            .exchange(message)
            .await?
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        let response: JsonRpcResponse = serde_json::from_value(value)
            .map_err(|e| McpError::Transport(format!("invalid response envelope: {e}")))?;
        response.take_result(id)
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
    async fn connect(&mut self) -> Result<(), McpError> {
        self.state = ConnectionState::Connecting;

        tracing::info!(endpoint = %self.endpoint, "connecting to MCP memory service");

        let id = self.ids.next_id();
        let init = JsonRpcRequest::initialize(id);
        if let Err(e) = self.call(id, &init).await {
            self.session_id = None;
            self.state = ConnectionState::Disconnected;
            return Err(McpError::Handshake(e.to_string()));
        }

        if let Err(e) = self.exchange(&JsonRpcRequest::initialized()).await {
            self.session_id = None;
            self.state = ConnectionState::Disconnected;
            return Err(McpError::Handshake(e.to_string()));
        }

        self.state = ConnectionState::Connected;
        tracing::info!("connected to MCP memory service over StreamableHTTP");
        Ok(())
    }

    async fn call_tool(&mut self, tool: LogicalTool, args: Value) -> Result<Value, McpError> {
        if self.state != ConnectionState::Connected {
            return Err(McpError::NotConnected);
        }

        let id = self.ids.next_id();
        let request = JsonRpcRequest::tool_call(id, tool.upstream_name(), tool.map_args(args));
        let result = self.call(id, &request).await?;
        super::protocol::unwrap_tool_result(result)
    }

    async fn disconnect(&mut self) {
        self.session_id = None;
        self.state = ConnectionState::Disconnected;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn label(&self) -> &'static str {
        "mcp-http"
    }
}

// =============================================================================
// TESTS
// =============================================================================
