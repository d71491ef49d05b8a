//! # Stdio Transport
//!
//! Runs the memory server as a subordinate process and speaks JSON-RPC
//! over its stdin/stdout pipe, one newline-terminated document per
//! message. The server's stderr is inherited so its logs stay visible.
//!
//! No timeout is enforced on the pipe: a server that never answers blocks
//! the in-flight call forever. The HTTP transport is the right choice when
//! that is unacceptable.

use super::McpError;
use super::protocol::{JsonRpcRequest, JsonRpcResponse, LogicalTool, RequestIdCounter};
use super::transport::{ConnectionState, McpTransport};
use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

// =============================================================================
// STDIO TRANSPORT
// =============================================================================

/// JSON-RPC over a subordinate process's stdio pipe.
pub struct StdioTransport {
    /// Command line used to spawn the memory server.
    command: Vec<String>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
    ids: RequestIdCounter,
    state: ConnectionState,
}

impl StdioTransport {
    /// Create a transport for the given server command line.
    ///
    /// `command[0]` is the program; the rest are its arguments.
    #[must_use]
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            child: None,
            stdin: None,
            stdout: None,
            ids: RequestIdCounter::default(),
            state: ConnectionState::Disconnected,
        }
    }

    /// Write one JSON document followed by the newline record separator.
    async fn send(&mut self, message: &JsonRpcRequest) -> Result<(), McpError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or(McpError::NotConnected)?;
        let mut line = serde_json::to_string(message)
            .map_err(|e| McpError::Transport(format!("encode request: {e}")))?;
        line.push('\n');
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| McpError::Transport(format!("write to server stdin: {e}")))?;
        stdin
            .flush()
            .await
            .map_err(|e| McpError::Transport(format!("flush server stdin: {e}")))?;
        Ok(())
    }

    /// Read the next full line from the server's stdout and decode it.
    async fn read_response(&mut self) -> Result<JsonRpcResponse, McpError> {
        let stdout = self
            .stdout
            .as_mut()
            .ok_or(McpError::NotConnected)?;
        let mut line = String::new();
        let read = stdout
            .read_line(&mut line)
            .await
            .map_err(|e| McpError::Transport(format!("read from server stdout: {e}")))?;
        if read == 0 {
            return Err(McpError::Transport("server closed its stdout".into()));
        }
        serde_json::from_str(line.trim())
            .map_err(|e| McpError::Transport(format!("invalid JSON response: {e}")))
    }

    /// Terminate the subordinate process, then wait for it.
    async fn release(&mut self) {
        self.stdin = None;
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                tracing::debug!("terminate memory server: {}", e);
            }
            if let Err(e) = child.wait().await {
                tracing::debug!("wait for memory server: {}", e);
            }
        }
        self.state = ConnectionState::Disconnected;
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn connect(&mut self) -> Result<(), McpError> {
        // Reconnecting must not orphan a previously spawned server.
        if self.child.is_some() {
            self.release().await;
        }
        self.state = ConnectionState::Connecting;

        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| McpError::Connect("empty server command".into()))?;

        tracing::info!(command = %self.command.join(" "), "spawning MCP memory server");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                self.state = ConnectionState::Disconnected;
                McpError::Connect(format!("spawn {program}: {e}"))
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take().map(BufReader::new);
        match (stdin, stdout) {
            (Some(stdin), Some(stdout)) => {
                self.stdin = Some(stdin);
                self.stdout = Some(stdout);
                self.child = Some(child);
            }
            _ => {
                self.state = ConnectionState::Disconnected;
                return Err(McpError::Connect("server pipes unavailable".into()));
            }
        }

        // Handshake. Any failure here must release the process.
        let id = self.ids.next_id();
        let handshake = async {
            self.send(&JsonRpcRequest::initialize(id)).await?;
            let response = self.read_response().await?;
            response.take_result(id)?;
            self.send(&JsonRpcRequest::initialized()).await
        }
        .await;

        if let Err(e) = handshake {
            self.release().await;
            return Err(McpError::Handshake(e.to_string()));
        }

        self.state = ConnectionState::Connected;
        tracing::info!("connected to MCP memory server over stdio");
        Ok(())
    }

    async fn call_tool(&mut self, tool: LogicalTool, args: Value) -> Result<Value, McpError> {
        if self.state != ConnectionState::Connected {
            return Err(McpError::NotConnected);
        }

        let id = self.ids.next_id();
        let request = JsonRpcRequest::tool_call(id, tool.upstream_name(), tool.map_args(args));
        self.send(&request).await?;
        let response = self.read_response().await?;
        let result = response.take_result(id)?;
        super::protocol::unwrap_tool_result(result)
    }

    async fn disconnect(&mut self) {
        if self.child.is_some() {
            tracing::info!("disconnecting from MCP memory server");
        }
        self.release().await;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn label(&self) -> &'static str {
        "mcp-stdio"
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// A minimal line-oriented JSON-RPC server: answers any request carrying
    /// an id with an empty result and ignores notifications.
    const FAKE_SERVER: &str = r#"while read line; do id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9]*\).*/\1/p'); if [ -n "$id" ]; then printf '{"jsonrpc":"2.0","id":%s,"result":{}}\n' "$id"; fi; done"#;

    fn fake_server_transport() -> StdioTransport {
        StdioTransport::new(vec!["sh".into(), "-c".into(), FAKE_SERVER.into()])
    }

    #[tokio::test]
    async fn connect_completes_handshake() {
        let mut transport = fake_server_transport();
        transport.connect().await.unwrap();
        assert_eq!(transport.state(), ConnectionState::Connected);
        transport.disconnect().await;
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn reconnect_replaces_the_server_process() {
        let mut transport = fake_server_transport();
        transport.connect().await.unwrap();
        let first = transport.child.as_ref().and_then(Child::id).unwrap();

        transport.connect().await.unwrap();
        let second = transport.child.as_ref().and_then(Child::id).unwrap();
        assert_ne!(first, second);
        assert_eq!(transport.state(), ConnectionState::Connected);

        // The first server must have been killed and reaped, not orphaned.
        assert!(!std::path::Path::new(&format!("/proc/{first}")).exists());

        transport.disconnect().await;
        assert!(transport.child.is_none());
    }
}
