//! # GraphMem - THE BINARY (library surface)
//!
//! Library crate backing the `graphmem` binary, exposed so integration
//! tests can build routers and sources without spawning a process.
//!
//! - [`api`] - axum REST surface, auth gate, MCP passthrough proxy
//! - [`cli`] - clap commands
//! - [`mcp`] - JSON-RPC client, transports, graph sources

pub mod api;
pub mod cli;
pub mod mcp;
