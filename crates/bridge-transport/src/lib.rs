//! Stdio JSON-RPC transport for the bridge client.
#![deny(missing_docs)]
//!
//! Implements the bridge's [`Connection`](bridge_client::Connection) and
//! [`ConnectionFactory`](bridge_client::ConnectionFactory) seams on top of
//! a spawned backend process: Content-Length framing over the child's
//! stdio, JSON-RPC 2.0 envelopes with per-connection request IDs, and
//! graceful process teardown on disposal.

mod config;
mod connection;
mod error;
mod factory;
mod framing;
mod jsonrpc;

pub use config::ServerConfig;
pub use connection::StdioConnection;
pub use error::{SpawnError, TransportError};
pub use factory::StdioConnectionFactory;
pub use framing::FramedTransport;
pub use jsonrpc::{
    IncomingMessage, IncomingNotification, IncomingRequest, Notification, Request, Response,
    RpcError,
};
