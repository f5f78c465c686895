//! Error types for the stdio transport.

use std::io;

use bridge_client::ConnectionError;
use thiserror::Error;

use crate::jsonrpc::RpcError;

/// Errors raised while framing messages over the backend's stdio.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Missing Content-Length header.
    #[error("missing Content-Length header")]
    MissingContentLength,

    /// Invalid header format.
    #[error("invalid header format")]
    InvalidHeader,

    /// Too many interleaved messages arrived without a matching response.
    #[error("no response for request {request_id} after {scanned} messages")]
    ResponseScanExceeded {
        /// The request still waiting for its response.
        request_id: i64,
        /// How many messages were scanned before giving up.
        scanned: usize,
    },
}

/// Errors raised while spawning a backend process.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The backend binary was not found on the PATH.
    #[error("backend binary not found: {command}")]
    BinaryNotFound {
        /// The command that was not found.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The process failed to start or expose its stdio pipes.
    #[error("failed to spawn backend process: {message}")]
    Failed {
        /// Description of the spawn failure.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl From<TransportError> for ConnectionError {
    fn from(error: TransportError) -> Self {
        Self::transport(error)
    }
}

impl From<SpawnError> for ConnectionError {
    fn from(error: SpawnError) -> Self {
        Self::transport(error)
    }
}

impl From<RpcError> for ConnectionError {
    fn from(error: RpcError) -> Self {
        Self::Backend {
            code: error.code,
            message: error.message,
        }
    }
}
