//! Error types surfaced by the bridge client.

use thiserror::Error;

/// Boxed source for transport-level failures.
type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised on a single backend connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The connection is closed; no further requests are accepted.
    #[error("connection is closed")]
    Closed,

    /// The backend answered with a JSON-RPC error.
    #[error("backend returned error {code}: {message}")]
    Backend {
        /// JSON-RPC error code.
        code: i64,
        /// Error message supplied by the backend.
        message: String,
    },

    /// A request or response body failed to (de)serialize.
    #[error("JSON codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The underlying transport failed.
    #[error("transport failure: {0}")]
    Transport(#[source] BoxedError),
}

impl ConnectionError {
    /// Wraps a transport-level failure.
    #[must_use]
    pub fn transport(source: impl Into<BoxedError>) -> Self {
        Self::Transport(source.into())
    }
}

/// A backend URI could not be converted into a host document URI.
#[derive(Debug, Error)]
#[error("backend URI '{uri}' is not a valid document URI")]
pub struct UriMapError {
    /// The URI that failed to parse.
    pub uri: String,
}

/// Errors raised while resolving which connection owns a document.
///
/// These indicate topology defects (overlapping or missing root scopes)
/// and fail the single provider invocation rather than the process.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// No connection scope matched the document URI.
    #[error("no connection owns document '{uri}'")]
    NoConnection {
        /// Document URI that failed to route.
        uri: String,
    },

    /// More than one connection scope matched the document URI.
    #[error("document '{uri}' matches {count} connection scopes")]
    Ambiguous {
        /// Document URI that routed ambiguously.
        uri: String,
        /// Number of scopes that matched.
        count: usize,
    },

    /// The owning connection is not ready for requests.
    #[error("connection owning '{uri}' is not ready")]
    NotReady {
        /// Document URI whose connection is unavailable.
        uri: String,
    },
}

/// Errors returned from a provider invocation to the extension host.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The document could not be routed to a connection.
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// The backend request failed.
    #[error("backend request failed: {0}")]
    Connection(#[from] ConnectionError),

    /// The backend result carried an unusable URI.
    #[error(transparent)]
    UriMap(#[from] UriMapError),
}

/// Errors raised while applying root-change events to a registration.
#[derive(Debug, Error)]
pub enum RegisterError {
    /// The registration has already been disposed.
    #[error("registration has been disposed")]
    Disposed,

    /// Runtime root changes are not supported on a workspace-scoped
    /// connection; dispose and register again to change the root set.
    #[error("root changes are not supported while a workspace-scoped connection is active")]
    RootChangeUnsupported,
}
