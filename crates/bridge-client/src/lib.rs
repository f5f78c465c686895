//! Extension-host bridge for JSON-RPC language-analysis backends.
#![deny(missing_docs)]
//!
//! The crate connects an editor extension host to one or more backend
//! servers speaking an LSP-style protocol: it decides the connection
//! topology from the workspace roots and the backend's multi-root support,
//! runs the initialize handshake, registers a host provider for every
//! capability the backend advertises, and translates each provider
//! invocation into a backend request. Transport details stay behind the
//! [`Connection`] and [`ConnectionFactory`] traits, and the host surface
//! behind [`ExtensionHost`], so tests and embedders can inject lightweight
//! implementations without spawning real servers.

mod capability;
mod connection;
mod dispose;
mod errors;
mod host;
mod lifecycle;
mod protocol;
mod providers;
mod routing;
mod uri;

#[cfg(test)]
mod tests;

pub use capability::{
    CAPABILITY_TABLE, CapabilityKind, client_capabilities, scoped_selector, supports,
};
pub use connection::{
    CloseListener, Connection, ConnectionFactory, ConnectionState, notify, request,
    request_optional,
};
pub use dispose::Disposable;
pub use errors::{ConnectionError, ProviderError, RegisterError, RoutingError, UriMapError};
pub use host::{
    DocumentSelector, ExtensionHost, RootChangeEvent, RootChangeListener, WorkspaceRoot,
};
pub use lifecycle::{RegisterOptions, Registration, register};
pub use protocol::{
    BackendLocation, InitializeParams, OneOrMany, PositionParams, ReferenceRequestParams,
    TextDocumentRef, WorkspaceFolder,
};
pub use providers::{
    BackendDefinitionProvider, BackendHoverProvider, BackendReferenceProvider, DefinitionProvider,
    HoverProvider, ReferenceProvider,
};
pub use routing::{ConnectionRouter, ConnectionScope};
pub use uri::{canonical_document_uri, in_scope, scope_pattern, to_backend_uri, to_host_uri};
