//! Maps documents to the connection that owns them.

use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::connection::{Connection, ConnectionState};
use crate::errors::RoutingError;
use crate::uri;

const ROUTING_TARGET: &str = "bridge_client::routing";

/// The subset of documents a connection serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionScope {
    /// Exactly one workspace root; documents are matched by URI prefix.
    Root(String),
    /// The whole workspace (multi-root capable backend).
    Workspace,
}

impl ConnectionScope {
    /// Whether a document URI falls inside this scope.
    #[must_use]
    pub fn owns(&self, document_uri: &str) -> bool {
        match self {
            Self::Root(root) => uri::in_scope(document_uri, root),
            Self::Workspace => true,
        }
    }

    /// The root URI for root-scoped connections.
    #[must_use]
    pub fn root(&self) -> Option<&str> {
        match self {
            Self::Root(root) => Some(root),
            Self::Workspace => None,
        }
    }
}

struct RouterEntry {
    scope: ConnectionScope,
    connection: Arc<dyn Connection>,
    state: ConnectionState,
}

/// Live view of the connection set, shared with every provider.
///
/// The lifecycle manager writes entries as connections open, initialize,
/// and close; providers read it on every invocation to find the connection
/// owning the document at hand.
#[derive(Default)]
pub struct ConnectionRouter {
    entries: RwLock<Vec<RouterEntry>>,
}

impl ConnectionRouter {
    /// Builds an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection in the `Created` state.
    ///
    /// A leftover entry with the same scope is dropped first, so a root
    /// can be re-added after its previous connection died.
    pub fn insert(&self, scope: ConnectionScope, connection: Arc<dyn Connection>) {
        let mut entries = self.write_entries();
        entries.retain(|entry| entry.scope != scope);
        entries.push(RouterEntry {
            scope,
            connection,
            state: ConnectionState::Created,
        });
    }

    /// Advances the state of the connection with the given scope.
    pub fn set_state(&self, scope: &ConnectionScope, state: ConnectionState) {
        let mut entries = self.write_entries();
        if let Some(entry) = entries.iter_mut().find(|entry| entry.scope == *scope) {
            debug!(
                target: ROUTING_TARGET,
                scope = ?scope,
                from = ?entry.state,
                to = ?state,
                "connection state change"
            );
            entry.state = state;
        }
    }

    /// Removes the connection with the given scope, if present.
    pub fn remove(&self, scope: &ConnectionScope) {
        let mut entries = self.write_entries();
        entries.retain(|entry| entry.scope != *scope);
    }

    /// Removes every connection.
    pub fn clear(&self) {
        self.write_entries().clear();
    }

    /// Resolves the connection owning a document.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::NoConnection`] when no scope matches,
    /// [`RoutingError::Ambiguous`] when several do (a topology defect), and
    /// [`RoutingError::NotReady`] when the owning connection has not
    /// finished initializing or has already closed.
    pub fn route(&self, document_uri: &str) -> Result<Arc<dyn Connection>, RoutingError> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let matches: Vec<&RouterEntry> = entries
            .iter()
            .filter(|entry| entry.scope.owns(document_uri))
            .collect();

        match matches.as_slice() {
            [] => Err(RoutingError::NoConnection {
                uri: document_uri.to_owned(),
            }),
            [entry] => {
                if entry.state == ConnectionState::Ready && !entry.connection.is_closed() {
                    Ok(Arc::clone(&entry.connection))
                } else {
                    Err(RoutingError::NotReady {
                        uri: document_uri.to_owned(),
                    })
                }
            }
            many => Err(RoutingError::Ambiguous {
                uri: document_uri.to_owned(),
                count: many.len(),
            }),
        }
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, Vec<RouterEntry>> {
        self.entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
