//! Connection lifecycle management and the top-level registration entry
//! point.
//!
//! `register` decides the connection topology from the workspace-root
//! layout and the backend's multi-root capability, runs the initialize
//! handshake per connection, feeds each initialize response to the
//! capability registrar, and keeps the connection set consistent as roots
//! come and go.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use lsp_types::{InitializedParams, ServerCapabilities};
use tracing::{debug, warn};

use crate::capability::{client_capabilities, register_for_capabilities};
use crate::connection::{Connection, ConnectionFactory, ConnectionState, notify, request};
use crate::dispose::Disposable;
use crate::errors::{ConnectionError, RegisterError};
use crate::host::{DocumentSelector, ExtensionHost, RootChangeEvent, WorkspaceRoot};
use crate::protocol::{InitializeParams, WorkspaceFolder};
use crate::routing::{ConnectionRouter, ConnectionScope};

const LIFECYCLE_TARGET: &str = "bridge_client::lifecycle";

/// Configuration for [`register`].
#[derive(Debug, Clone)]
pub struct RegisterOptions {
    /// Whether the backend accepts multiple workspace folders over one
    /// connection. Defaults to `false` (one connection per root).
    pub supports_workspace_folders: bool,
    /// Base selector for every provider this registration creates.
    pub document_selector: DocumentSelector,
}

impl RegisterOptions {
    /// Builds options for a backend without multi-root support.
    #[must_use]
    pub fn new(document_selector: DocumentSelector) -> Self {
        Self {
            supports_workspace_folders: false,
            document_selector,
        }
    }

    /// Marks the backend as multi-root capable.
    #[must_use]
    pub fn with_workspace_folders(mut self, supported: bool) -> Self {
        self.supports_workspace_folders = supported;
        self
    }
}

/// A connection together with the provider registrations derived from it.
struct ConnectionLink {
    connection: Arc<dyn Connection>,
    registrations: Vec<Disposable>,
}

impl ConnectionLink {
    fn dispose(self) {
        for registration in &self.registrations {
            registration.dispose();
        }
        self.connection.dispose();
    }
}

enum Links {
    /// Single workspace-scoped connection (multi-root capable backend).
    Workspace(Option<ConnectionLink>),
    /// One connection per root, keyed by root URI.
    PerRoot(HashMap<String, ConnectionLink>),
}

struct SessionInner {
    host: Arc<dyn ExtensionHost>,
    factory: Arc<dyn ConnectionFactory>,
    selector: DocumentSelector,
    router: Arc<ConnectionRouter>,
    links: Mutex<Links>,
    workspace_scoped: bool,
    disposed: AtomicBool,
}

impl SessionInner {
    fn store_link(&self, scope: &ConnectionScope, link: ConnectionLink) {
        let mut links = self.lock_links();
        match (&mut *links, scope) {
            (Links::Workspace(slot), ConnectionScope::Workspace) => *slot = Some(link),
            (Links::PerRoot(map), ConnectionScope::Root(root)) => {
                map.insert(root.clone(), link);
            }
            _ => {
                // Scope and topology disagree; drop the link defensively.
                link.dispose();
            }
        }
    }

    fn take_link(&self, scope: &ConnectionScope) -> Option<ConnectionLink> {
        let mut links = self.lock_links();
        match (&mut *links, scope) {
            (Links::Workspace(slot), ConnectionScope::Workspace) => slot.take(),
            (Links::PerRoot(map), ConnectionScope::Root(root)) => map.remove(root),
            _ => None,
        }
    }

    fn has_link(&self, root: &str) -> bool {
        match &*self.lock_links() {
            Links::PerRoot(map) => map.contains_key(root),
            Links::Workspace(_) => false,
        }
    }

    /// Handles the connection's close event: the entry goes `Closed` and
    /// every provider registered from its capabilities is disposed.
    fn handle_connection_closed(&self, scope: &ConnectionScope) {
        self.router.set_state(scope, ConnectionState::Closed);
        if let Some(link) = self.take_link(scope) {
            debug!(
                target: LIFECYCLE_TARGET,
                scope = ?scope,
                registrations = link.registrations.len(),
                "connection closed, disposing its registrations"
            );
            for registration in &link.registrations {
                registration.dispose();
            }
        }
    }

    fn dispose_all(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let drained = {
            let mut links = self.lock_links();
            match &mut *links {
                Links::Workspace(slot) => slot.take().into_iter().collect::<Vec<_>>(),
                Links::PerRoot(map) => map.drain().map(|(_, link)| link).collect(),
            }
        };
        for link in drained {
            link.dispose();
        }
        self.router.clear();
    }

    fn lock_links(&self) -> std::sync::MutexGuard<'_, Links> {
        self.links
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Aggregate handle returned by [`register`].
///
/// Disposing it unsubscribes from root-change notifications and disposes
/// every live connection and every provider registration derived from it.
/// Disposal is idempotent.
pub struct Registration {
    inner: Arc<SessionInner>,
    subscription: Disposable,
}

impl Registration {
    /// Tears down everything this registration created.
    pub fn dispose(&self) {
        self.subscription.dispose();
        self.inner.dispose_all();
    }

    /// Applies one root-change event.
    ///
    /// Events must arrive in emission order; the subscription installed by
    /// [`register`] routes the host's stream here.
    ///
    /// # Errors
    ///
    /// Returns [`RegisterError::Disposed`] after disposal and
    /// [`RegisterError::RootChangeUnsupported`] when a workspace-scoped
    /// connection is active (dispose and register again instead).
    pub fn apply_root_change(&self, event: RootChangeEvent) -> Result<(), RegisterError> {
        apply_root_change(&self.inner, event)
    }
}

/// Connects the extension host to the backend and exposes its features.
///
/// Opens one connection per workspace root, or a single workspace-scoped
/// connection when `options.supports_workspace_folders` is set; initialize
/// failures are logged and swallowed so one bad root cannot take down the
/// others. The returned [`Registration`] owns everything created here.
pub fn register(
    host: Arc<dyn ExtensionHost>,
    factory: Arc<dyn ConnectionFactory>,
    options: RegisterOptions,
) -> Registration {
    let workspace_scoped = options.supports_workspace_folders;
    let inner = Arc::new(SessionInner {
        host: Arc::clone(&host),
        factory,
        selector: options.document_selector,
        router: Arc::new(ConnectionRouter::new()),
        links: Mutex::new(if workspace_scoped {
            Links::Workspace(None)
        } else {
            Links::PerRoot(HashMap::new())
        }),
        workspace_scoped,
        disposed: AtomicBool::new(false),
    });

    let roots = host.workspace_roots();
    if workspace_scoped {
        open_workspace_connection(&inner, &roots);
    } else {
        for root in &roots {
            open_root_connection(&inner, root);
        }
    }

    let weak = Arc::downgrade(&inner);
    let subscription = host.subscribe_root_changes(Box::new(move |event| {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        if let Err(error) = apply_root_change(&inner, event) {
            warn!(
                target: LIFECYCLE_TARGET,
                error = %error,
                "ignoring root-change event"
            );
        }
    }));

    Registration {
        inner,
        subscription,
    }
}

fn apply_root_change(inner: &Arc<SessionInner>, event: RootChangeEvent) -> Result<(), RegisterError> {
    if inner.disposed.load(Ordering::SeqCst) {
        return Err(RegisterError::Disposed);
    }
    if inner.workspace_scoped {
        return Err(RegisterError::RootChangeUnsupported);
    }
    match event {
        RootChangeEvent::Added(root) => {
            if inner.has_link(&root.uri) {
                warn!(
                    target: LIFECYCLE_TARGET,
                    root = %root.uri,
                    "ignoring add for root that already has a connection"
                );
            } else {
                open_root_connection(inner, &root);
            }
        }
        RootChangeEvent::Removed(root) => remove_root(inner, &root),
    }
    Ok(())
}

/// Opens and initializes the single connection serving the whole workspace.
fn open_workspace_connection(inner: &Arc<SessionInner>, roots: &[WorkspaceRoot]) {
    let params = InitializeParams {
        root_uri: None,
        workspace_folders: Some(
            roots
                .iter()
                .map(|root| WorkspaceFolder::new(root.uri.clone()))
                .collect(),
        ),
        capabilities: client_capabilities(),
    };
    open_connection(inner, ConnectionScope::Workspace, params);
}

/// Opens and initializes the connection serving one root.
fn open_root_connection(inner: &Arc<SessionInner>, root: &WorkspaceRoot) {
    let params = InitializeParams {
        root_uri: Some(root.uri.clone()),
        workspace_folders: None,
        capabilities: client_capabilities(),
    };
    open_connection(inner, ConnectionScope::Root(root.uri.clone()), params);
}

fn open_connection(inner: &Arc<SessionInner>, scope: ConnectionScope, params: InitializeParams) {
    let connection = match inner.factory.create_connection() {
        Ok(connection) => connection,
        Err(error) => {
            warn!(
                target: LIFECYCLE_TARGET,
                scope = ?scope,
                error = %error,
                "failed to open backend connection"
            );
            return;
        }
    };

    inner.router.insert(scope.clone(), Arc::clone(&connection));

    match establish(inner, connection.as_ref(), &scope, &params) {
        Ok(capabilities) => {
            let registrations = register_for_capabilities(
                inner.host.as_ref(),
                &inner.router,
                &capabilities,
                &inner.selector,
                &scope,
            );
            inner.store_link(
                &scope,
                ConnectionLink {
                    connection: Arc::clone(&connection),
                    registrations,
                },
            );
            install_close_listener(inner, &connection, scope);
        }
        Err(error) => {
            // One root failing to initialize never affects the others.
            warn!(
                target: LIFECYCLE_TARGET,
                scope = ?scope,
                error = %error,
                "initialize failed, discarding connection"
            );
            inner.router.remove(&scope);
            connection.dispose();
        }
    }
}

/// Runs the initialize handshake and returns the advertised capabilities.
fn establish(
    inner: &Arc<SessionInner>,
    connection: &dyn Connection,
    scope: &ConnectionScope,
    params: &InitializeParams,
) -> Result<ServerCapabilities, ConnectionError> {
    inner.router.set_state(scope, ConnectionState::Initializing);
    let result: lsp_types::InitializeResult = request(connection, "initialize", params)?;
    notify(connection, "initialized", &InitializedParams {})?;
    inner.router.set_state(scope, ConnectionState::Ready);
    debug!(
        target: LIFECYCLE_TARGET,
        scope = ?scope,
        "backend connection ready"
    );
    Ok(result.capabilities)
}

fn install_close_listener(
    inner: &Arc<SessionInner>,
    connection: &Arc<dyn Connection>,
    scope: ConnectionScope,
) {
    let weak: Weak<SessionInner> = Arc::downgrade(inner);
    connection.on_close(Box::new(move || {
        if let Some(inner) = weak.upgrade() {
            inner.handle_connection_closed(&scope);
        }
    }));
}

/// Disposes exactly the connection created for a removed root.
///
/// The router entry goes first, unconditionally: after an external close
/// the link is already gone but its `Closed` entry would otherwise linger
/// and shadow a connection opened for the same root later.
fn remove_root(inner: &Arc<SessionInner>, root: &WorkspaceRoot) {
    let scope = ConnectionScope::Root(root.uri.clone());
    inner.router.remove(&scope);
    let Some(link) = inner.take_link(&scope) else {
        warn!(
            target: LIFECYCLE_TARGET,
            root = %root.uri,
            "no live connection for removed root"
        );
        return;
    };
    debug!(
        target: LIFECYCLE_TARGET,
        root = %root.uri,
        "closing connection for removed root"
    );
    link.dispose();
}
