//! Recording doubles standing in for the extension host and the backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use crate::connection::{CloseListener, Connection, ConnectionFactory};
use crate::dispose::Disposable;
use crate::errors::ConnectionError;
use crate::host::{
    DocumentSelector, ExtensionHost, RootChangeEvent, RootChangeListener, WorkspaceRoot,
};
use crate::providers::{DefinitionProvider, HoverProvider, ReferenceProvider};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// A backend connection that records traffic and answers from a script.
///
/// Methods without a scripted response answer `null`, which matches a
/// backend with nothing to say.
pub(crate) struct RecordingConnection {
    requests: Mutex<Vec<(String, Value)>>,
    notifications: Mutex<Vec<(String, Value)>>,
    responses: Mutex<HashMap<String, Value>>,
    errors: Mutex<HashMap<String, (i64, String)>>,
    fail_requests: AtomicBool,
    closed: AtomicBool,
    listeners: Mutex<Vec<CloseListener>>,
}

impl RecordingConnection {
    /// A connection whose initialize response advertises `capabilities`.
    pub(crate) fn with_capabilities(capabilities: Value) -> Arc<Self> {
        let connection = Self::empty();
        connection.respond_to("initialize", json!({ "capabilities": capabilities }));
        connection
    }

    /// A connection advertising every feature the bridge knows about.
    pub(crate) fn fully_featured() -> Arc<Self> {
        Self::with_capabilities(json!({
            "referencesProvider": true,
            "definitionProvider": true,
            "hoverProvider": true,
        }))
    }

    /// A connection that fails every request, initialize included.
    pub(crate) fn failing() -> Arc<Self> {
        let connection = Self::empty();
        connection.fail_requests.store(true, Ordering::SeqCst);
        connection
    }

    fn empty() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
            responses: Mutex::new(HashMap::new()),
            errors: Mutex::new(HashMap::new()),
            fail_requests: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// Scripts the response for one method.
    pub(crate) fn respond_to(&self, method: &str, response: Value) {
        lock(&self.responses).insert(method.to_owned(), response);
    }

    /// Scripts a JSON-RPC error response for one method.
    pub(crate) fn fail_method(&self, method: &str, code: i64, message: &str) {
        lock(&self.errors).insert(method.to_owned(), (code, message.to_owned()));
    }

    /// Every notification sent so far, in order.
    pub(crate) fn notifications(&self) -> Vec<(String, Value)> {
        lock(&self.notifications).clone()
    }

    /// Parameters of the first request with the given method.
    pub(crate) fn request_params(&self, method: &str) -> Option<Value> {
        lock(&self.requests)
            .iter()
            .find(|(sent, _)| sent == method)
            .map(|(_, params)| params.clone())
    }

    /// Drops the channel as if the backend process died.
    pub(crate) fn simulate_close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let listeners = std::mem::take(&mut *lock(&self.listeners));
        for listener in listeners {
            listener();
        }
    }
}

impl Connection for RecordingConnection {
    fn send_request(&self, method: &str, params: Value) -> Result<Value, ConnectionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ConnectionError::Closed);
        }
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(ConnectionError::Backend {
                code: -32603,
                message: String::from("internal error"),
            });
        }
        lock(&self.requests).push((method.to_owned(), params));
        if let Some((code, message)) = lock(&self.errors).get(method) {
            return Err(ConnectionError::Backend {
                code: *code,
                message: message.clone(),
            });
        }
        Ok(lock(&self.responses)
            .get(method)
            .cloned()
            .unwrap_or(Value::Null))
    }

    fn send_notification(&self, method: &str, params: Value) -> Result<(), ConnectionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ConnectionError::Closed);
        }
        lock(&self.notifications).push((method.to_owned(), params));
        Ok(())
    }

    fn on_close(&self, listener: CloseListener) {
        lock(&self.listeners).push(listener);
    }

    fn dispose(&self) {
        self.simulate_close();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Hands out pre-built connections in FIFO order.
pub(crate) struct RecordingFactory {
    script: Mutex<Vec<ScriptEntry>>,
}

enum ScriptEntry {
    Connection(Arc<RecordingConnection>),
    Refused,
}

impl RecordingFactory {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Vec::new()),
        })
    }

    /// Queues a connection for the next `create_connection` call.
    pub(crate) fn push(&self, connection: &Arc<RecordingConnection>) {
        lock(&self.script).push(ScriptEntry::Connection(Arc::clone(connection)));
    }

    /// Queues a refused-connection failure.
    pub(crate) fn push_refusal(&self) {
        lock(&self.script).push(ScriptEntry::Refused);
    }

    /// Number of connections still queued.
    pub(crate) fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

impl ConnectionFactory for RecordingFactory {
    fn create_connection(&self) -> Result<Arc<dyn Connection>, ConnectionError> {
        let mut script = lock(&self.script);
        if script.is_empty() {
            return Err(ConnectionError::transport("no scripted connection left"));
        }
        match script.remove(0) {
            ScriptEntry::Connection(connection) => Ok(connection),
            ScriptEntry::Refused => Err(ConnectionError::transport("connection refused")),
        }
    }
}

/// Which registration call a provider arrived through.
#[derive(Clone)]
pub(crate) enum RegisteredProvider {
    Definition(Arc<dyn DefinitionProvider>),
    References(Arc<dyn ReferenceProvider>),
    Hover(Arc<dyn HoverProvider>),
}

impl RegisteredProvider {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Definition(_) => "definition",
            Self::References(_) => "references",
            Self::Hover(_) => "hover",
        }
    }

    pub(crate) fn as_definition(&self) -> &Arc<dyn DefinitionProvider> {
        match self {
            Self::Definition(provider) => provider,
            _ => panic!("expected a definition provider, got {}", self.kind()),
        }
    }

    pub(crate) fn as_references(&self) -> &Arc<dyn ReferenceProvider> {
        match self {
            Self::References(provider) => provider,
            _ => panic!("expected a reference provider, got {}", self.kind()),
        }
    }

    pub(crate) fn as_hover(&self) -> &Arc<dyn HoverProvider> {
        match self {
            Self::Hover(provider) => provider,
            _ => panic!("expected a hover provider, got {}", self.kind()),
        }
    }
}

/// One provider registration observed by the host double.
pub(crate) struct RegistrationRecord {
    pub(crate) selector: DocumentSelector,
    pub(crate) provider: RegisteredProvider,
    disposed: AtomicBool,
}

impl RegistrationRecord {
    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

struct Subscription {
    listener: RootChangeListener,
    active: Arc<AtomicBool>,
}

/// An extension host that records registrations and replays root changes.
pub(crate) struct RecordingHost {
    roots: Mutex<Vec<WorkspaceRoot>>,
    subscriptions: Mutex<Vec<Subscription>>,
    registrations: Mutex<Vec<Arc<RegistrationRecord>>>,
}

impl RecordingHost {
    pub(crate) fn with_roots(roots: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            roots: Mutex::new(roots.iter().map(|root| WorkspaceRoot::new(*root)).collect()),
            subscriptions: Mutex::new(Vec::new()),
            registrations: Mutex::new(Vec::new()),
        })
    }

    /// Delivers one root-change event to every live subscriber, updating
    /// the root snapshot first the way a real host would.
    pub(crate) fn emit(&self, event: RootChangeEvent) {
        {
            let mut roots = lock(&self.roots);
            match &event {
                RootChangeEvent::Added(root) => roots.push(root.clone()),
                RootChangeEvent::Removed(root) => roots.retain(|existing| existing != root),
            }
        }
        let subscriptions = lock(&self.subscriptions);
        for subscription in subscriptions.iter() {
            if subscription.active.load(Ordering::SeqCst) {
                (subscription.listener)(event.clone());
            }
        }
    }

    /// Registrations not yet disposed.
    pub(crate) fn live_registrations(&self) -> Vec<Arc<RegistrationRecord>> {
        lock(&self.registrations)
            .iter()
            .filter(|record| !record.is_disposed())
            .cloned()
            .collect()
    }

    /// The live registration for one feature kind, which must be unique.
    pub(crate) fn live_registration(&self, kind: &str) -> Arc<RegistrationRecord> {
        let matches: Vec<_> = self
            .live_registrations()
            .into_iter()
            .filter(|record| record.provider.kind() == kind)
            .collect();
        assert_eq!(matches.len(), 1, "expected one live {kind} registration");
        matches.into_iter().next().expect("checked above")
    }

    /// Whether any root-change subscription is still active.
    pub(crate) fn has_active_subscription(&self) -> bool {
        lock(&self.subscriptions)
            .iter()
            .any(|subscription| subscription.active.load(Ordering::SeqCst))
    }

    fn record(&self, selector: DocumentSelector, provider: RegisteredProvider) -> Disposable {
        let record = Arc::new(RegistrationRecord {
            selector,
            provider,
            disposed: AtomicBool::new(false),
        });
        lock(&self.registrations).push(Arc::clone(&record));
        Disposable::new(move || record.disposed.store(true, Ordering::SeqCst))
    }
}

impl ExtensionHost for RecordingHost {
    fn workspace_roots(&self) -> Vec<WorkspaceRoot> {
        lock(&self.roots).clone()
    }

    fn subscribe_root_changes(&self, listener: RootChangeListener) -> Disposable {
        let active = Arc::new(AtomicBool::new(true));
        lock(&self.subscriptions).push(Subscription {
            listener,
            active: Arc::clone(&active),
        });
        Disposable::new(move || active.store(false, Ordering::SeqCst))
    }

    fn register_definition_provider(
        &self,
        selector: DocumentSelector,
        provider: Arc<dyn DefinitionProvider>,
    ) -> Disposable {
        self.record(selector, RegisteredProvider::Definition(provider))
    }

    fn register_reference_provider(
        &self,
        selector: DocumentSelector,
        provider: Arc<dyn ReferenceProvider>,
    ) -> Disposable {
        self.record(selector, RegisteredProvider::References(provider))
    }

    fn register_hover_provider(
        &self,
        selector: DocumentSelector,
        provider: Arc<dyn HoverProvider>,
    ) -> Disposable {
        self.record(selector, RegisteredProvider::Hover(provider))
    }
}

/// Registers the bridge against the recording doubles.
pub(crate) fn bridge(
    host: &Arc<RecordingHost>,
    factory: &Arc<RecordingFactory>,
    options: crate::lifecycle::RegisterOptions,
) -> crate::lifecycle::Registration {
    crate::lifecycle::register(
        Arc::clone(host) as Arc<dyn ExtensionHost>,
        Arc::clone(factory) as Arc<dyn ConnectionFactory>,
        options,
    )
}

/// A plain-language selector with no scheme or pattern restriction.
pub(crate) fn language_selector(language: &str) -> DocumentSelector {
    vec![lsp_types::DocumentFilter {
        language: Some(language.to_owned()),
        scheme: None,
        pattern: None,
    }]
}
