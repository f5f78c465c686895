//! The extension-host collaborator seam.
//!
//! The bridge never talks to a concrete editor API. Everything it needs
//! from the surrounding extension host — the current workspace roots, a
//! stream of root changes, and the per-feature provider registration
//! calls — is injected through [`ExtensionHost`], so tests and embedders
//! can supply lightweight implementations.

use std::sync::Arc;

use lsp_types::DocumentFilter;

use crate::dispose::Disposable;
use crate::providers::{DefinitionProvider, HoverProvider, ReferenceProvider};

/// Language filter plus URI glob restricting which documents a provider
/// serves.
pub type DocumentSelector = Vec<DocumentFilter>;

/// A workspace folder observed from the extension host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceRoot {
    /// Root URI. Opaque to the bridge beyond prefix scoping.
    pub uri: String,
}

impl WorkspaceRoot {
    /// Builds a root from its URI.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

/// One entry on the ordered root-change stream.
///
/// The host owns the root collection; the bridge only applies these events,
/// in emission order, to keep its connection set consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootChangeEvent {
    /// A root was added to the workspace.
    Added(WorkspaceRoot),
    /// A root was removed from the workspace.
    Removed(WorkspaceRoot),
}

/// Callback invoked by the host for each root-change event.
pub type RootChangeListener = Box<dyn Fn(RootChangeEvent) + Send + Sync>;

/// Narrow view of the editor extension API consumed by the bridge.
pub trait ExtensionHost: Send + Sync {
    /// Snapshot of the current workspace roots, in host order.
    fn workspace_roots(&self) -> Vec<WorkspaceRoot>;

    /// Subscribes to root-change events; disposing the returned handle
    /// unsubscribes.
    fn subscribe_root_changes(&self, listener: RootChangeListener) -> Disposable;

    /// Registers a go-to-definition provider for matching documents.
    fn register_definition_provider(
        &self,
        selector: DocumentSelector,
        provider: Arc<dyn DefinitionProvider>,
    ) -> Disposable;

    /// Registers a find-references provider for matching documents.
    fn register_reference_provider(
        &self,
        selector: DocumentSelector,
        provider: Arc<dyn ReferenceProvider>,
    ) -> Disposable;

    /// Registers a hover provider for matching documents.
    fn register_hover_provider(
        &self,
        selector: DocumentSelector,
        provider: Arc<dyn HoverProvider>,
    ) -> Disposable;
}
