//! Capability negotiation and dynamic provider registration.

use std::sync::Arc;

use lsp_types::{
    ClientCapabilities, GotoCapability, HoverClientCapabilities, HoverProviderCapability,
    MarkupKind, OneOf, ReferenceClientCapabilities, ServerCapabilities,
    TextDocumentClientCapabilities,
};
use tracing::debug;

use crate::dispose::Disposable;
use crate::host::{DocumentSelector, ExtensionHost};
use crate::providers::{BackendDefinitionProvider, BackendHoverProvider, BackendReferenceProvider};
use crate::routing::{ConnectionRouter, ConnectionScope};
use crate::uri;

const CAPABILITY_TARGET: &str = "bridge_client::capability";

/// A backend feature the bridge can expose as a host provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    /// `textDocument/references`.
    References,
    /// `textDocument/definition`.
    Definition,
    /// `textDocument/hover`.
    Hover,
}

impl CapabilityKind {
    /// The capability flag the backend advertises in its initialize result.
    #[must_use]
    pub fn flag(self) -> &'static str {
        match self {
            Self::References => "referencesProvider",
            Self::Definition => "definitionProvider",
            Self::Hover => "hoverProvider",
        }
    }
}

/// Every feature the registrar knows how to expose, in registration order.
///
/// Adding a feature means adding a variant, a row here, and one arm in
/// [`register_for_capabilities`]; existing rows are never touched.
pub const CAPABILITY_TABLE: &[CapabilityKind] = &[
    CapabilityKind::References,
    CapabilityKind::Definition,
    CapabilityKind::Hover,
];

/// Client capabilities advertised on every initialize request.
///
/// Dynamic registration is claimed for each feature in the table, and
/// markdown hover content is accepted, regardless of what the backend
/// turns out to support.
#[must_use]
pub fn client_capabilities() -> ClientCapabilities {
    ClientCapabilities {
        text_document: Some(TextDocumentClientCapabilities {
            references: Some(ReferenceClientCapabilities {
                dynamic_registration: Some(true),
            }),
            definition: Some(GotoCapability {
                dynamic_registration: Some(true),
                link_support: None,
            }),
            hover: Some(HoverClientCapabilities {
                dynamic_registration: Some(true),
                content_format: Some(vec![MarkupKind::Markdown]),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Whether the backend advertised a feature.
///
/// A bare `true` and a richer options object both count; `false` and an
/// absent flag do not.
#[must_use]
pub fn supports(capabilities: &ServerCapabilities, kind: CapabilityKind) -> bool {
    match kind {
        CapabilityKind::References => truthy_one_of(capabilities.references_provider.as_ref()),
        CapabilityKind::Definition => truthy_one_of(capabilities.definition_provider.as_ref()),
        CapabilityKind::Hover => match capabilities.hover_provider.as_ref() {
            Some(HoverProviderCapability::Simple(simple)) => *simple,
            Some(HoverProviderCapability::Options(_)) => true,
            None => false,
        },
    }
}

fn truthy_one_of<T>(flag: Option<&OneOf<bool, T>>) -> bool {
    match flag {
        Some(OneOf::Left(simple)) => *simple,
        Some(OneOf::Right(_)) => true,
        None => false,
    }
}

/// Narrows a selector to a connection's scope.
///
/// Root-scoped connections get every filter copied with a `<root>/**`
/// pattern so the host routes documents under that root here; a
/// workspace-scoped connection uses the caller's selector unmodified.
#[must_use]
pub fn scoped_selector(selector: &DocumentSelector, scope: &ConnectionScope) -> DocumentSelector {
    match scope.root() {
        None => selector.clone(),
        Some(root) => {
            let pattern = uri::scope_pattern(root);
            selector
                .iter()
                .map(|filter| {
                    let mut scoped = filter.clone();
                    scoped.pattern = Some(pattern.clone());
                    scoped
                })
                .collect()
        }
    }
}

/// Registers one provider per advertised feature and returns the handles.
///
/// Called once per connection, after its initialize response arrives. The
/// returned registrations are owned by the connection's lifecycle entry and
/// disposed when it closes.
pub fn register_for_capabilities(
    host: &dyn ExtensionHost,
    router: &Arc<ConnectionRouter>,
    capabilities: &ServerCapabilities,
    selector: &DocumentSelector,
    scope: &ConnectionScope,
) -> Vec<Disposable> {
    let mut registrations = Vec::new();
    for kind in CAPABILITY_TABLE.iter().copied() {
        if !supports(capabilities, kind) {
            continue;
        }
        debug!(
            target: CAPABILITY_TARGET,
            flag = kind.flag(),
            scope = ?scope,
            "registering provider for advertised capability"
        );
        let selector = scoped_selector(selector, scope);
        let registration = match kind {
            CapabilityKind::References => host.register_reference_provider(
                selector,
                Arc::new(BackendReferenceProvider::new(Arc::clone(router))),
            ),
            CapabilityKind::Definition => host.register_definition_provider(
                selector,
                Arc::new(BackendDefinitionProvider::new(Arc::clone(router))),
            ),
            CapabilityKind::Hover => host.register_hover_provider(
                selector,
                Arc::new(BackendHoverProvider::new(Arc::clone(router))),
            ),
        };
        registrations.push(registration);
    }
    registrations
}
