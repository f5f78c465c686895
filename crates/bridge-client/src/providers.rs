//! Per-feature adapters between extension-host invocations and backend
//! requests.
//!
//! Each provider translates (document, position, options) into one backend
//! request over the connection that owns the document, then translates the
//! result back into the host's data model. Providers never retry; a backend
//! error propagates to the host's invocation as-is.

use std::sync::Arc;

use lsp_types::{Hover, Location, Position, ReferenceContext, TextDocumentIdentifier};

use crate::connection::request_optional;
use crate::errors::ProviderError;
use crate::protocol::{BackendLocation, OneOrMany, PositionParams, ReferenceRequestParams};
use crate::routing::ConnectionRouter;
use crate::uri;

/// Answers go-to-definition queries for matching documents.
pub trait DefinitionProvider: Send + Sync {
    /// Resolves the definition locations for a position in a document.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when routing or the backend request fails.
    fn provide_definition(
        &self,
        document: &TextDocumentIdentifier,
        position: Position,
    ) -> Result<Vec<Location>, ProviderError>;
}

/// Answers find-references queries for matching documents.
pub trait ReferenceProvider: Send + Sync {
    /// Resolves all references to the symbol at a position.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when routing or the backend request fails.
    fn provide_references(
        &self,
        document: &TextDocumentIdentifier,
        position: Position,
        context: ReferenceContext,
    ) -> Result<Vec<Location>, ProviderError>;
}

/// Answers hover queries for matching documents.
pub trait HoverProvider: Send + Sync {
    /// Resolves hover content for a position, if the backend has any.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when routing or the backend request fails.
    fn provide_hover(
        &self,
        document: &TextDocumentIdentifier,
        position: Position,
    ) -> Result<Option<Hover>, ProviderError>;
}

/// Definition provider backed by a backend connection.
pub struct BackendDefinitionProvider {
    router: Arc<ConnectionRouter>,
}

impl BackendDefinitionProvider {
    /// Builds a provider routing through the shared connection set.
    #[must_use]
    pub fn new(router: Arc<ConnectionRouter>) -> Self {
        Self { router }
    }
}

impl DefinitionProvider for BackendDefinitionProvider {
    fn provide_definition(
        &self,
        document: &TextDocumentIdentifier,
        position: Position,
    ) -> Result<Vec<Location>, ProviderError> {
        let backend_uri = uri::to_backend_uri(&document.uri);
        let connection = self.router.route(&backend_uri)?;
        let params = PositionParams::new(backend_uri, position);

        let result: Option<OneOrMany<BackendLocation>> =
            request_optional(connection.as_ref(), "textDocument/definition", &params)?;
        locations_to_host(result)
    }
}

/// Reference provider backed by a backend connection.
pub struct BackendReferenceProvider {
    router: Arc<ConnectionRouter>,
}

impl BackendReferenceProvider {
    /// Builds a provider routing through the shared connection set.
    #[must_use]
    pub fn new(router: Arc<ConnectionRouter>) -> Self {
        Self { router }
    }
}

impl ReferenceProvider for BackendReferenceProvider {
    fn provide_references(
        &self,
        document: &TextDocumentIdentifier,
        position: Position,
        context: ReferenceContext,
    ) -> Result<Vec<Location>, ProviderError> {
        let backend_uri = uri::to_backend_uri(&document.uri);
        let connection = self.router.route(&backend_uri)?;
        let params = ReferenceRequestParams {
            text_document: crate::protocol::TextDocumentRef { uri: backend_uri },
            position,
            context,
        };

        let result: Option<OneOrMany<BackendLocation>> =
            request_optional(connection.as_ref(), "textDocument/references", &params)?;
        locations_to_host(result)
    }
}

/// Hover provider backed by a backend connection.
pub struct BackendHoverProvider {
    router: Arc<ConnectionRouter>,
}

impl BackendHoverProvider {
    /// Builds a provider routing through the shared connection set.
    #[must_use]
    pub fn new(router: Arc<ConnectionRouter>) -> Self {
        Self { router }
    }
}

impl HoverProvider for BackendHoverProvider {
    fn provide_hover(
        &self,
        document: &TextDocumentIdentifier,
        position: Position,
    ) -> Result<Option<Hover>, ProviderError> {
        let backend_uri = uri::to_backend_uri(&document.uri);
        let connection = self.router.route(&backend_uri)?;
        let params = PositionParams::new(backend_uri, position);

        // Contents pass through unchanged; only the envelope is decoded.
        let hover: Option<Hover> =
            request_optional(connection.as_ref(), "textDocument/hover", &params)?;
        Ok(hover)
    }
}

/// Converts an optional backend location result into host locations.
///
/// An absent result translates to an empty list.
fn locations_to_host(
    result: Option<OneOrMany<BackendLocation>>,
) -> Result<Vec<Location>, ProviderError> {
    result
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .map(|location| location.into_host().map_err(ProviderError::from))
        .collect()
}
