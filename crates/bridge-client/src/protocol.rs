//! Wire shapes owned by the bridge.
//!
//! Most request and response bodies reuse `lsp_types` structs. The types
//! here exist where the exact JSON shape matters beyond what those structs
//! guarantee: the initialize request must carry explicit `rootUri: null` /
//! `workspaceFolders: null` markers, and backend locations arrive with
//! plain string URIs that still have to pass through the URI mapper.

use lsp_types::{ClientCapabilities, Location, Position, Range, ReferenceContext};
use serde::{Deserialize, Serialize};

use crate::errors::UriMapError;
use crate::uri;

/// Parameters of the one initialize request sent per connection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Root served by this connection, or `null` in multi-root mode.
    pub root_uri: Option<String>,
    /// All workspace roots in multi-root mode, or `null` otherwise.
    pub workspace_folders: Option<Vec<WorkspaceFolder>>,
    /// Client capabilities advertised to the backend.
    pub capabilities: ClientCapabilities,
}

/// One workspace folder inside the initialize request.
///
/// Only the URI is meaningful downstream; the name is left empty.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceFolder {
    /// Folder display name, always empty.
    pub name: String,
    /// Folder URI.
    pub uri: String,
}

impl WorkspaceFolder {
    /// Builds a folder entry for a root URI.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            uri: uri.into(),
        }
    }
}

/// `textDocument` reference carrying the backend's plain-string URI.
#[derive(Debug, Clone, Serialize)]
pub struct TextDocumentRef {
    /// Document URI in the backend's identity space.
    pub uri: String,
}

/// Parameters shared by every positional feature request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionParams {
    /// Document the request targets.
    pub text_document: TextDocumentRef,
    /// Zero-based line/character position, forwarded verbatim.
    pub position: Position,
}

impl PositionParams {
    /// Builds positional parameters for a backend document URI.
    #[must_use]
    pub fn new(backend_uri: String, position: Position) -> Self {
        Self {
            text_document: TextDocumentRef { uri: backend_uri },
            position,
        }
    }
}

/// Parameters of a `textDocument/references` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRequestParams {
    /// Document the request targets.
    pub text_document: TextDocumentRef,
    /// Zero-based line/character position, forwarded verbatim.
    pub position: Position,
    /// Whether the declaration itself counts as a reference.
    pub context: ReferenceContext,
}

/// A location as the backend serializes it: a plain URI string plus range.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendLocation {
    /// Document URI in the backend's identity space.
    pub uri: String,
    /// Zero-based start/end positions.
    pub range: Range,
}

impl BackendLocation {
    /// Converts into the host's location representation.
    ///
    /// # Errors
    ///
    /// Returns [`UriMapError`] when the backend URI does not parse.
    pub fn into_host(self) -> Result<Location, UriMapError> {
        Ok(Location {
            uri: uri::to_host_uri(&self.uri)?,
            range: self.range,
        })
    }
}

/// A backend result that is either a single value or a list.
///
/// `textDocument/definition` answers with `Location | Location[] | null`;
/// the `null` case is handled by the optional request helper before this
/// type is decoded.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A single value.
    One(T),
    /// A list of values.
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Flattens into a list.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}
