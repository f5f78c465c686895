//! JSON-RPC 2.0 message envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An outgoing request.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Protocol version, always "2.0".
    pub jsonrpc: &'static str,
    /// Request identifier, unique per connection.
    pub id: i64,
    /// The method to invoke.
    pub method: String,
    /// Request parameters.
    pub params: Value,
}

impl Request {
    /// Builds a request envelope.
    #[must_use]
    pub fn new(id: i64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// An outgoing notification; no response follows.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    /// Protocol version, always "2.0".
    pub jsonrpc: &'static str,
    /// The method to invoke.
    pub method: String,
    /// Notification parameters.
    pub params: Value,
}

impl Notification {
    /// Builds a notification envelope.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }
}

/// An incoming response.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Request identifier this response answers.
    pub id: Option<i64>,
    /// The result on success.
    #[serde(default)]
    pub result: Option<Value>,
    /// The error on failure.
    #[serde(default)]
    pub error: Option<RpcError>,
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional data.
    #[serde(default)]
    pub data: Option<Value>,
}

/// An incoming request initiated by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingRequest {
    /// Request identifier the backend expects an answer for.
    pub id: i64,
    /// The method the backend invokes.
    pub method: String,
}

/// An incoming notification from the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingNotification {
    /// The method the backend invokes.
    pub method: String,
}

/// Any message the backend can send.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// A response to one of our requests.
    Response(Response),
    /// A backend-initiated request.
    Request(IncomingRequest),
    /// A backend notification.
    Notification(IncomingNotification),
}

impl IncomingMessage {
    /// Classifies and decodes one raw message.
    ///
    /// A message with a `method` and an `id` is a backend request; with a
    /// `method` alone, a notification; anything else must be a response.
    ///
    /// # Errors
    ///
    /// Returns the decode error when the bytes are not a JSON-RPC message.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(bytes)?;
        if value.get("method").is_some() {
            if value.get("id").is_some() {
                return Ok(Self::Request(serde_json::from_value(value)?));
            }
            return Ok(Self::Notification(serde_json::from_value(value)?));
        }
        Ok(Self::Response(serde_json::from_value(value)?))
    }
}
