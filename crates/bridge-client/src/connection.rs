//! The backend connection seam and typed request helpers.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::ConnectionError;

/// Callback invoked once when a connection closes.
pub type CloseListener = Box<dyn Fn() + Send + Sync>;

/// Lifecycle of a single backend connection.
///
/// A connection never re-enters `Ready` after `Closed`; recovery means the
/// lifecycle manager creating a fresh connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Channel created, initialize not yet sent.
    Created,
    /// Initialize sent, response pending.
    Initializing,
    /// Handshake complete; requests may be issued.
    Ready,
    /// Channel closed; requests fail fast.
    Closed,
}

/// An open request/response channel to one backend server.
///
/// Implementations are supplied by a [`ConnectionFactory`]; the bridge
/// never spawns or frames anything itself. Disposal must be idempotent and
/// must not fail after the underlying channel already closed.
pub trait Connection: Send + Sync {
    /// Sends a request and blocks until its response arrives.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Backend`] for JSON-RPC error responses,
    /// [`ConnectionError::Closed`] once the channel is gone, and transport
    /// or codec errors otherwise.
    fn send_request(&self, method: &str, params: Value) -> Result<Value, ConnectionError>;

    /// Sends a notification; no response is expected.
    ///
    /// # Errors
    ///
    /// Returns transport or codec errors; never a backend error.
    fn send_notification(&self, method: &str, params: Value) -> Result<(), ConnectionError>;

    /// Registers a listener fired once when the connection closes, whether
    /// by disposal or by the channel dropping.
    fn on_close(&self, listener: CloseListener);

    /// Closes the connection. Safe to call any number of times.
    fn dispose(&self);

    /// Whether the connection has closed.
    fn is_closed(&self) -> bool;
}

impl fmt::Debug for dyn Connection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Connection")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Creates backend connections on demand.
///
/// The sole transport dependency of the bridge; injected by the caller of
/// [`crate::register`].
pub trait ConnectionFactory: Send + Sync {
    /// Opens a fresh connection to the backend server.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when the channel cannot be established.
    fn create_connection(&self) -> Result<Arc<dyn Connection>, ConnectionError>;
}

/// Sends a typed request and decodes a required result.
///
/// # Errors
///
/// Propagates connection failures; an absent result decodes as JSON `null`
/// and surfaces as a codec error for result types that reject it.
pub fn request<P, R>(
    connection: &dyn Connection,
    method: &str,
    params: &P,
) -> Result<R, ConnectionError>
where
    P: Serialize,
    R: DeserializeOwned,
{
    let params = serde_json::to_value(params)?;
    let result = connection.send_request(method, params)?;
    serde_json::from_value(result).map_err(ConnectionError::from)
}

/// Sends a typed request where the backend may answer `null`.
///
/// # Errors
///
/// Propagates connection failures.
pub fn request_optional<P, R>(
    connection: &dyn Connection,
    method: &str,
    params: &P,
) -> Result<Option<R>, ConnectionError>
where
    P: Serialize,
    R: DeserializeOwned,
{
    let params = serde_json::to_value(params)?;
    match connection.send_request(method, params)? {
        Value::Null => Ok(None),
        value => Ok(Some(serde_json::from_value(value)?)),
    }
}

/// Sends a typed notification.
///
/// # Errors
///
/// Propagates connection failures.
pub fn notify<P>(connection: &dyn Connection, method: &str, params: &P) -> Result<(), ConnectionError>
where
    P: Serialize,
{
    let params = serde_json::to_value(params)?;
    connection.send_notification(method, params)
}
