//! A [`Connection`] backed by a spawned backend process.
//!
//! Requests and responses travel over the child's stdio with
//! Content-Length framing. The protocol is request/response with
//! interleaved server traffic: notifications and backend-initiated
//! requests arriving while a response is pending are skipped with a
//! bounded scan.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::thread;
use std::time::Duration;

use bridge_client::{CloseListener, Connection, ConnectionError};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::error::{SpawnError, TransportError};
use crate::framing::FramedTransport;
use crate::jsonrpc::{IncomingMessage, Notification, Request, Response};

pub(crate) const TRANSPORT_TARGET: &str = "bridge_transport::connection";

/// Maximum interleaved messages scanned while waiting for one response.
const MAX_RESPONSE_SCAN: usize = 100;

/// Grace period before a lingering backend process is killed.
const EXIT_GRACE: Duration = Duration::from_millis(200);

type StdioTransport = FramedTransport<BufReader<ChildStdout>, ChildStdin>;

enum ChannelState {
    Open {
        child: Child,
        transport: StdioTransport,
    },
    Closed,
}

/// One backend server process, addressed over its stdio.
pub struct StdioConnection {
    state: Mutex<ChannelState>,
    next_id: AtomicI64,
    closed: AtomicBool,
    listeners: Mutex<Vec<CloseListener>>,
}

impl StdioConnection {
    /// Spawns the backend process and wires up its stdio.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnError`] when the binary is missing or the process
    /// fails to start with piped stdio.
    pub fn spawn(config: &ServerConfig) -> Result<Self, SpawnError> {
        debug!(
            target: TRANSPORT_TARGET,
            command = %config.command.display(),
            args = ?config.args,
            "spawning backend process"
        );

        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|error| {
            if error.kind() == std::io::ErrorKind::NotFound {
                SpawnError::BinaryNotFound {
                    command: config.command.display().to_string(),
                    source: error,
                }
            } else {
                SpawnError::Failed {
                    message: format!("failed to start {}", config.command.display()),
                    source: error,
                }
            }
        })?;

        let stdin = child.stdin.take().ok_or_else(|| SpawnError::Failed {
            message: String::from("failed to capture stdin"),
            source: std::io::Error::other("no stdin"),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| SpawnError::Failed {
            message: String::from("failed to capture stdout"),
            source: std::io::Error::other("no stdout"),
        })?;

        debug!(
            target: TRANSPORT_TARGET,
            pid = child.id(),
            "backend process spawned"
        );

        Ok(Self {
            state: Mutex::new(ChannelState::Open {
                child,
                transport: FramedTransport::new(BufReader::new(stdout), stdin),
            }),
            next_id: AtomicI64::new(1),
            closed: AtomicBool::new(false),
            listeners: Mutex::new(Vec::new()),
        })
    }

    fn with_open_transport<T>(
        &self,
        operation: impl FnOnce(&mut StdioTransport) -> Result<T, ConnectionError>,
    ) -> Result<T, ConnectionError> {
        let mut state = lock(&self.state);
        match &mut *state {
            ChannelState::Open { transport, .. } => operation(transport),
            ChannelState::Closed => Err(ConnectionError::Closed),
        }
    }

    /// Drops the channel after a transport failure and notifies listeners.
    fn mark_closed(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let previous = std::mem::replace(&mut *lock(&self.state), ChannelState::Closed);
        if let ChannelState::Open { mut child, .. } = previous {
            let _ = child.kill();
            let _ = child.wait();
        }
        self.fire_close_listeners();
    }

    fn fire_close_listeners(&self) {
        let listeners = std::mem::take(&mut *lock(&self.listeners));
        for listener in listeners {
            listener();
        }
    }
}

impl Connection for StdioConnection {
    fn send_request(&self, method: &str, params: Value) -> Result<Value, ConnectionError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let payload = serde_json::to_vec(&Request::new(id, method, params))?;

        debug!(target: TRANSPORT_TARGET, method, id, "sending request");

        let outcome = self.with_open_transport(|transport| {
            transport.send(&payload).map_err(ConnectionError::from)?;
            receive_response_for(transport, id)
        });
        let response = match outcome {
            Ok(response) => response,
            Err(error) => {
                // A broken pipe means the backend is gone for good.
                if matches!(error, ConnectionError::Transport(_)) {
                    self.mark_closed();
                }
                return Err(error);
            }
        };

        if let Some(error) = response.error {
            return Err(error.into());
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    fn send_notification(&self, method: &str, params: Value) -> Result<(), ConnectionError> {
        let payload = serde_json::to_vec(&Notification::new(method, params))?;

        debug!(target: TRANSPORT_TARGET, method, "sending notification");

        let outcome =
            self.with_open_transport(|transport| transport.send(&payload).map_err(Into::into));
        if let Err(error) = &outcome {
            if matches!(error, ConnectionError::Transport(_)) {
                self.mark_closed();
            }
        }
        outcome
    }

    fn on_close(&self, listener: CloseListener) {
        if self.closed.load(Ordering::SeqCst) {
            listener();
            return;
        }
        lock(&self.listeners).push(listener);
    }

    fn dispose(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let previous = std::mem::replace(&mut *lock(&self.state), ChannelState::Closed);
        if let ChannelState::Open {
            mut child,
            mut transport,
        } = previous
        {
            request_shutdown(&mut transport, self.next_id.fetch_add(1, Ordering::SeqCst));
            terminate_child(&mut child);
        }
        self.fire_close_listeners();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for StdioConnection {
    fn drop(&mut self) {
        let previous = std::mem::replace(&mut *lock(&self.state), ChannelState::Closed);
        if let ChannelState::Open { mut child, .. } = previous {
            if let Err(error) = child.kill() {
                warn!(
                    target: TRANSPORT_TARGET,
                    error = %error,
                    "failed to kill backend process on drop"
                );
            } else {
                let _ = child.wait();
            }
        }
    }
}

impl std::fmt::Debug for StdioConnection {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("StdioConnection")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Reads messages until the response with `request_id` arrives.
///
/// Interleaved notifications and backend requests are skipped; the scan is
/// bounded so a chatty backend cannot stall a request forever.
fn receive_response_for<R: BufRead, W: Write>(
    transport: &mut FramedTransport<R, W>,
    request_id: i64,
) -> Result<Response, ConnectionError> {
    for _ in 0..MAX_RESPONSE_SCAN {
        let bytes = transport.receive().map_err(ConnectionError::from)?;
        match IncomingMessage::from_bytes(&bytes)? {
            IncomingMessage::Response(response) => {
                if response.id == Some(request_id) {
                    return Ok(response);
                }
                warn!(
                    target: TRANSPORT_TARGET,
                    expected = request_id,
                    received = ?response.id,
                    "skipping response with non-matching ID"
                );
            }
            IncomingMessage::Request(request) => {
                warn!(
                    target: TRANSPORT_TARGET,
                    method = %request.method,
                    id = request.id,
                    "ignoring backend-initiated request"
                );
            }
            IncomingMessage::Notification(notification) => {
                debug!(
                    target: TRANSPORT_TARGET,
                    method = %notification.method,
                    "skipping backend notification"
                );
            }
        }
    }
    Err(TransportError::ResponseScanExceeded {
        request_id,
        scanned: MAX_RESPONSE_SCAN,
    }
    .into())
}

/// Best-effort `shutdown` request and `exit` notification.
fn request_shutdown(transport: &mut StdioTransport, request_id: i64) {
    let shutdown = Request::new(request_id, "shutdown", Value::Null);
    let outcome = serde_json::to_vec(&shutdown)
        .map_err(ConnectionError::from)
        .and_then(|payload| {
            transport.send(&payload)?;
            receive_response_for(transport, request_id)
        });
    if let Err(error) = outcome {
        debug!(
            target: TRANSPORT_TARGET,
            error = %error,
            "shutdown request failed"
        );
        return;
    }

    let exit = Notification::new("exit", Value::Null);
    let outcome = serde_json::to_vec(&exit)
        .map_err(ConnectionError::from)
        .and_then(|payload| transport.send(&payload).map_err(Into::into));
    if let Err(error) = outcome {
        debug!(
            target: TRANSPORT_TARGET,
            error = %error,
            "exit notification failed"
        );
    }
}

/// Waits for the child to exit, killing it after the grace period.
fn terminate_child(child: &mut Child) {
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(target: TRANSPORT_TARGET, ?status, "backend exited");
        }
        Ok(None) | Err(_) => {
            thread::sleep(EXIT_GRACE);
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(
                        target: TRANSPORT_TARGET,
                        ?status,
                        "backend exited during grace period"
                    );
                }
                Ok(None) | Err(_) => {
                    let _ = child.kill();
                    let _ = child.wait();
                }
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // Recover from poisoning so teardown still runs after a panic
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
