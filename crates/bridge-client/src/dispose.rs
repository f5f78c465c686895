//! Idempotent teardown handles.

use std::fmt;
use std::sync::Mutex;

/// A teardown action that runs at most once.
///
/// Hosts and connections hand these out for everything that must be undone
/// later (provider registrations, event subscriptions, connections).
/// Disposing twice, or disposing after the underlying resource already went
/// away, is always a no-op.
pub struct Disposable {
    action: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Disposable {
    /// Wraps a teardown action.
    #[must_use]
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Mutex::new(Some(Box::new(action))),
        }
    }

    /// Runs the teardown action if it has not run yet.
    pub fn dispose(&self) {
        let action = self
            .action
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(action) = action {
            action();
        }
    }

    /// Whether the teardown action has already run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.action
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .is_none()
    }
}

impl fmt::Debug for Disposable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Disposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
