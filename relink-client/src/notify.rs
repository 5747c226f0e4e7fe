//! Connection-state notifications.
//!
//! The hub holds at most one listener. Transitions capture the listener
//! registered at that instant as a [`Notification`] while the client lock is
//! held, and deliver it after the lock is released. Delivery runs behind a
//! panic boundary so listener code can never unwind into the client.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Receives connection-state changes.
///
/// Implemented for every `Fn(bool) + Send + Sync` closure.
pub trait ConnectionListener: Send + Sync + 'static {
    /// Called with `true` after a connection is established and `false` when
    /// a connect attempt fails or a live connection is lost or stopped.
    fn on_connection_change(&self, connected: bool);
}

impl<F> ConnectionListener for F
where
    F: Fn(bool) + Send + Sync + 'static,
{
    fn on_connection_change(&self, connected: bool) {
        self(connected)
    }
}

/// Single-slot listener registry. Last write wins.
#[derive(Default)]
pub struct NotificationHub {
    listener: Option<Arc<dyn ConnectionListener>>,
}

impl NotificationHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the registered listener with a closure.
    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.listener = Some(Arc::new(callback));
    }

    /// Replaces the registered listener.
    pub fn set_listener(&mut self, listener: Arc<dyn ConnectionListener>) {
        self.listener = Some(listener);
    }

    /// Removes the registered listener.
    pub fn clear_callback(&mut self) {
        self.listener = None;
    }

    /// Returns `true` if a listener is registered.
    #[must_use]
    pub fn has_callback(&self) -> bool {
        self.listener.is_some()
    }

    /// Captures the current listener for a later [`Notification::deliver`].
    #[must_use]
    pub fn prepare(&self, connected: bool) -> Notification {
        Notification {
            listener: self.listener.clone(),
            connected,
        }
    }

    /// Invokes the current listener immediately.
    pub fn notify(&self, connected: bool) {
        self.prepare(connected).deliver();
    }
}

impl fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationHub")
            .field("has_callback", &self.has_callback())
            .finish()
    }
}

/// A captured state change awaiting delivery.
#[must_use = "a notification does nothing until delivered"]
pub struct Notification {
    listener: Option<Arc<dyn ConnectionListener>>,
    connected: bool,
}

impl Notification {
    /// Returns the state being reported.
    pub fn connected(&self) -> bool {
        self.connected
    }

    /// Invokes the captured listener on the current thread.
    ///
    /// A panic raised by the listener is caught, logged and discarded.
    pub fn deliver(self) {
        let Some(listener) = self.listener else {
            return;
        };

        let connected = self.connected;
        let result = catch_unwind(AssertUnwindSafe(|| {
            listener.on_connection_change(connected);
        }));

        if let Err(payload) = result {
            tracing::error!(
                connected,
                panic = panic_message(payload.as_ref()),
                "connection callback panicked"
            );
        }
    }
}

impl fmt::Debug for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notification")
            .field("connected", &self.connected)
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
