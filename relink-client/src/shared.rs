//! State shared between the client handle, the send path and the supervisor.

use crate::notify::NotificationHub;
use crate::reconnect::ReconnectConfig;
use crate::state::ClientState;
use parking_lot::Mutex;
use relink_core::ServerPool;
use relink_transport::{ConnectOptions, ConnectionManager};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Immutable settings fixed at build time.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) connect: ConnectOptions,
    pub(crate) reconnect: ReconnectConfig,
    pub(crate) send_poll_timeout: Duration,
}

/// Everything behind the client lock.
///
/// The lock is held only for state reads and writes plus single
/// non-blocking socket calls, never across an `.await`.
#[derive(Debug)]
pub(crate) struct Inner {
    pub(crate) state: ClientState,
    pub(crate) running: bool,
    pub(crate) connection: ConnectionManager,
    pub(crate) pool: ServerPool,
    pub(crate) hub: NotificationHub,
    /// Cancelled by `stop()`; replaced by every `start()`.
    pub(crate) cancel: CancellationToken,
    pub(crate) tasks: TaskTracker,
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) inner: Mutex<Inner>,
    /// Serializes whole payloads so concurrent sends never interleave bytes.
    pub(crate) writer: tokio::sync::Mutex<()>,
    pub(crate) settings: Settings,
}

impl Shared {
    pub(crate) fn new(pool: ServerPool, hub: NotificationHub, settings: Settings) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ClientState::Disconnected,
                running: false,
                connection: ConnectionManager::new(),
                pool,
                hub,
                cancel: CancellationToken::new(),
                tasks: TaskTracker::new(),
            }),
            writer: tokio::sync::Mutex::new(()),
            settings,
        }
    }
}
