//! Background reconnect supervisor.

use crate::reconnect::ReconnectState;
use crate::shared::Shared;
use crate::state::ClientState;
use relink_core::Endpoint;
use relink_transport::{ConnectError, ConnectionManager};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

enum Step {
    Idle,
    Connect(Endpoint),
}

/// Keeps the client connected until its cancellation token fires.
///
/// While disconnected it connects to the pool's current endpoint, failing
/// over to the next endpoint after each failed attempt. While connected it
/// only idles; send failures are what move the client back to
/// `Disconnected`. Every wait is interrupted by the token, and every
/// transition re-checks the token under the client lock so a supervisor
/// outliving its `stop()` never touches the next lifecycle's state.
pub(crate) struct ReconnectSupervisor {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    backoff: ReconnectState,
}

impl ReconnectSupervisor {
    pub(crate) fn new(shared: Arc<Shared>, cancel: CancellationToken) -> Self {
        let backoff = ReconnectState::new(shared.settings.reconnect.clone());
        Self {
            shared,
            cancel,
            backoff,
        }
    }

    pub(crate) async fn run(mut self) {
        tracing::info!("reconnect supervisor started");

        loop {
            let step = {
                let mut inner = self.shared.inner.lock();
                if self.cancel.is_cancelled() || inner.state == ClientState::Stopped {
                    break;
                }
                match inner.state {
                    ClientState::Connected => Step::Idle,
                    _ => {
                        inner.state = ClientState::Connecting;
                        Step::Connect(inner.pool.current().clone())
                    }
                }
            };

            let delay = match step {
                Step::Idle => self.backoff.health_interval(),
                Step::Connect(endpoint) => self.attempt(endpoint).await,
            };

            if !self.pause(delay).await {
                break;
            }
        }

        tracing::info!("reconnect supervisor stopped");
    }

    /// Runs one connect attempt and returns how long to wait afterwards.
    async fn attempt(&mut self, endpoint: Endpoint) -> Duration {
        tracing::debug!(%endpoint, attempt = self.backoff.attempts() + 1, "connecting");
        let result =
            ConnectionManager::connect(&endpoint, &self.shared.settings.connect, &self.cancel).await;

        match result {
            Ok(stream) => {
                let installed = {
                    let mut inner = self.shared.inner.lock();
                    if self.cancel.is_cancelled() {
                        None
                    } else {
                        let id = inner.connection.install(stream);
                        inner.state = ClientState::Connected;
                        Some((id, inner.hub.prepare(true)))
                    }
                };

                let Some((id, notification)) = installed else {
                    return Duration::ZERO;
                };
                tracing::info!(%endpoint, conn_id = id, "connected");
                self.backoff.on_success();
                notification.deliver();
                self.backoff.health_interval()
            }
            Err(ConnectError::Cancelled) => Duration::ZERO,
            Err(e) => {
                let failed_over = {
                    let mut inner = self.shared.inner.lock();
                    if self.cancel.is_cancelled() {
                        None
                    } else {
                        inner.state = ClientState::Disconnected;
                        inner.pool.advance();
                        Some((inner.pool.current().clone(), inner.hub.prepare(false)))
                    }
                };

                let Some((next, notification)) = failed_over else {
                    return Duration::ZERO;
                };
                let delay = self.backoff.on_failure();
                tracing::warn!(%endpoint, error = %e, %next, retry_in = ?delay, "connect failed");
                notification.deliver();
                delay
            }
        }
    }

    /// Sleeps for `delay`; returns `false` if cancelled first.
    async fn pause(&self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        }
    }
}
