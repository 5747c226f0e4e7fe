//! Foreground send path.

use crate::error::SendError;
use crate::shared::Shared;
use crate::state::ClientState;
use relink_transport::SocketLease;
use std::io::{self, ErrorKind};
use tokio_util::sync::CancellationToken;

/// Outcome of one write attempt made under the client lock.
enum Attempt {
    Wrote(usize),
    Blocked(SocketLease, CancellationToken),
    Failed(io::Error),
    /// The connection the send started on is gone.
    Lost,
}

/// Writes whole payloads to the live connection.
pub(crate) struct SendChannel<'a> {
    shared: &'a Shared,
}

impl<'a> SendChannel<'a> {
    pub(crate) fn new(shared: &'a Shared) -> Self {
        Self { shared }
    }

    /// Writes every byte of `payload` or reports failure.
    ///
    /// Fails immediately with [`SendError::NotConnected`] unless the client
    /// is connected. Every write is a single non-blocking syscall made under
    /// the client lock; would-block waits happen outside it and are bounded
    /// by the send poll timeout and by `stop()`. Any other failure drops the
    /// connection so the supervisor reconnects.
    pub(crate) async fn send(&self, payload: &[u8]) -> Result<(), SendError> {
        let Some(conn_id) = self.live_connection() else {
            return Err(SendError::NotConnected);
        };
        if payload.is_empty() {
            return Ok(());
        }

        let _writer = self.shared.writer.lock().await;
        let mut written = 0;

        while written < payload.len() {
            match self.attempt(conn_id, &payload[written..]) {
                Attempt::Wrote(n) => written += n,
                Attempt::Blocked(lease, cancel) => {
                    tracing::trace!(conn_id, written, "send would block");
                    if let Err(e) = self.wait_writable(&lease, &cancel).await {
                        return Err(self.fail(conn_id, e));
                    }
                }
                Attempt::Failed(e) => return Err(self.fail(conn_id, e)),
                Attempt::Lost if written == 0 => return Err(SendError::NotConnected),
                Attempt::Lost => {
                    return Err(SendError::failed(io::Error::new(
                        ErrorKind::ConnectionAborted,
                        format!("connection lost after {written} of {} bytes", payload.len()),
                    )));
                }
            }
        }

        tracing::trace!(conn_id, bytes = written, "payload sent");
        Ok(())
    }

    fn live_connection(&self) -> Option<u64> {
        let inner = self.shared.inner.lock();
        if inner.state != ClientState::Connected {
            return None;
        }
        inner.connection.connection_id()
    }

    fn attempt(&self, conn_id: u64, remaining: &[u8]) -> Attempt {
        let inner = self.shared.inner.lock();
        let lease = match inner.connection.lease() {
            Some(lease) if inner.state == ClientState::Connected && lease.id() == conn_id => lease,
            _ => return Attempt::Lost,
        };

        loop {
            return match lease.try_write(remaining) {
                Ok(0) => Attempt::Failed(ErrorKind::WriteZero.into()),
                Ok(n) => Attempt::Wrote(n),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    Attempt::Blocked(lease, inner.cancel.clone())
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => Attempt::Failed(e),
            };
        }
    }

    async fn wait_writable(&self, lease: &SocketLease, cancel: &CancellationToken) -> io::Result<()> {
        let timeout = self.shared.settings.send_poll_timeout;

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(io::Error::new(ErrorKind::ConnectionAborted, "client stopped")),
            ready = tokio::time::timeout(timeout, lease.writable()) => {
                ready.unwrap_or_else(|_| {
                    Err(io::Error::new(
                        ErrorKind::TimedOut,
                        format!("socket not writable within {timeout:?}"),
                    ))
                })
            }
        }
    }

    /// Drops connection `conn_id` if it is still the live one.
    fn fail(&self, conn_id: u64, error: io::Error) -> SendError {
        let notification = {
            let mut inner = self.shared.inner.lock();
            if inner.state == ClientState::Connected && inner.connection.close_if(conn_id) {
                inner.state = ClientState::Disconnected;
                Some(inner.hub.prepare(false))
            } else {
                None
            }
        };

        if let Some(notification) = notification {
            tracing::warn!(conn_id, error = %error, "send failed, connection dropped");
            notification.deliver();
        } else {
            tracing::debug!(conn_id, error = %error, "send failed on a replaced connection");
        }

        SendError::failed(error)
    }
}
