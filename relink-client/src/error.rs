//! Error types for client operations.

use relink_core::ConfigError;
use thiserror::Error;

/// Error type for client construction.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid endpoint list or client setting.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Send failure surfaced through a `?` in caller code.
    #[error("send error: {0}")]
    Send(#[from] SendError),
}

/// Error returned by [`Client::send`](crate::Client::send).
///
/// A failed send downgrades the client to `Disconnected` so the reconnect
/// supervisor repairs the connection on its next cycle. Callers may retry.
#[derive(Debug, Error)]
pub enum SendError {
    /// The client holds no live connection.
    #[error("not connected")]
    NotConnected,

    /// Writing to the live connection failed; part of the payload may have
    /// reached the peer.
    #[error("send failed: {source}")]
    SendFailed {
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },
}

impl SendError {
    pub(crate) fn failed(source: std::io::Error) -> Self {
        Self::SendFailed { source }
    }

    /// Returns `true` if the send was rejected without touching a socket.
    #[must_use]
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected)
    }
}
