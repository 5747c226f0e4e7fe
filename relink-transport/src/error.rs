//! Error types for transport operations.

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Error type for a single connect attempt.
///
/// Connect errors never escape the client: the reconnect supervisor logs
/// them, fails over to the next endpoint and retries after a backoff.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Host name lookup failed.
    #[error("failed to resolve {endpoint}: {source}")]
    Resolve {
        /// Endpoint being resolved.
        endpoint: String,
        /// Underlying lookup error.
        #[source]
        source: std::io::Error,
    },

    /// Host resolved, but not to any IPv4 address.
    #[error("no IPv4 address for {endpoint}")]
    NoIpv4Address {
        /// Endpoint being resolved.
        endpoint: String,
    },

    /// Connect did not complete within the configured timeout.
    #[error("connect to {endpoint} timed out after {timeout:?}")]
    Timeout {
        /// Endpoint being connected to.
        endpoint: String,
        /// Configured connect timeout.
        timeout: Duration,
    },

    /// Connect was interrupted by a stop request.
    #[error("connect cancelled")]
    Cancelled,

    /// Socket creation, option setup or the connect itself failed.
    #[error("connect to {addr} failed: {source}")]
    Io {
        /// Resolved address.
        addr: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },
}

impl ConnectError {
    /// Returns `true` if the attempt was aborted by a stop request.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub(crate) fn io(addr: SocketAddr, source: std::io::Error) -> Self {
        Self::Io { addr, source }
    }
}
