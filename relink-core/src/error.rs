//! Error types for relink configuration.

use thiserror::Error;

/// Error raised when an endpoint list or client setting is invalid.
///
/// Configuration errors are fatal: they are reported at construction time
/// and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The endpoint list is empty.
    #[error("server pool must contain at least one endpoint")]
    EmptyPool,

    /// Parallel host and port lists have different lengths.
    #[error("host/port count mismatch: {hosts} hosts, {ports} ports")]
    LengthMismatch {
        /// Number of hosts supplied.
        hosts: usize,
        /// Number of ports supplied.
        ports: usize,
    },

    /// Endpoint host is empty.
    #[error("endpoint host must not be empty")]
    EmptyHost,

    /// Endpoint port is outside `1..=65535`.
    #[error("invalid port {port}: must be in 1..=65535")]
    InvalidPort {
        /// Rejected port value.
        port: u32,
    },

    /// A `host:port` string could not be parsed.
    #[error("invalid endpoint '{input}': expected host:port")]
    InvalidEndpoint {
        /// Offending input.
        input: String,
    },

    /// A client setting failed validation.
    #[error("invalid setting {name}: {reason}")]
    InvalidSetting {
        /// Setting name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid setting error.
    pub fn invalid_setting(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            name,
            reason: reason.into(),
        }
    }
}

/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
