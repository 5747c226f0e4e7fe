//! Candidate server endpoints.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// A host/port pair identifying a candidate server.
///
/// Endpoints are validated on construction and immutable afterwards. The host
/// may be an IPv4 literal or a name that resolves to an IPv4 address at
/// connect time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Creates a new endpoint.
    ///
    /// # Errors
    /// Returns [`ConfigError::EmptyHost`] if `host` is blank and
    /// [`ConfigError::InvalidPort`] if `port` is zero.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, ConfigError> {
        let host = host.into();
        let trimmed = host.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if port == 0 {
            return Err(ConfigError::InvalidPort { port: 0 });
        }
        Ok(Self {
            host: trimmed.to_string(),
            port,
        })
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidEndpoint {
            input: s.to_string(),
        };

        let (host, port) = s.trim().rsplit_once(':').ok_or_else(invalid)?;
        let port: u32 = port.parse().map_err(|_| invalid())?;
        let port = u16::try_from(port).map_err(|_| ConfigError::InvalidPort { port })?;

        Self::new(host, port)
    }
}

impl TryFrom<(&str, u16)> for Endpoint {
    type Error = ConfigError;

    fn try_from((host, port): (&str, u16)) -> Result<Self, Self::Error> {
        Self::new(host, port)
    }
}
