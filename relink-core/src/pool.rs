//! Round-robin server pool.

use crate::endpoint::Endpoint;
use crate::error::ConfigError;

/// Ordered, non-empty list of candidate endpoints with a failover cursor.
///
/// The cursor always satisfies `0 <= index < len`. It only moves through
/// [`ServerPool::advance`], which the reconnect supervisor calls after a
/// failed connect, so every endpoint is tried once before any is repeated.
/// A single-endpoint pool degenerates to retrying the same endpoint forever.
#[derive(Debug, Clone)]
pub struct ServerPool {
    endpoints: Vec<Endpoint>,
    index: usize,
}

impl ServerPool {
    /// Creates a pool from an endpoint list.
    ///
    /// # Errors
    /// Returns [`ConfigError::EmptyPool`] if `endpoints` is empty.
    pub fn new(endpoints: Vec<Endpoint>) -> Result<Self, ConfigError> {
        if endpoints.is_empty() {
            return Err(ConfigError::EmptyPool);
        }
        Ok(Self {
            endpoints,
            index: 0,
        })
    }

    /// Creates a pool from parallel host and port lists.
    ///
    /// # Errors
    /// Returns [`ConfigError::LengthMismatch`] if the lists differ in length,
    /// [`ConfigError::EmptyPool`] if both are empty, or the endpoint
    /// validation error of the first malformed pair.
    pub fn from_parallel<S: AsRef<str>>(hosts: &[S], ports: &[u16]) -> Result<Self, ConfigError> {
        if hosts.len() != ports.len() {
            return Err(ConfigError::LengthMismatch {
                hosts: hosts.len(),
                ports: ports.len(),
            });
        }

        let endpoints = hosts
            .iter()
            .zip(ports)
            .map(|(host, &port)| Endpoint::new(host.as_ref(), port))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(endpoints)
    }

    /// Returns the endpoint at the current index.
    #[must_use]
    pub fn current(&self) -> &Endpoint {
        &self.endpoints[self.index]
    }

    /// Moves the cursor to the next endpoint, wrapping around.
    pub fn advance(&mut self) {
        self.index = (self.index + 1) % self.endpoints.len();
    }

    /// Returns the current index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the number of endpoints. Never zero.
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns all endpoints in failover order.
    #[must_use]
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }
}

impl TryFrom<Vec<Endpoint>> for ServerPool {
    type Error = ConfigError;

    fn try_from(endpoints: Vec<Endpoint>) -> Result<Self, Self::Error> {
        Self::new(endpoints)
    }
}
