//! Client socket lifecycle.
//!
//! [`ConnectionManager`] is the single owner of the live client socket. The
//! reconnect supervisor hands it freshly connected streams through
//! [`ConnectionManager::install`]; the send path borrows the live socket as a
//! [`SocketLease`] for one write attempt or one writability wait at a time.

use crate::error::ConnectError;
use relink_core::Endpoint;
use socket2::SockRef;
use std::net::{Ipv4Addr, Shutdown, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpSocket, TcpStream, lookup_host};
use tokio_util::sync::CancellationToken;

/// Socket options applied to every connect attempt.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Upper bound on resolution plus connect.
    pub connect_timeout: Duration,
    /// Enable `SO_KEEPALIVE`.
    pub keepalive: bool,
    /// Enable `TCP_NODELAY`.
    pub tcp_nodelay: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(5000),
            keepalive: true,
            tcp_nodelay: true,
        }
    }
}

impl ConnectOptions {
    /// Sets the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the `SO_KEEPALIVE` option.
    #[must_use]
    pub fn keepalive(mut self, enabled: bool) -> Self {
        self.keepalive = enabled;
        self
    }

    /// Sets the `TCP_NODELAY` option.
    #[must_use]
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }
}

/// Temporary borrow of the live socket.
///
/// A lease never closes the socket. Once the manager closes the connection
/// both directions are shut down, so writes through a stale lease fail
/// instead of reaching the peer.
#[derive(Debug, Clone)]
pub struct SocketLease {
    id: u64,
    stream: Arc<TcpStream>,
}

impl SocketLease {
    /// Returns the id of the connection this lease refers to.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Issues one non-blocking write.
    ///
    /// # Errors
    /// Returns `WouldBlock` when the socket buffer is full, or the OS error
    /// of a failed write. Broken pipes surface as `BrokenPipe` errors.
    pub fn try_write(&self, buf: &[u8]) -> std::io::Result<usize> {
        self.stream.try_write(buf)
    }

    /// Waits until the socket may be writable.
    ///
    /// # Errors
    /// Returns an IO error if readiness polling fails.
    pub async fn writable(&self) -> std::io::Result<()> {
        self.stream.writable().await
    }

    /// Returns the peer address.
    ///
    /// # Errors
    /// Returns an IO error if the socket is no longer connected.
    pub fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.stream.peer_addr()
    }
}

/// Exclusive owner of the client socket.
///
/// At most one socket is open at a time, and each installed socket gets a
/// fresh connection id so callers can detect that the socket they used has
/// been replaced.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    socket: Option<SocketLease>,
    last_id: u64,
}

impl ConnectionManager {
    /// Creates a manager with no open socket.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects to `endpoint`.
    ///
    /// The socket is created non-blocking with keepalive enabled, and the
    /// connect is awaited until writable with its pending error checked.
    /// Both resolution and the connect are bounded by
    /// [`ConnectOptions::connect_timeout`] and interrupted as soon as
    /// `cancel` fires. On any failure the half-open socket is dropped.
    ///
    /// # Errors
    /// Returns [`ConnectError`] on resolution failure, timeout, cancellation
    /// or a refused connect.
    pub async fn connect(
        endpoint: &Endpoint,
        options: &ConnectOptions,
        cancel: &CancellationToken,
    ) -> Result<TcpStream, ConnectError> {
        let attempt = async {
            let addr = resolve_ipv4(endpoint).await?;
            let socket = TcpSocket::new_v4().map_err(|e| ConnectError::io(addr, e))?;
            if options.keepalive {
                SockRef::from(&socket)
                    .set_keepalive(true)
                    .map_err(|e| ConnectError::io(addr, e))?;
            }

            tracing::debug!(%endpoint, %addr, "connecting");
            let stream = socket
                .connect(addr)
                .await
                .map_err(|e| ConnectError::io(addr, e))?;
            stream
                .set_nodelay(options.tcp_nodelay)
                .map_err(|e| ConnectError::io(addr, e))?;
            Ok::<_, ConnectError>(stream)
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ConnectError::Cancelled),
            result = tokio::time::timeout(options.connect_timeout, attempt) => {
                result.unwrap_or_else(|_| {
                    Err(ConnectError::Timeout {
                        endpoint: endpoint.to_string(),
                        timeout: options.connect_timeout,
                    })
                })
            }
        }
    }

    /// Takes ownership of a connected stream, closing any previous socket.
    ///
    /// Returns the new connection id.
    pub fn install(&mut self, stream: TcpStream) -> u64 {
        self.close();
        self.last_id += 1;
        self.socket = Some(SocketLease {
            id: self.last_id,
            stream: Arc::new(stream),
        });
        self.last_id
    }

    /// Borrows the live socket, if any.
    #[must_use]
    pub fn lease(&self) -> Option<SocketLease> {
        self.socket.clone()
    }

    /// Returns the id of the live connection.
    #[must_use]
    pub fn connection_id(&self) -> Option<u64> {
        self.socket.as_ref().map(SocketLease::id)
    }

    /// Returns `true` if a socket is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    /// Closes the live socket.
    ///
    /// Idempotent: returns `false` when no socket was open.
    pub fn close(&mut self) -> bool {
        let Some(lease) = self.socket.take() else {
            return false;
        };

        // Peer may already be gone; a failed shutdown still releases the handle.
        if let Err(e) = SockRef::from(&*lease.stream).shutdown(Shutdown::Both) {
            tracing::trace!(id = lease.id, error = %e, "shutdown on close");
        }
        tracing::debug!(id = lease.id, "socket closed");
        true
    }

    /// Closes the live socket only if it is connection `id`.
    pub fn close_if(&mut self, id: u64) -> bool {
        if self.connection_id() == Some(id) {
            self.close()
        } else {
            false
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

async fn resolve_ipv4(endpoint: &Endpoint) -> Result<SocketAddr, ConnectError> {
    if let Ok(ip) = endpoint.host().parse::<Ipv4Addr>() {
        return Ok(SocketAddr::from((ip, endpoint.port())));
    }

    let mut addrs = lookup_host((endpoint.host(), endpoint.port()))
        .await
        .map_err(|source| ConnectError::Resolve {
            endpoint: endpoint.to_string(),
            source,
        })?;

    addrs
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| ConnectError::NoIpv4Address {
            endpoint: endpoint.to_string(),
        })
}
