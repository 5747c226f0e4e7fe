//! Echo server peer.
//!
//! A small accepting peer that counts every byte it receives and, unless
//! disabled, writes it straight back. Recording the bytes themselves is
//! opt-in so long-running demos keep constant memory. Tests and demos use it
//! as the remote end of a client connection.

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Configuration for the echo server.
#[derive(Debug, Clone)]
pub struct EchoServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Write received bytes back to the sender.
    pub echo: bool,
    /// Keep a copy of every received byte for [`EchoServer::received`].
    pub record: bool,
    /// Listen backlog.
    pub backlog: i32,
    /// Per-connection read buffer size.
    pub read_buffer_size: usize,
}

impl Default for EchoServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8888)),
            echo: true,
            record: false,
            backlog: 10,
            read_buffer_size: 1024,
        }
    }
}

impl EchoServerConfig {
    /// Creates a new server config with the specified bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Enables or disables echoing.
    #[must_use]
    pub fn echo(mut self, enabled: bool) -> Self {
        self.echo = enabled;
        self
    }

    /// Enables or disables recording of received bytes.
    #[must_use]
    pub fn record(mut self, enabled: bool) -> Self {
        self.record = enabled;
        self
    }

    /// Sets the listen backlog.
    #[must_use]
    pub fn backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Sets the per-connection read buffer size.
    #[must_use]
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }
}

#[derive(Default)]
struct EchoState {
    received: Mutex<BytesMut>,
    bytes_received: AtomicU64,
    peers: Mutex<HashMap<u64, CancellationToken>>,
    accepted: AtomicUsize,
    next_peer: AtomicU64,
}

/// Running echo server.
///
/// The accept loop and every connection handler run as tokio tasks; dropping
/// the server stops them without waiting.
pub struct EchoServer {
    local_addr: SocketAddr,
    state: Arc<EchoState>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl EchoServer {
    /// Binds the listener and starts accepting connections.
    ///
    /// The listening socket is IPv4 with `SO_REUSEADDR` set.
    ///
    /// # Errors
    /// Returns IO error if the socket cannot be created, bound or put into
    /// listening mode.
    pub async fn bind(config: EchoServerConfig) -> std::io::Result<Self> {
        let listener = bind_listener(&config)?;
        let local_addr = listener.local_addr()?;
        let state = Arc::new(EchoState::default());
        let shutdown = CancellationToken::new();
        let tasks = TaskTracker::new();

        tasks.spawn(accept_loop(
            listener,
            config,
            Arc::clone(&state),
            shutdown.clone(),
            tasks.clone(),
        ));

        tracing::info!(%local_addr, "echo server listening");
        Ok(Self {
            local_addr,
            state,
            shutdown,
            tasks,
        })
    }

    /// Returns the local address the server is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns a copy of every byte received so far, across all connections.
    ///
    /// Empty unless the server was configured with `record(true)`.
    #[must_use]
    pub fn received(&self) -> Bytes {
        Bytes::copy_from_slice(&self.state.received.lock())
    }

    /// Returns the number of bytes received so far, across all connections.
    #[must_use]
    pub fn bytes_received(&self) -> u64 {
        self.state.bytes_received.load(Ordering::Acquire)
    }

    /// Returns the number of currently open connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.state.peers.lock().len()
    }

    /// Returns the total number of connections accepted.
    #[must_use]
    pub fn accepted_count(&self) -> usize {
        self.state.accepted.load(Ordering::Acquire)
    }

    /// Forcibly closes every open connection with a reset.
    ///
    /// The listener keeps accepting new connections.
    pub fn disconnect_all(&self) {
        for token in self.state.peers.lock().values() {
            token.cancel();
        }
    }

    /// Stops accepting, closes all connections and waits for every task.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tasks.close();
        self.tasks.wait().await;
        tracing::info!(local_addr = %self.local_addr, "echo server stopped");
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.tasks.close();
    }
}

fn bind_listener(config: &EchoServerConfig) -> std::io::Result<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&config.bind_addr.into())?;
    socket.listen(config.backlog)?;
    TcpListener::from_std(socket.into())
}

async fn accept_loop(
    listener: TcpListener,
    config: EchoServerConfig,
    state: Arc<EchoState>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
) {
    loop {
        let accepted = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer_addr)) => {
                let id = state.next_peer.fetch_add(1, Ordering::Relaxed);
                let token = shutdown.child_token();
                state.peers.lock().insert(id, token.clone());
                state.accepted.fetch_add(1, Ordering::AcqRel);
                tracing::debug!(%peer_addr, id, "client connected");

                tasks.spawn(handle_peer(
                    stream,
                    id,
                    config.clone(),
                    Arc::clone(&state),
                    token,
                ));
            }
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
            }
        }
    }
}

async fn handle_peer(
    mut stream: TcpStream,
    id: u64,
    config: EchoServerConfig,
    state: Arc<EchoState>,
    token: CancellationToken,
) {
    let mut buf = BytesMut::with_capacity(config.read_buffer_size);

    loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            () = token.cancelled() => None,
            read = stream.read_buf(&mut buf) => Some(read),
        };
        let Some(read) = read else {
            // Zero linger turns the close into a reset.
            if let Err(e) = SockRef::from(&stream).set_linger(Some(Duration::ZERO)) {
                tracing::trace!(id, error = %e, "set linger on reset");
            }
            break;
        };

        match read {
            Ok(0) => {
                tracing::debug!(id, "client closed connection");
                break;
            }
            Ok(n) => {
                state.bytes_received.fetch_add(n as u64, Ordering::AcqRel);
                if config.record {
                    state.received.lock().extend_from_slice(&buf[..n]);
                }
                if config.echo {
                    if let Err(e) = stream.write_all(&buf[..n]).await {
                        tracing::debug!(id, error = %e, "echo failed");
                        break;
                    }
                }
            }
            Err(e) => {
                tracing::debug!(id, error = %e, "read failed");
                break;
            }
        }
    }

    state.peers.lock().remove(&id);
    drop(stream);
}
