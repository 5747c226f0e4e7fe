//! Client builder and main client implementation.

use crate::channel::SendChannel;
use crate::error::{ClientError, SendError};
use crate::notify::{ConnectionListener, NotificationHub};
use crate::reconnect::ReconnectConfig;
use crate::shared::{Settings, Shared};
use crate::state::ClientState;
use crate::supervisor::ReconnectSupervisor;
use relink_core::{ConfigError, Endpoint, ServerPool};
use relink_transport::ConnectOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Builder for configuring and creating a client.
pub struct ClientBuilder {
    endpoints: Vec<Endpoint>,
    connect: ConnectOptions,
    reconnect: ReconnectConfig,
    send_poll_timeout: Duration,
    listener: Option<Arc<dyn ConnectionListener>>,
}

impl ClientBuilder {
    /// Creates a new client builder for the given candidate endpoints.
    #[must_use]
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self {
            endpoints,
            connect: ConnectOptions::default(),
            reconnect: ReconnectConfig::default(),
            send_poll_timeout: Duration::from_millis(1000),
            listener: None,
        }
    }

    /// Creates a new client builder from an existing pool.
    #[must_use]
    pub fn from_pool(pool: &ServerPool) -> Self {
        Self::new(pool.endpoints().to_vec())
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect = self.connect.connect_timeout(timeout);
        self
    }

    /// Enables or disables `SO_KEEPALIVE` on client sockets.
    #[must_use]
    pub fn keepalive(mut self, enabled: bool) -> Self {
        self.connect = self.connect.keepalive(enabled);
        self
    }

    /// Sets the delay after a failed connect attempt.
    ///
    /// Raises the backoff cap to `interval` if it was lower.
    #[must_use]
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect.retry_interval = interval;
        self.reconnect.max_delay = self.reconnect.max_delay.max(interval);
        self
    }

    /// Sets the delay between supervisor cycles while connected.
    #[must_use]
    pub fn health_interval(mut self, interval: Duration) -> Self {
        self.reconnect.health_interval = interval;
        self
    }

    /// Sets the backoff multiplier applied after consecutive failures.
    #[must_use]
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.reconnect.backoff_multiplier = multiplier;
        self
    }

    /// Sets the upper bound on the failure delay.
    #[must_use]
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.reconnect.max_delay = delay;
        self
    }

    /// Sets how long a send waits for a full socket buffer to drain.
    #[must_use]
    pub fn send_poll_timeout(mut self, timeout: Duration) -> Self {
        self.send_poll_timeout = timeout;
        self
    }

    /// Registers the initial connection callback.
    #[must_use]
    pub fn connection_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.listener = Some(Arc::new(callback));
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] if the endpoint list is empty or a
    /// timing setting is invalid.
    pub fn build(self) -> Result<Client, ClientError> {
        let pool = ServerPool::new(self.endpoints)?;
        self.reconnect.validate()?;
        if self.connect.connect_timeout.is_zero() {
            return Err(ConfigError::invalid_setting("connect_timeout", "must be > 0").into());
        }
        if self.send_poll_timeout.is_zero() {
            return Err(ConfigError::invalid_setting("send_poll_timeout", "must be > 0").into());
        }

        let mut hub = NotificationHub::new();
        if let Some(listener) = self.listener {
            hub.set_listener(listener);
        }

        let settings = Settings {
            connect: self.connect,
            reconnect: self.reconnect,
            send_poll_timeout: self.send_poll_timeout,
        };

        Ok(Client {
            shared: Arc::new(Shared::new(pool, hub, settings)),
        })
    }
}

/// Resilient TCP client.
///
/// Keeps one connection alive to a member of its server pool, reconnecting
/// and failing over in a background task between `start()` and `stop()`.
/// All methods take `&self`; share the client across tasks with an `Arc`.
pub struct Client {
    shared: Arc<Shared>,
}

impl Client {
    /// Creates a client with default settings and the given retry interval
    /// in milliseconds.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] if `endpoints` is empty or the
    /// interval is zero.
    pub fn new(endpoints: Vec<Endpoint>, reconnect_interval_ms: u64) -> Result<Self, ClientError> {
        ClientBuilder::new(endpoints)
            .reconnect_interval(Duration::from_millis(reconnect_interval_ms))
            .build()
    }

    /// Creates a builder for the given endpoints.
    #[must_use]
    pub fn builder(endpoints: Vec<Endpoint>) -> ClientBuilder {
        ClientBuilder::new(endpoints)
    }

    /// Starts the reconnect supervisor.
    ///
    /// No-op if already running. A stopped client can be started again.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn start(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.running {
            tracing::debug!("start ignored, client already running");
            return;
        }

        let cancel = CancellationToken::new();
        let tasks = TaskTracker::new();
        inner.running = true;
        inner.state = ClientState::Disconnected;
        inner.cancel = cancel.clone();
        inner.tasks = tasks.clone();

        tasks.spawn(ReconnectSupervisor::new(Arc::clone(&self.shared), cancel).run());
        tasks.close();
        tracing::info!(server = %inner.pool.current(), "client started");
    }

    /// Stops the client.
    ///
    /// Closes the live socket, interrupts any connect, send wait or backoff
    /// in progress and returns once the supervisor has exited. Safe to call
    /// repeatedly; later calls only wait for the first to finish.
    pub async fn stop(&self) {
        let (tasks, notification) = {
            let mut inner = self.shared.inner.lock();
            let was_connected = inner.state == ClientState::Connected;
            let was_running = inner.running;

            inner.running = false;
            inner.state = ClientState::Stopped;
            inner.connection.close();
            inner.cancel.cancel();

            if was_running {
                tracing::info!("stopping client");
            }
            (
                inner.tasks.clone(),
                was_connected.then(|| inner.hub.prepare(false)),
            )
        };

        tasks.close();
        tasks.wait().await;

        if let Some(notification) = notification {
            notification.deliver();
        }
    }

    /// Sends `payload` over the live connection.
    ///
    /// Returns once every byte has been handed to the OS socket buffer.
    ///
    /// # Errors
    /// Returns [`SendError::NotConnected`] immediately when no connection is
    /// live, or [`SendError::SendFailed`] if writing fails; a failed write
    /// drops the connection so the supervisor reconnects.
    pub async fn send(&self, payload: &[u8]) -> Result<(), SendError> {
        SendChannel::new(&self.shared).send(payload).await
    }

    /// Replaces the connection callback.
    ///
    /// Only the most recently registered callback is invoked. It runs on
    /// whichever task triggered the transition; panics inside it are caught
    /// and logged.
    pub fn set_connection_callback<F>(&self, callback: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.shared.inner.lock().hub.set_callback(callback);
    }

    /// Replaces the connection callback with a shared listener.
    pub fn set_connection_listener(&self, listener: Arc<dyn ConnectionListener>) {
        self.shared.inner.lock().hub.set_listener(listener);
    }

    /// Removes the connection callback.
    pub fn clear_connection_callback(&self) {
        self.shared.inner.lock().hub.clear_callback();
    }

    /// Returns `true` if a live connection is held.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.inner.lock().state == ClientState::Connected
    }

    /// Returns `true` between `start()` and `stop()`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.inner.lock().running
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ClientState {
        self.shared.inner.lock().state
    }

    /// Returns the current failover target as `host:port`.
    #[must_use]
    pub fn current_server(&self) -> String {
        self.shared.inner.lock().pool.current().to_string()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let mut inner = self.shared.inner.lock();
        inner.running = false;
        inner.state = ClientState::Stopped;
        inner.connection.close();
        inner.cancel.cancel();
        inner.tasks.close();
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("Client")
            .field("state", &inner.state)
            .field("running", &inner.running)
            .field("server", &inner.pool.current().to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use relink_transport::{EchoServer, EchoServerConfig};
    use std::net::SocketAddr;
    use std::io::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use tokio::net::{TcpListener, TcpSocket, TcpStream};

    const WAIT: Duration = Duration::from_secs(5);

    fn closed_endpoint() -> Endpoint {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        Endpoint::new("127.0.0.1", port).unwrap()
    }

    async fn echo_server(echo: bool) -> (EchoServer, Endpoint) {
        let config = EchoServerConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)))
            .echo(echo)
            .record(true);
        let server = EchoServer::bind(config).await.unwrap();
        let endpoint = Endpoint::new("127.0.0.1", server.local_addr().port()).unwrap();
        (server, endpoint)
    }

    fn fast(endpoints: Vec<Endpoint>) -> ClientBuilder {
        ClientBuilder::new(endpoints)
            .connect_timeout(Duration::from_millis(500))
            .reconnect_interval(Duration::from_millis(20))
            .health_interval(Duration::from_millis(20))
            .send_poll_timeout(Duration::from_millis(500))
    }

    /// Listener whose accept queue is full, so further connects hang in
    /// the SYN stage. The returned streams keep the queue occupied.
    async fn saturated_listener() -> (TcpListener, Vec<TcpStream>, Endpoint) {
        let socket = TcpSocket::new_v4().unwrap();
        socket.bind(SocketAddr::from(([127, 0, 0, 1], 0))).unwrap();
        let listener = socket.listen(1).unwrap();
        let addr = listener.local_addr().unwrap();

        let mut queued = Vec::new();
        for _ in 0..32 {
            match tokio::time::timeout(Duration::from_millis(200), TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => queued.push(stream),
                Ok(Err(e)) => panic!("filling accept queue failed: {e}"),
                Err(_) => {
                    let endpoint = Endpoint::new("127.0.0.1", addr.port()).unwrap();
                    return (listener, queued, endpoint);
                }
            }
        }
        panic!("accept queue never filled");
    }

    /// Listener that accepts but never reads.
    async fn silent_peer() -> (TcpListener, Endpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, Endpoint::new("127.0.0.1", port).unwrap())
    }

    fn recorder() -> (Arc<Mutex<Vec<bool>>>, impl Fn(bool) + Send + Sync + 'static) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        (events, move |connected| sink.lock().push(connected))
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        condition()
    }

    #[test]
    fn test_client_builder_defaults() {
        let builder = ClientBuilder::new(vec![closed_endpoint()]);
        assert_eq!(builder.connect.connect_timeout, Duration::from_millis(5000));
        assert!(builder.connect.keepalive);
        assert_eq!(builder.reconnect.retry_interval, Duration::from_millis(3000));
        assert_eq!(builder.reconnect.health_interval, Duration::from_millis(1000));
        assert_eq!(builder.send_poll_timeout, Duration::from_millis(1000));
        assert!(builder.listener.is_none());
    }

    #[test]
    fn test_client_new_rejects_empty_pool() {
        let err = Client::new(Vec::new(), 3000).unwrap_err();
        assert!(matches!(err, ClientError::Config(ConfigError::EmptyPool)));
    }

    #[test]
    fn test_client_new_rejects_zero_interval() {
        let err = Client::new(vec![closed_endpoint()], 0).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Config(ConfigError::InvalidSetting {
                name: "retry_interval",
                ..
            })
        ));
    }

    #[test]
    fn test_client_new_accepts_long_interval() {
        let client = Client::new(vec![closed_endpoint()], 60_000);
        assert!(client.is_ok());

        let builder = ClientBuilder::new(vec![closed_endpoint()])
            .reconnect_interval(Duration::from_secs(60));
        assert_eq!(builder.reconnect.max_delay, Duration::from_secs(60));

        let builder = ClientBuilder::new(vec![closed_endpoint()])
            .reconnect_interval(Duration::from_secs(1));
        assert_eq!(builder.reconnect.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_explicit_short_max_delay_rejected() {
        let err = ClientBuilder::new(vec![closed_endpoint()])
            .reconnect_interval(Duration::from_secs(60))
            .max_delay(Duration::from_secs(10))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max_delay"));
    }

    #[test]
    fn test_builder_rejects_zero_timeouts() {
        let err = ClientBuilder::new(vec![closed_endpoint()])
            .connect_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("connect_timeout"));

        let err = ClientBuilder::new(vec![closed_endpoint()])
            .send_poll_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("send_poll_timeout"));
    }

    #[test]
    fn test_new_client_is_idle() {
        let endpoint = closed_endpoint();
        let client = Client::new(vec![endpoint.clone()], 3000).unwrap();
        assert_eq!(client.state(), ClientState::Disconnected);
        assert!(!client.is_running());
        assert!(!client.is_connected());
        assert_eq!(client.current_server(), endpoint.to_string());
    }

    #[tokio::test]
    async fn test_send_before_connect_fails_fast() {
        let client = fast(vec![closed_endpoint()]).build().unwrap();

        let result = tokio::time::timeout(Duration::from_millis(100), client.send(b"early")).await;
        assert!(matches!(result, Ok(Err(SendError::NotConnected))));

        client.start();
        let result = tokio::time::timeout(Duration::from_millis(100), client.send(b"early")).await;
        assert!(matches!(result, Ok(Err(SendError::NotConnected))));
        client.stop().await;
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let client = fast(vec![closed_endpoint()]).build().unwrap();

        client.stop().await;
        assert_eq!(client.state(), ClientState::Stopped);

        client.start();
        assert!(client.is_running());
        client.start();
        client.stop().await;
        client.stop().await;

        assert_eq!(client.state(), ClientState::Stopped);
        assert!(!client.is_running());
    }

    #[tokio::test]
    async fn test_closed_port_reports_disconnected() {
        let (events, callback) = recorder();
        let client = ClientBuilder::new(vec![closed_endpoint()])
            .connection_callback(callback)
            .build()
            .unwrap();

        client.start();
        // Bound: connect timeout + retry backoff.
        let deadline = Duration::from_millis(5000 + 3000);
        let reported = tokio::time::timeout(deadline, async {
            while !events.lock().contains(&false) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        client.stop().await;

        assert!(reported.is_ok());
        assert!(!events.lock().contains(&true));
    }

    #[tokio::test]
    async fn test_send_reaches_echo_peer() {
        let (server, endpoint) = echo_server(true).await;
        let (events, callback) = recorder();
        let client = ClientBuilder::new(vec![endpoint.clone()])
            .connection_callback(callback)
            .build()
            .unwrap();

        client.start();
        assert!(wait_until(|| client.is_connected()).await);
        assert_eq!(client.current_server(), endpoint.to_string());

        client.send(b"ping").await.unwrap();
        assert!(wait_until(|| server.bytes_received() >= 4).await);
        assert_eq!(&server.received()[..], b"ping");

        client.stop().await;
        assert!(!client.is_connected());
        assert_eq!(*events.lock(), vec![true, false]);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_peer_reset_downgrades_state() {
        let (server, endpoint) = echo_server(true).await;
        let (events, callback) = recorder();
        let client = ClientBuilder::new(vec![endpoint])
            .health_interval(Duration::from_secs(10))
            .connection_callback(callback)
            .build()
            .unwrap();

        client.start();
        assert!(wait_until(|| client.is_connected()).await);
        assert!(wait_until(|| server.connection_count() == 1).await);

        server.disconnect_all();
        assert!(wait_until(|| server.connection_count() == 0).await);

        let mut failure = None;
        for _ in 0..100 {
            if let Err(e) = client.send(b"after-reset").await {
                failure = Some(e);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(matches!(failure, Some(SendError::SendFailed { .. })));
        assert!(!client.is_connected());
        assert_eq!(client.state(), ClientState::Disconnected);
        assert_eq!(*events.lock(), vec![true, false]);

        let next = client.send(b"fast-fail").await;
        assert!(matches!(next, Err(SendError::NotConnected)));

        client.stop().await;
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_reconnects_after_failed_send() {
        let (server, endpoint) = echo_server(true).await;
        let client = fast(vec![endpoint]).build().unwrap();

        client.start();
        assert!(wait_until(|| client.is_connected()).await);
        assert!(wait_until(|| server.connection_count() == 1).await);
        server.disconnect_all();
        assert!(wait_until(|| server.connection_count() == 0).await);

        let mut failed = false;
        for _ in 0..100 {
            if client.send(b"check").await.is_err() {
                failed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(failed);

        assert!(wait_until(|| server.accepted_count() >= 2 && client.is_connected()).await);
        client.send(b"again").await.unwrap();
        assert!(wait_until(|| server.received().ends_with(b"again")).await);

        client.stop().await;
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_round_robin_failover() {
        let endpoints: Vec<Endpoint> = (0..3).map(|_| closed_endpoint()).collect();
        let failures = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&failures);
        let client = fast(endpoints.clone())
            .connection_callback(move |connected| {
                if !connected {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build()
            .unwrap();

        client.start();
        assert!(wait_until(|| failures.load(Ordering::SeqCst) >= 4).await);
        client.stop().await;

        let failed = failures.load(Ordering::SeqCst);
        assert_eq!(client.current_server(), endpoints[failed % 3].to_string());
    }

    #[tokio::test]
    async fn test_fails_over_to_reachable_endpoint() {
        let (server, live) = echo_server(true).await;
        let client = fast(vec![closed_endpoint(), closed_endpoint(), live.clone()])
            .build()
            .unwrap();

        client.start();
        assert!(wait_until(|| client.is_connected()).await);
        assert_eq!(client.current_server(), live.to_string());

        client.stop().await;
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_stop_cycles_release_sockets() {
        let (server, endpoint) = echo_server(true).await;
        let client = fast(vec![endpoint]).build().unwrap();

        for cycle in 1..=5 {
            client.start();
            assert!(wait_until(|| client.is_connected()).await);
            client.stop().await;
            assert!(!client.is_running());
            assert!(wait_until(|| server.connection_count() == 0).await);
            assert_eq!(server.accepted_count(), cycle);
        }

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_interrupts_backoff() {
        let (events, callback) = recorder();
        let client = fast(vec![closed_endpoint()])
            .reconnect_interval(Duration::from_secs(30))
            .connection_callback(callback)
            .build()
            .unwrap();

        client.start();
        assert!(wait_until(|| !events.lock().is_empty()).await);

        let started = Instant::now();
        client.stop().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_stop_interrupts_connect_in_progress() {
        let (_listener, _queued, endpoint) = saturated_listener().await;
        let (events, callback) = recorder();
        let client = fast(vec![endpoint])
            .connect_timeout(Duration::from_secs(10))
            .connection_callback(callback)
            .build()
            .unwrap();

        client.start();
        assert!(wait_until(|| client.state() == ClientState::Connecting).await);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(client.state(), ClientState::Connecting);

        let started = Instant::now();
        client.stop().await;

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(client.state(), ClientState::Stopped);
        assert!(events.lock().is_empty());
    }

    #[tokio::test]
    async fn test_send_to_stalled_peer_times_out() {
        let (listener, endpoint) = silent_peer().await;
        let (events, callback) = recorder();
        let client = fast(vec![endpoint])
            .health_interval(Duration::from_secs(10))
            .send_poll_timeout(Duration::from_millis(200))
            .connection_callback(callback)
            .build()
            .unwrap();

        client.start();
        let (_peer, _) = listener.accept().await.unwrap();
        assert!(wait_until(|| client.is_connected()).await);

        let payload = vec![0x5a_u8; 64 * 1024 * 1024];
        let started = Instant::now();
        let result = client.send(&payload).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        match result {
            Err(SendError::SendFailed { source }) => assert_eq!(source.kind(), ErrorKind::TimedOut),
            other => panic!("expected timed out send, got {other:?}"),
        }
        assert_eq!(client.state(), ClientState::Disconnected);
        assert_eq!(*events.lock(), vec![true, false]);

        client.stop().await;
    }

    #[tokio::test]
    async fn test_stop_interrupts_blocked_send() {
        let (listener, endpoint) = silent_peer().await;
        let (events, callback) = recorder();
        let client = Arc::new(
            fast(vec![endpoint])
                .health_interval(Duration::from_secs(10))
                .send_poll_timeout(Duration::from_secs(30))
                .connection_callback(callback)
                .build()
                .unwrap(),
        );

        client.start();
        let (_peer, _) = listener.accept().await.unwrap();
        assert!(wait_until(|| client.is_connected()).await);

        let sender = Arc::clone(&client);
        let send = tokio::spawn(async move {
            let payload = vec![0xa5_u8; 64 * 1024 * 1024];
            sender.send(&payload).await
        });
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!send.is_finished());

        let started = Instant::now();
        client.stop().await;
        let result = tokio::time::timeout(Duration::from_secs(1), send).await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(matches!(result, Ok(Ok(Err(SendError::SendFailed { .. })))));
        assert_eq!(client.state(), ClientState::Stopped);
        assert_eq!(*events.lock(), vec![true, false]);
    }

    #[tokio::test]
    async fn test_replaced_callback_is_not_called() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let client = fast(vec![closed_endpoint()]).build().unwrap();

        let counter = Arc::clone(&first);
        client.set_connection_callback(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        client.start();
        assert!(wait_until(|| first.load(Ordering::SeqCst) >= 1).await);
        client.stop().await;
        let first_calls = first.load(Ordering::SeqCst);

        let counter = Arc::clone(&second);
        client.set_connection_callback(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        client.start();
        assert!(wait_until(|| second.load(Ordering::SeqCst) >= 2).await);
        client.stop().await;

        assert_eq!(first.load(Ordering::SeqCst), first_calls);
    }

    #[tokio::test]
    async fn test_panicking_callback_does_not_affect_client() {
        let (server, endpoint) = echo_server(true).await;
        let client = fast(vec![endpoint])
            .connection_callback(|connected| panic!("callback failure: {connected}"))
            .build()
            .unwrap();

        client.start();
        assert!(wait_until(|| client.is_connected()).await);
        client.send(b"still-works").await.unwrap();
        assert!(wait_until(|| server.bytes_received() == 11).await);

        client.stop().await;
        assert_eq!(client.state(), ClientState::Stopped);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_large_payload_is_written_fully() {
        let (server, endpoint) = echo_server(false).await;
        let client = fast(vec![endpoint]).build().unwrap();
        let payload: Vec<u8> = (0..4 * 1024 * 1024).map(|i| (i % 251) as u8).collect();

        client.start();
        assert!(wait_until(|| client.is_connected()).await);
        client.send(&payload).await.unwrap();

        let total = payload.len();
        assert!(wait_until(|| server.bytes_received() == total as u64).await);
        assert_eq!(&server.received()[..], &payload[..]);

        client.stop().await;
        server.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sends_do_not_interleave() {
        const TASKS: usize = 4;
        const MESSAGES: usize = 50;
        const SIZE: usize = 64;

        let (server, endpoint) = echo_server(false).await;
        let client = Arc::new(fast(vec![endpoint]).build().unwrap());

        client.start();
        assert!(wait_until(|| client.is_connected()).await);

        let mut handles = Vec::new();
        for task in 0..TASKS {
            let client = Arc::clone(&client);
            handles.push(tokio::spawn(async move {
                let message = [b'a' + task as u8; SIZE];
                for _ in 0..MESSAGES {
                    client.send(&message).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let total = TASKS * MESSAGES * SIZE;
        assert!(wait_until(|| server.bytes_received() == total as u64).await);
        for chunk in server.received().chunks(SIZE) {
            assert!(chunk.iter().all(|&b| b == chunk[0]));
        }

        client.stop().await;
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_empty_payload() {
        let (server, endpoint) = echo_server(true).await;
        let client = fast(vec![endpoint]).build().unwrap();

        assert!(matches!(
            client.send(&[]).await,
            Err(SendError::NotConnected)
        ));

        client.start();
        assert!(wait_until(|| client.is_connected()).await);
        client.send(&[]).await.unwrap();
        assert!(client.is_connected());

        client.stop().await;
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_drop_stops_supervisor() {
        let (server, endpoint) = echo_server(true).await;
        let client = fast(vec![endpoint]).build().unwrap();

        client.start();
        assert!(wait_until(|| client.is_connected()).await);
        drop(client);

        assert!(wait_until(|| server.connection_count() == 0).await);
        server.shutdown().await;
    }
}
