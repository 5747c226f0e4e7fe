//! # relink
//!
//! Resilient TCP client with automatic reconnection and server failover.
//!
//! A [`Client`] holds one connection to a member of an ordered server pool.
//! A background supervisor reconnects after failures, moving round-robin to
//! the next endpoint after each failed attempt, and reports every transition
//! through a connection callback. Sends are fire-and-forget byte payloads.
//!
//! ## Quick Start
//!
//! ```no_run
//! use relink::prelude::*;
//!
//! # async fn run() -> Result<(), ClientError> {
//! let endpoints = vec![
//!     "10.0.0.1:8888".parse::<Endpoint>()?,
//!     "10.0.0.2:8888".parse::<Endpoint>()?,
//! ];
//!
//! let client = Client::new(endpoints, 3000)?;
//! client.set_connection_callback(|connected| println!("connected: {connected}"));
//! client.start();
//!
//! if client.send(b"hello").await.is_err() {
//!     // The supervisor is already reconnecting.
//! }
//!
//! client.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`] - Endpoints, the server pool and configuration errors
//! - [`transport`] - TCP connection management and the echo server
//! - [`client`] - Client handle, reconnect supervisor and notifications

pub mod prelude;

/// Endpoints, server pool and configuration errors.
pub mod core {
    pub use relink_core::*;
}

/// TCP connection management.
pub mod transport {
    pub use relink_transport::*;
}

/// Client handle and reconnect supervisor.
pub mod client {
    pub use relink_client::*;
}

pub use relink_client::{Client, ClientBuilder, ClientError, ClientState, SendError};
pub use relink_core::{ConfigError, Endpoint, ServerPool};
pub use relink_transport::{EchoServer, EchoServerConfig};
