//! TCP transport module.
//!
//! Provides the client-side connection manager and an echo server peer.

pub mod connection;
pub mod server;

pub use connection::{ConnectOptions, ConnectionManager, SocketLease};
pub use server::{EchoServer, EchoServerConfig};
