//! # relink Transport
//!
//! Socket layer for the relink client.
//!
//! This crate provides:
//! - [`tcp::connection`] - non-blocking, bounded and cancellable IPv4 connects plus
//!   exclusive ownership of the live client socket
//! - [`tcp::server`] - a minimal echo peer used by tests and demos

pub mod error;
pub mod tcp;

pub use error::ConnectError;
pub use tcp::{ConnectOptions, ConnectionManager, EchoServer, EchoServerConfig, SocketLease};
