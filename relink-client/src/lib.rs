//! # relink Client
//!
//! Resilient TCP client that keeps one connection alive across a pool of
//! candidate servers.
//!
//! This crate provides:
//! - Client builder with connect, backoff and send-poll settings
//! - A background reconnect supervisor with round-robin failover
//! - A thread-safe send operation that writes every byte or reports failure
//! - A single-slot connection callback isolated from client state

pub mod builder;
mod channel;
pub mod error;
pub mod notify;
pub mod reconnect;
mod shared;
pub mod state;
mod supervisor;

pub use builder::{Client, ClientBuilder};
pub use error::{ClientError, SendError};
pub use notify::{ConnectionListener, Notification, NotificationHub};
pub use reconnect::{ReconnectConfig, ReconnectState};
pub use state::ClientState;
