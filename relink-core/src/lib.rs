//! # relink Core
//!
//! Core types shared by the relink client and transport crates.
//!
//! This crate provides:
//! - [`Endpoint`] - an immutable host/port pair naming a candidate server
//! - [`ServerPool`] - an ordered, non-empty endpoint list with round-robin failover
//! - [`ConfigError`] - validation errors raised while building either of the above

pub mod endpoint;
pub mod error;
pub mod pool;

pub use endpoint::Endpoint;
pub use error::{ConfigError, Result};
pub use pool::ServerPool;
