//! Prelude module for convenient imports.
//!
//! ```
//! use relink::prelude::*;
//! ```

pub use relink_core::{ConfigError, Endpoint, ServerPool};

pub use relink_transport::{ConnectError, ConnectOptions, EchoServer, EchoServerConfig};

pub use relink_client::{
    Client, ClientBuilder, ClientError, ClientState, ConnectionListener, ReconnectConfig,
    SendError,
};
