//! Client connection state.

use std::fmt;

/// Lifecycle state of a client.
///
/// Transitions:
/// - `Disconnected -> Connecting` when the supervisor starts an attempt
/// - `Connecting -> Connected | Disconnected` on the attempt's outcome
/// - `Connected -> Disconnected` on a send or remote error
/// - any state `-> Stopped` on `stop()`, and `Stopped -> Disconnected` on `start()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientState {
    /// Stopped; no reconnect attempts are made.
    Stopped,
    /// No live connection; the supervisor will attempt one.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// A live connection is held.
    Connected,
}

impl ClientState {
    /// Returns `true` for [`ClientState::Connected`].
    #[must_use]
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }

    /// Returns `true` for [`ClientState::Stopped`].
    #[must_use]
    pub fn is_stopped(self) -> bool {
        self == Self::Stopped
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(name)
    }
}
