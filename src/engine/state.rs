use std::fmt;

use serde::{Deserialize, Serialize};

/// The explicit lifecycle states of a voice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No connection, no devices held. Initial state.
    Disconnected,
    /// Start requested: acquiring the microphone and awaiting the service
    /// handshake. Capture has not begun.
    Connecting,
    /// Handshake done, microphone live, frames streaming both ways.
    Connected,
    /// A setup or transport failure ended the session. All resources
    /// released; a new start request is required.
    Error,
}

impl SessionState {
    /// Start requests are honored from the initial state and from either
    /// terminal state.
    pub fn can_start(self) -> bool {
        matches!(self, Self::Disconnected | Self::Error)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected | Self::Error)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}
