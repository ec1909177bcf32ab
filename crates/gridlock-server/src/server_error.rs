//! Driver error types.
//!
//! Strongly-typed errors for driver operations: session bookkeeping and
//! message routing. Match-level faults (wrong turn, taken cell) are not
//! errors - the match drops them silently - so nothing here covers them.

use std::fmt;

/// Errors that can occur while the driver processes an event.
#[derive(Debug)]
pub enum DriverError {
    /// Session not found in registry.
    ///
    /// A message arrived for a session the driver never accepted or has
    /// already torn down. May be transient if the session was just
    /// disconnected - client should reconnect.
    SessionNotFound(u64),

    /// Session already registered.
    ///
    /// Attempting to register a session ID that already exists. This is a
    /// logic bug - session IDs should be unique. Fatal - report as issue.
    SessionAlreadyExists(u64),

    /// Frame encoding/decoding error.
    ///
    /// Invalid message received from client or failed to encode a response.
    /// Fatal for that connection - indicates protocol violation or bug.
    Protocol(String),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotFound(id) => write!(f, "session not found: {id}"),
            Self::SessionAlreadyExists(id) => write!(f, "session already exists: {id}"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<gridlock_proto::ProtocolError> for DriverError {
    fn from(err: gridlock_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}
