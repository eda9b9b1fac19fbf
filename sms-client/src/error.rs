//! Client errors.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors returned by session operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Waiting for a fetch took longer than allowed.
    #[error("timed out waiting for conversation")]
    Timeout,

    /// The session was shut down.
    #[error("session closed")]
    SessionClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_converts() {
        let error: ClientError = TransportError::NotConnected.into();
        assert!(matches!(error, ClientError::Transport(TransportError::NotConnected)));
        assert_eq!(error.to_string(), "transport error: not connected");
    }

    #[test]
    fn session_closed_message() {
        assert_eq!(ClientError::SessionClosed.to_string(), "session closed");
    }
}
