//! Error types for ragchat-core

use std::time::Duration;

use thiserror::Error;

use crate::session::{ErrorKind, Status};

/// Main error type for ragchat-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not reach the chat backend: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("Cannot {operation} while session is {status:?}")]
    InvalidTransition {
        operation: &'static str,
        status: Status,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify a failed exchange for display in the session state.
    ///
    /// Returns `None` for errors that never come out of a remote call.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Transport(_) => Some(ErrorKind::Transport),
            Self::Server { .. } => Some(ErrorKind::Server),
            Self::MalformedResponse(_) => Some(ErrorKind::MalformedResponse),
            Self::Timeout(_) => Some(ErrorKind::Timeout),
            Self::InvalidTransition { .. } | Self::Config(_) | Self::Io(_) => None,
        }
    }
}

/// Result type alias for ragchat-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_of_request_failures() {
        let server = Error::Server {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(server.kind(), Some(ErrorKind::Server));
        assert_eq!(
            Error::MalformedResponse("missing reply".into()).kind(),
            Some(ErrorKind::MalformedResponse)
        );
        assert_eq!(
            Error::Timeout(Duration::from_secs(1)).kind(),
            Some(ErrorKind::Timeout)
        );
    }

    #[test]
    fn test_kind_of_local_errors() {
        let err = Error::InvalidTransition {
            operation: "append assistant turn",
            status: Status::Idle,
        };
        assert_eq!(err.kind(), None);
        assert_eq!(Error::Config("bad".into()).kind(), None);
    }

    #[test]
    fn test_display() {
        let err = Error::Server {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "Server error (503): unavailable");
        assert_eq!(
            Error::Timeout(Duration::from_millis(1500)).to_string(),
            "Request timed out after 1.5s"
        );
    }
}
