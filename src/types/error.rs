//! Error types for seatkit

use thiserror::Error;

/// Bus-facing error codes
///
/// These are the error names the session manager reports back to callers
/// when a request cannot be completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Generic failure
    General,
    /// Caller lacks the privileges for the request
    InsufficientPermission,
    /// Requested session does not exist
    NoSuchSession,
    /// Request arguments could not be used
    InvalidArguments,
    /// Helper program could not be started
    SpawnFailed,
    /// Request was cancelled before completion
    Cancelled,
}

impl ErrorCode {
    /// Get the fully qualified error name
    pub fn name(self) -> &'static str {
        match self {
            Self::General => "org.freedesktop.ConsoleKit.Error.General",
            Self::InsufficientPermission => {
                "org.freedesktop.ConsoleKit.Error.InsufficientPermission"
            }
            Self::NoSuchSession => "org.freedesktop.ConsoleKit.Error.NoSuchSession",
            Self::InvalidArguments => "org.freedesktop.ConsoleKit.Error.InvalidArguments",
            Self::SpawnFailed => "org.freedesktop.ConsoleKit.Error.SpawnFailed",
            Self::Cancelled => "org.freedesktop.ConsoleKit.Error.Cancelled",
        }
    }
}

/// Failure to split a command line into an argument vector
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgvError {
    /// Command line was empty or only whitespace/comments
    #[error("command line is empty")]
    Empty,

    /// A single quote was opened but never closed
    #[error("unterminated single quote starting at byte {0}")]
    UnterminatedSingleQuote(usize),

    /// A double quote was opened but never closed
    #[error("unterminated double quote starting at byte {0}")]
    UnterminatedDoubleQuote(usize),

    /// Command line ended with an unescaped backslash
    #[error("command line ends with a backslash")]
    TrailingBackslash,
}

/// Main error type for seatkit
#[derive(Debug, Error)]
pub enum SeatError {
    // === Job errors ===
    /// Job was executed without a command
    #[error("Job has no command set")]
    NoCommand,

    /// Command line could not be tokenized
    #[error("Invalid command line: {0}")]
    CommandLine(#[from] ArgvError),

    /// Spawning the child process failed
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Job was executed twice
    #[error("Job {0} has already been started")]
    AlreadyStarted(u64),

    // === Session errors ===
    /// No leader registered for the cookie
    #[error("Session not found: {0}")]
    LeaderNotFound(String),

    /// A leader is already registered for the cookie
    #[error("Session already exists: {0}")]
    LeaderAlreadyExists(String),

    // === Configuration errors ===
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // === External errors ===
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic errors ===
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Cancelled
    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type for seatkit
pub type Result<T> = std::result::Result<T, SeatError>;

impl SeatError {
    /// Get the bus error code for this error
    pub fn error_code(&self) -> ErrorCode {
        match self {
            SeatError::NoCommand => ErrorCode::General,
            SeatError::CommandLine(_) => ErrorCode::InvalidArguments,
            SeatError::Spawn { .. } => ErrorCode::SpawnFailed,
            SeatError::AlreadyStarted(_) => ErrorCode::General,
            SeatError::LeaderNotFound(_) => ErrorCode::NoSuchSession,
            SeatError::LeaderAlreadyExists(_) => ErrorCode::General,
            SeatError::ConfigError(_) => ErrorCode::General,
            SeatError::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                ErrorCode::InsufficientPermission
            }
            SeatError::Io(_) => ErrorCode::General,
            SeatError::Json(_) => ErrorCode::InvalidArguments,
            SeatError::Internal(_) => ErrorCode::General,
            SeatError::Cancelled => ErrorCode::Cancelled,
        }
    }

    /// Check if this error is retryable
    ///
    /// Jobs never retry on their own; this is a hint for the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            SeatError::Spawn { source, .. } | SeatError::Io(source) => matches!(
                source.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::OutOfMemory
            ),
            _ => false,
        }
    }

    /// Check if this error is a client error (caused by invalid input)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SeatError::LeaderNotFound(_) | SeatError::CommandLine(_) | SeatError::Json(_)
        )
    }

    // === Constructor helpers ===

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        SeatError::Internal(msg.into())
    }

    /// Create a spawn error
    pub fn spawn(command: impl Into<String>, source: std::io::Error) -> Self {
        SeatError::Spawn {
            command: command.into(),
            source,
        }
    }

    /// Create a leader not found error
    pub fn leader_not_found(cookie: impl Into<String>) -> Self {
        SeatError::LeaderNotFound(cookie.into())
    }

    /// Create a configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        SeatError::ConfigError(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SeatError::leader_not_found("cookie-123");
        assert_eq!(err.to_string(), "Session not found: cookie-123");

        let err = SeatError::from(ArgvError::TrailingBackslash);
        assert_eq!(
            err.to_string(),
            "Invalid command line: command line ends with a backslash"
        );
    }

    #[test]
    fn test_spawn_error_keeps_source() {
        use std::error::Error as _;

        let err = SeatError::spawn(
            "/nonexistent --uid 0",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(err.to_string().starts_with("Failed to spawn `/nonexistent --uid 0`"));
        assert!(err.source().is_some());
        assert_eq!(err.error_code(), ErrorCode::SpawnFailed);
    }

    #[test]
    fn test_error_codes() {
        let err = SeatError::leader_not_found("x");
        assert_eq!(err.error_code(), ErrorCode::NoSuchSession);
        assert_eq!(
            err.error_code().name(),
            "org.freedesktop.ConsoleKit.Error.NoSuchSession"
        );

        let err = SeatError::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert_eq!(err.error_code(), ErrorCode::InsufficientPermission);

        assert_eq!(SeatError::Cancelled.error_code(), ErrorCode::Cancelled);
    }

    #[test]
    fn test_is_retryable() {
        let err = SeatError::spawn("helper", std::io::Error::from(std::io::ErrorKind::Interrupted));
        assert!(err.is_retryable());

        let err = SeatError::spawn("helper", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(!err.is_retryable());
        assert!(!SeatError::Cancelled.is_retryable());
    }

    #[test]
    fn test_is_client_error() {
        assert!(SeatError::leader_not_found("x").is_client_error());
        assert!(SeatError::from(ArgvError::Empty).is_client_error());
        assert!(!SeatError::NoCommand.is_client_error());
        assert!(!SeatError::internal("oops").is_client_error());
    }
}
