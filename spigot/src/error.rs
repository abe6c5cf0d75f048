//! Error types for session operations.

use thiserror::Error;

/// Errors from spawning, feeding, and waiting on a wrapped command.
#[derive(Debug, Error)]
pub enum Error {
    /// The command string has no tokens to execute.
    #[error("command is empty")]
    EmptyCommand,

    /// Failed to spawn the command.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        /// The command that could not be spawned.
        command: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A start was attempted while an earlier run is still active.
    #[error("a previous run is still active")]
    Busy,

    /// A wait was attempted with no run in flight.
    #[error("no run in flight")]
    NotRunning,

    /// Failed to write to the child's stdin.
    #[error("failed to write child stdin: {0}")]
    Stdin(#[source] std::io::Error),

    /// The child's stdin handle has already been closed.
    #[error("child stdin is closed")]
    StdinClosed,

    /// Failed to wait for the child to exit.
    #[error("failed to wait for child exit: {0}")]
    Wait(#[source] std::io::Error),
}

/// Convenience alias for results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_error_names_command() {
        let err = Error::Spawn {
            command: "frobnicate --now".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("frobnicate --now"));
    }

    #[test]
    fn test_source_chain_preserved() {
        use std::error::Error as _;

        let err = Error::Stdin(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(err.source().is_some());
    }
}
