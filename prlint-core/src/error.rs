//! Error types for prlint.

use std::{error::Error, fmt, io};

/// Error type for prlint operations.
#[derive(Debug)]
pub enum PrLintError {
    /// Contacting the hosting platform failed, or it answered with an unexpected shape.
    Transport(String),
    /// The linting engine crashed, rejected its configuration, or produced unreadable output.
    Engine(String),
    /// An invariant of the report normalizer was violated.
    Precondition(String),
    /// Startup configuration is missing or malformed.
    Config(String),
    /// An underlying I/O error.
    Io(io::Error),
}

impl PrLintError {
    /// Build a transport error from any displayable cause.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Build an engine error from any displayable cause.
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine(message.into())
    }
}

impl fmt::Display for PrLintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "transport error: {message}"),
            Self::Engine(message) => write!(f, "lint engine error: {message}"),
            Self::Precondition(message) => write!(f, "precondition failed: {message}"),
            Self::Config(message) => write!(f, "configuration error: {message}"),
            Self::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl Error for PrLintError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for PrLintError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Convenience result type for prlint.
pub type Result<T> = std::result::Result<T, PrLintError>;
