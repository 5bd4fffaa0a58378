use thiserror::Error;

use crate::graph::WaypointId;

/// Convenient result alias for the street network library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised when a raw map or configuration document is malformed, a numeric
    /// attribute is missing or unparsable, or a way references an unknown node.
    #[error("failed to parse map data: {message}")]
    Parse { message: String },

    /// Raised when a configuration document is well-formed but carries values
    /// that cannot be used for routing.
    #[error("invalid network configuration: {message}")]
    Config { message: String },

    /// Raised when a persisted network file fails validation.
    #[error("corrupt street network data: {message}")]
    CorruptData { message: String },

    /// Raised when encoding or compressing a street network fails.
    #[error("failed to serialize street network: {message}")]
    Serialize { message: String },

    /// Raised when a route endpoint is not part of the street network.
    #[error("unknown waypoint {id}")]
    UnknownWaypoint { id: WaypointId },

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Error::Parse {
            message: message.into(),
        }
    }

    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Error::CorruptData {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}
