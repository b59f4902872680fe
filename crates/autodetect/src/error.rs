//! Error types for capability detection.

use thiserror::Error;

/// Result type alias for autodetect operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Autodetect error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Listing the server's API resources failed.
    #[error("Failed to get API List: {reason}")]
    Discovery { reason: String },

    /// Detection configuration could not be loaded.
    #[error("config error: {reason}")]
    Config { reason: String },
}

impl Error {
    /// Create a discovery error.
    pub fn discovery(reason: impl Into<String>) -> Self {
        Self::Discovery {
            reason: reason.into(),
        }
    }

    /// Create a config error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::config(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse config: {e}"))
    }
}
