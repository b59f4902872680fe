//! Core error types for object-model operations.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for object-model operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // Ownership errors
    #[error("cannot set owner reference on '{object}': {reason}")]
    OwnerReference { object: String, reason: String },

    #[error("object '{object}' is already controlled by {kind} '{owner}'")]
    AlreadyOwned {
        object: String,
        kind: String,
        owner: String,
    },

    // Shape errors
    #[error("invalid object: {reason}")]
    InvalidObject { reason: String },

    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}

impl Error {
    /// Create an owner reference error.
    pub fn owner_reference(object: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OwnerReference {
            object: object.into(),
            reason: reason.into(),
        }
    }

    /// Create an already-owned error.
    pub fn already_owned(
        object: impl Into<String>,
        kind: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self::AlreadyOwned {
            object: object.into(),
            kind: kind.into(),
            owner: owner.into(),
        }
    }

    /// Create an invalid object error.
    pub fn invalid_object(reason: impl Into<String>) -> Self {
        Self::InvalidObject {
            reason: reason.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
