//! Error types for the reconciler crate.

use opkit_core::{DynamicObject, DynamicObjectExt};
use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A create/update/delete against the object store failed.
    #[error("failed to {operation} '{target}': {reason}")]
    Apply {
        operation: String,
        target: String,
        reason: String,
    },

    /// The object model rejected the operation (owner reference, shape).
    #[error(transparent)]
    Object(#[from] opkit_core::Error),

    /// The target object does not exist.
    #[error("'{target}' not found")]
    NotFound { target: String },

    /// The target object already exists.
    #[error("'{target}' already exists")]
    AlreadyExists { target: String },

    /// A dependent resource has not reached a ready state yet.
    #[error("{namespace}/{name} is not ready")]
    NotReady { namespace: String, name: String },

    /// Reading the current state failed.
    #[error("failed to observe current state: {reason}")]
    Observation { reason: String },

    /// A dependent resource reports a terminal failure.
    #[error("{reason}")]
    ResourceFailed { reason: String },

    /// A loosely typed resource carries no usable status conditions.
    #[error("Status Conditions for {kind} is not found")]
    ConditionsNotFound { kind: String },

    /// Persisting the status sub-resource failed.
    #[error("failed to update status: {reason}")]
    StatusUpdate { reason: String },
}

impl Error {
    /// Create an apply error.
    pub fn apply(
        operation: impl Into<String>,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Apply {
            operation: operation.into(),
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(target: impl Into<String>) -> Self {
        Self::NotFound {
            target: target.into(),
        }
    }

    /// Create an already exists error.
    pub fn already_exists(target: impl Into<String>) -> Self {
        Self::AlreadyExists {
            target: target.into(),
        }
    }

    /// Create a not ready error.
    pub fn not_ready(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotReady {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create a not ready error for an observed (possibly partial) object.
    #[must_use]
    pub fn not_ready_for(object: &DynamicObject) -> Self {
        Self::not_ready(object.namespace_scope().unwrap_or_default(), object.object_name())
    }

    /// Create an observation error.
    pub fn observation(reason: impl Into<String>) -> Self {
        Self::Observation {
            reason: reason.into(),
        }
    }

    /// Create a resource failed error.
    pub fn resource_failed(reason: impl Into<String>) -> Self {
        Self::ResourceFailed {
            reason: reason.into(),
        }
    }

    /// Create a conditions not found error.
    pub fn conditions_not_found(kind: impl Into<String>) -> Self {
        Self::ConditionsNotFound { kind: kind.into() }
    }

    /// Create a status update error.
    pub fn status_update(reason: impl Into<String>) -> Self {
        Self::StatusUpdate {
            reason: reason.into(),
        }
    }

    /// Whether this error only means a dependent is not ready yet.
    #[must_use]
    pub const fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opkit_core::new_object;

    #[test]
    fn test_not_ready_display() {
        let err = Error::not_ready("ns", "web");
        assert_eq!(err.to_string(), "ns/web is not ready");
        assert!(err.is_not_ready());
    }

    #[test]
    fn test_not_ready_for_object() {
        let obj = new_object("apps/v1", "Deployment", "web").within("ns");
        assert_eq!(Error::not_ready_for(&obj), Error::not_ready("ns", "web"));
    }

    #[test]
    fn test_apply_display() {
        let err = Error::apply("create", "ns/web", "quota exceeded");
        let msg = err.to_string();
        assert!(msg.contains("create"));
        assert!(msg.contains("ns/web"));
        assert!(msg.contains("quota exceeded"));
        assert!(!err.is_not_ready());
    }

    #[test]
    fn test_conditions_not_found_display() {
        let err = Error::conditions_not_found("ServiceMeshMember");
        assert_eq!(err.to_string(), "Status Conditions for ServiceMeshMember is not found");
    }

    #[test]
    fn test_object_error_is_transparent() {
        let err: Error = opkit_core::Error::invalid_object("no uid").into();
        assert_eq!(err.to_string(), "invalid object: no uid");
    }
}
