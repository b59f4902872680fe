//! Prelude module - common imports for opkit hosts
//!
//! ```rust
//! use opkit::prelude::*;
//! ```

pub use std::sync::Arc;

// Object model
pub use opkit_core::{
    CommonStatus, Condition, ConditionStatus, ConditionType, DynamicObject, DynamicObjectExt,
    GroupVersionKind, GroupVersionKindExt, StatusReason, new_object,
};

// Reconciliation
pub use opkit_reconciler::{
    Action, ActionRunner, DesiredState, InMemoryObjectStore, ObjectStore, Observer, ReadinessProbe,
    ReadinessRegistry, ReconcileCycle, ReconcileResult,
};

// Capability detection
pub use opkit_autodetect::{
    CapabilityWatcher, DetectConfig, DiscoveryService, SharedStateStore, StaticDiscovery,
    WatcherHandle,
};
