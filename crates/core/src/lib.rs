//! Object model shared by the opkit crates.
//!
//! Built on `kube` and `k8s-openapi`:
//!
//! - **Metadata**: capability keys, owner and reference identity rules
//! - **Dynamic objects**: helpers over `kube`'s loosely typed objects
//! - **Ownership**: controller references from a managing instance to its dependents
//! - **Status**: lifecycle conditions and related objects

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod error;
pub mod meta;
pub mod object;
pub mod owner;
pub mod status;

pub use error::{Error, Result};
pub use meta::{
    CapabilityKey, GroupVersionKind, GroupVersionKindExt, ObjectMeta, ObjectReference,
    OwnerReference, api_group, controller_of, describe_reference, is_controller, parse_gvk,
    same_object, same_owner,
};
pub use object::{ApiResource, DynamicObject, DynamicObjectExt, TypeMeta, new_object, to_dynamic};
pub use owner::set_controller_reference;
pub use status::{
    CommonStatus, Condition, ConditionStatus, ConditionType, StatusReason, find_status_condition,
    remove_status_condition, set_status_condition,
};
