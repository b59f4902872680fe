//! Type and object metadata shared by every managed object.
//!
//! Metadata types are the `k8s-openapi` ones and kinds are `kube`'s
//! [`GroupVersionKind`]. This module adds the identity rules the crates
//! need on top of them: capability keys, owner matching and reference
//! matching.

use std::fmt;

use serde::{Deserialize, Serialize};

pub use k8s_openapi::api::core::v1::ObjectReference;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
pub use kube::core::GroupVersionKind;

/// Extract the API group from an `apiVersion` string.
///
/// `"apps/v1"` yields `"apps"`, the core-group form `"v1"` yields `""`.
#[must_use]
pub fn api_group(api_version: &str) -> &str {
    api_version
        .split_once('/')
        .map_or("", |(group, _)| group)
}

/// Build a [`GroupVersionKind`] from an `apiVersion` string and a kind.
#[must_use]
pub fn parse_gvk(api_version: &str, kind: &str) -> GroupVersionKind {
    let (group, version) = api_version.split_once('/').unwrap_or(("", api_version));
    GroupVersionKind::gvk(group, version, kind)
}

/// String key uniquely naming a [`GroupVersionKind`].
///
/// Rendered as `group/version, Kind=kind`, which is also how kinds show
/// up in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityKey(String);

impl CapabilityKey {
    /// Wrap an arbitrary key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&GroupVersionKind> for CapabilityKey {
    fn from(gvk: &GroupVersionKind) -> Self {
        Self(format!("{}/{}, Kind={}", gvk.group, gvk.version, gvk.kind))
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capability lookups on a kind.
pub trait GroupVersionKindExt {
    /// The key under which this kind's availability is tracked.
    fn capability_key(&self) -> CapabilityKey;
}

impl GroupVersionKindExt for GroupVersionKind {
    fn capability_key(&self) -> CapabilityKey {
        CapabilityKey::from(self)
    }
}

/// Whether `reference` marks the managing controller.
#[must_use]
pub fn is_controller(reference: &OwnerReference) -> bool {
    reference.controller.unwrap_or(false)
}

/// Whether two owner references point at the same owner.
///
/// Versions are ignored: the same kind in a different version is the
/// same owner.
#[must_use]
pub fn same_owner(a: &OwnerReference, b: &OwnerReference) -> bool {
    api_group(&a.api_version) == api_group(&b.api_version) && a.kind == b.kind && a.name == b.name
}

/// The controller reference in `meta`, if any.
#[must_use]
pub fn controller_of(meta: &ObjectMeta) -> Option<&OwnerReference> {
    meta.owner_references
        .as_deref()
        .and_then(|refs| refs.iter().find(|r| is_controller(r)))
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Whether two references identify the same object.
///
/// Matches on API group, kind, namespace and name; version, UID and
/// resource version may differ. An empty namespace is cluster scope.
#[must_use]
pub fn same_object(a: &ObjectReference, b: &ObjectReference) -> bool {
    api_group(a.api_version.as_deref().unwrap_or_default())
        == api_group(b.api_version.as_deref().unwrap_or_default())
        && a.kind == b.kind
        && non_empty(a.namespace.as_ref()) == non_empty(b.namespace.as_ref())
        && a.name == b.name
}

/// `Kind namespace/name` for logs and error messages.
#[must_use]
pub fn describe_reference(reference: &ObjectReference) -> String {
    let kind = reference.kind.as_deref().unwrap_or_default();
    let name = reference.name.as_deref().unwrap_or_default();
    match non_empty(reference.namespace.as_ref()) {
        Some(ns) => format!("{kind} {ns}/{name}"),
        None => format!("{kind} {name}"),
    }
}
