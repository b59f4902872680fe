//! Controller reference management.
//!
//! The reference itself comes from [`kube::Resource::controller_owner_ref`];
//! this module adds the scope and single-controller checks on top.

use crate::error::{Error, Result};
use crate::meta::same_owner;
use crate::object::{DynamicObject, DynamicObjectExt};

/// Make `owner` the managing controller of `object`.
///
/// The owner reference is upserted, so applying it twice is a no-op.
///
/// # Errors
///
/// Returns an error if the owner has no name or UID, if the scopes are
/// incompatible (cluster-scoped object with a namespaced owner, or owner
/// and object in different namespaces), or if `object` is already
/// controlled by a different owner.
pub fn set_controller_reference(owner: &DynamicObject, object: &mut DynamicObject) -> Result<()> {
    validate_owner(owner, object)?;

    let reference = owner
        .controller_owner_reference()
        .map_err(|e| Error::owner_reference(object.qualified_name(), e.to_string()))?;

    if let Some(existing) = object.controller_ref() {
        if !same_owner(existing, &reference) {
            return Err(Error::already_owned(
                object.qualified_name(),
                existing.kind.clone(),
                existing.name.clone(),
            ));
        }
    }

    tracing::debug!(
        object = %object.qualified_name(),
        owner = %reference.name,
        kind = %reference.kind,
        "Setting controller reference"
    );

    let refs = object.metadata.owner_references.get_or_insert_with(Vec::new);
    match refs.iter_mut().find(|r| same_owner(r, &reference)) {
        Some(slot) => *slot = reference,
        None => refs.push(reference),
    }
    Ok(())
}

fn validate_owner(owner: &DynamicObject, object: &DynamicObject) -> Result<()> {
    let Some(owner_ns) = owner.namespace_scope() else {
        // Cluster-scoped owners may own anything.
        return Ok(());
    };

    match object.namespace_scope() {
        None => Err(Error::owner_reference(
            object.qualified_name(),
            format!(
                "cluster-scoped resource must not have a namespace-scoped owner, owner's namespace {owner_ns}"
            ),
        )),
        Some(object_ns) if object_ns != owner_ns => Err(Error::owner_reference(
            object.qualified_name(),
            format!(
                "cross-namespace owner references are disallowed, owner's namespace {owner_ns}, obj's namespace {object_ns}"
            ),
        )),
        Some(_) => Ok(()),
    }
}
