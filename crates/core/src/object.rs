//! Loosely typed objects carried by actions and persisted by stores.
//!
//! Objects are `kube`'s [`DynamicObject`]: type metadata, `k8s-openapi`
//! object metadata and everything else flattened into `data`. Scope comes
//! from `metadata.namespace`; absent or empty means cluster-scoped.

use kube::Resource;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use kube::core::{ApiResource, DynamicObject, TypeMeta};

use crate::error::{Error, Result};
use crate::meta::{GroupVersionKind, ObjectReference, OwnerReference, controller_of, parse_gvk};

/// A dynamic object of the given type with only a name set.
#[must_use]
pub fn new_object(api_version: &str, kind: &str, name: &str) -> DynamicObject {
    DynamicObject::new(name, &ApiResource::from_gvk(&parse_gvk(api_version, kind)))
}

/// Convert a typed resource into a dynamic object.
///
/// # Errors
///
/// Returns an error if the value does not serialize to an object with
/// `apiVersion`, `kind` and `metadata`.
pub fn to_dynamic<T: Serialize>(value: &T) -> Result<DynamicObject> {
    let json = serde_json::to_value(value)?;
    Ok(serde_json::from_value(json)?)
}

/// Identity and shape helpers on [`DynamicObject`].
pub trait DynamicObjectExt {
    /// `apiVersion`, empty when the object carries no type metadata.
    fn object_api_version(&self) -> &str;

    /// `kind`, empty when the object carries no type metadata.
    fn object_kind(&self) -> &str;

    /// Object name, empty when unset.
    fn object_name(&self) -> &str;

    /// Object namespace, `None` when cluster-scoped.
    fn namespace_scope(&self) -> Option<&str>;

    /// Set the UID.
    #[must_use]
    fn with_uid(self, uid: &str) -> Self;

    /// The object's group/version/kind.
    fn gvk(&self) -> GroupVersionKind {
        parse_gvk(self.object_api_version(), self.object_kind())
    }

    /// Discovery-less resource description, used for owner references.
    fn api_resource(&self) -> ApiResource {
        ApiResource::from_gvk(&self.gvk())
    }

    /// Whether the object lives in a namespace.
    fn is_namespaced(&self) -> bool {
        self.namespace_scope().is_some()
    }

    /// `namespace/name` for logs and error messages.
    fn qualified_name(&self) -> String {
        match self.namespace_scope() {
            Some(ns) => format!("{ns}/{}", self.object_name()),
            None => self.object_name().to_string(),
        }
    }

    /// A reference to this object.
    fn object_reference(&self) -> ObjectReference;

    /// The current controller reference, if any.
    fn controller_ref(&self) -> Option<&OwnerReference>;

    /// A controller reference pointing at this object.
    ///
    /// # Errors
    ///
    /// Returns an error if the object has no name or no UID yet, i.e. it
    /// has not been persisted.
    fn controller_owner_reference(&self) -> Result<OwnerReference>;

    /// Look up a nested field by path, e.g. `["status", "conditions"]`.
    fn nested(&self, path: &[&str]) -> Option<&Value>;

    /// Deserialize this object into a typed resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the object's shape does not match `T`.
    fn to_typed<T: DeserializeOwned>(&self) -> Result<T>;
}

impl DynamicObjectExt for DynamicObject {
    fn object_api_version(&self) -> &str {
        self.types.as_ref().map_or("", |t| t.api_version.as_str())
    }

    fn object_kind(&self) -> &str {
        self.types.as_ref().map_or("", |t| t.kind.as_str())
    }

    fn object_name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    fn namespace_scope(&self) -> Option<&str> {
        self.metadata
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
    }

    fn with_uid(mut self, uid: &str) -> Self {
        self.metadata.uid = Some(uid.to_string());
        self
    }

    fn object_reference(&self) -> ObjectReference {
        ObjectReference {
            api_version: Some(self.object_api_version().to_string()),
            kind: Some(self.object_kind().to_string()),
            namespace: self.namespace_scope().map(str::to_string),
            name: self.metadata.name.clone(),
            uid: self.metadata.uid.clone(),
            resource_version: self.metadata.resource_version.clone(),
            ..ObjectReference::default()
        }
    }

    fn controller_ref(&self) -> Option<&OwnerReference> {
        controller_of(&self.metadata)
    }

    fn controller_owner_reference(&self) -> Result<OwnerReference> {
        let persisted = self
            .metadata
            .uid
            .as_deref()
            .is_some_and(|uid| !uid.is_empty())
            && !self.object_name().is_empty();
        let reference = persisted
            .then(|| self.controller_owner_ref(&self.api_resource()))
            .flatten()
            .ok_or_else(|| {
                Error::invalid_object(format!(
                    "{} '{}' has no name or uid and cannot own other objects",
                    self.object_kind(),
                    self.qualified_name()
                ))
            })?;

        Ok(OwnerReference {
            block_owner_deletion: Some(true),
            ..reference
        })
    }

    fn nested(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(&self.data, |value, key| value.get(*key))
    }

    fn to_typed<T: DeserializeOwned>(&self) -> Result<T> {
        let json = serde_json::to_value(self)?;
        Ok(serde_json::from_value(json)?)
    }
}
