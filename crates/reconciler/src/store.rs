//! Object store trait and implementations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use opkit_core::{CommonStatus, DynamicObject, DynamicObjectExt, ObjectReference, api_group, describe_reference};
use tokio::sync::RwLock;

use crate::error::{Error, Result};

/// Trait for object storage backends.
///
/// Implementations talk to the real API server (or a fake of it). Errors
/// are returned as-is to the action runner; no retries happen here.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object by reference.
    async fn get(&self, reference: &ObjectReference) -> Result<DynamicObject>;

    /// Create an object.
    async fn create(&self, object: &DynamicObject) -> Result<()>;

    /// Replace an existing object.
    async fn update(&self, object: &DynamicObject) -> Result<()>;

    /// Delete an object.
    async fn delete(&self, object: &DynamicObject) -> Result<()>;

    /// Persist the status sub-resource of a managed instance.
    async fn update_status(&self, instance: &DynamicObject, status: &CommonStatus) -> Result<()>;
}

/// Identity of a stored object. Versions of the same group share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ObjectKey {
    group: String,
    kind: String,
    namespace: Option<String>,
    name: String,
}

impl ObjectKey {
    fn of(object: &DynamicObject) -> Self {
        Self {
            group: api_group(object.object_api_version()).to_string(),
            kind: object.object_kind().to_string(),
            namespace: object.namespace_scope().map(str::to_string),
            name: object.object_name().to_string(),
        }
    }

    fn of_reference(reference: &ObjectReference) -> Self {
        Self {
            group: api_group(reference.api_version.as_deref().unwrap_or_default()).to_string(),
            kind: reference.kind.clone().unwrap_or_default(),
            namespace: reference.namespace.clone().filter(|ns| !ns.is_empty()),
            name: reference.name.clone().unwrap_or_default(),
        }
    }
}

/// In-memory object store for testing and local runs.
///
/// Assigns UIDs on create and bumps resource versions on every write.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectKey, DynamicObject>>,
    statuses: RwLock<HashMap<ObjectKey, CommonStatus>>,
    revision: AtomicU64,
}

impl InMemoryObjectStore {
    /// Create a new in-memory object store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_revision(&self) -> String {
        self.revision
            .fetch_add(1, Ordering::Relaxed)
            .saturating_add(1)
            .to_string()
    }

    /// The last persisted status for `reference`.
    pub async fn status(&self, reference: &ObjectReference) -> Option<CommonStatus> {
        self.statuses
            .read()
            .await
            .get(&ObjectKey::of_reference(reference))
            .cloned()
    }

    /// Whether an object is stored under `reference`.
    pub async fn contains(&self, reference: &ObjectReference) -> bool {
        self.objects
            .read()
            .await
            .contains_key(&ObjectKey::of_reference(reference))
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, reference: &ObjectReference) -> Result<DynamicObject> {
        self.objects
            .read()
            .await
            .get(&ObjectKey::of_reference(reference))
            .cloned()
            .ok_or_else(|| Error::not_found(describe_reference(reference)))
    }

    async fn create(&self, object: &DynamicObject) -> Result<()> {
        let key = ObjectKey::of(object);
        let mut objects = self.objects.write().await;
        if objects.contains_key(&key) {
            return Err(Error::already_exists(object.qualified_name()));
        }

        let mut stored = object.clone();
        let revision = self.next_revision();
        if stored.metadata.uid.as_deref().is_none_or(str::is_empty) {
            stored.metadata.uid = Some(format!("uid-{revision}"));
        }
        stored.metadata.resource_version = Some(revision);
        objects.insert(key, stored);
        Ok(())
    }

    async fn update(&self, object: &DynamicObject) -> Result<()> {
        let key = ObjectKey::of(object);
        let mut objects = self.objects.write().await;
        let Some(existing) = objects.get_mut(&key) else {
            return Err(Error::not_found(object.qualified_name()));
        };

        let uid = existing.metadata.uid.clone();
        *existing = object.clone();
        existing.metadata.uid = uid;
        existing.metadata.resource_version = Some(self.next_revision());
        Ok(())
    }

    async fn delete(&self, object: &DynamicObject) -> Result<()> {
        let key = ObjectKey::of(object);
        self.statuses.write().await.remove(&key);
        self.objects
            .write()
            .await
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(object.qualified_name()))
    }

    async fn update_status(&self, instance: &DynamicObject, status: &CommonStatus) -> Result<()> {
        let key = ObjectKey::of(instance);
        if !self.objects.read().await.contains_key(&key) {
            return Err(Error::not_found(instance.qualified_name()));
        }
        self.statuses.write().await.insert(key, status.clone());
        Ok(())
    }
}

/// A wrapper that adds tracing to an object store.
pub struct TracingObjectStore<S: ObjectStore> {
    inner: S,
}

impl<S: ObjectStore> TracingObjectStore<S> {
    /// Create a new tracing object store.
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    /// The wrapped store.
    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for TracingObjectStore<S> {
    async fn get(&self, reference: &ObjectReference) -> Result<DynamicObject> {
        tracing::debug!(object = %describe_reference(reference), "Getting object");
        self.inner.get(reference).await
    }

    async fn create(&self, object: &DynamicObject) -> Result<()> {
        tracing::debug!(kind = %object.object_kind(), object = %object.qualified_name(), "Creating object");
        let result = self.inner.create(object).await;
        if let Err(ref e) = result {
            tracing::error!(error = %e, object = %object.qualified_name(), "Error creating object");
        }
        result
    }

    async fn update(&self, object: &DynamicObject) -> Result<()> {
        tracing::debug!(kind = %object.object_kind(), object = %object.qualified_name(), "Updating object");
        let result = self.inner.update(object).await;
        if let Err(ref e) = result {
            tracing::error!(error = %e, object = %object.qualified_name(), "Error updating object");
        }
        result
    }

    async fn delete(&self, object: &DynamicObject) -> Result<()> {
        tracing::debug!(kind = %object.object_kind(), object = %object.qualified_name(), "Deleting object");
        let result = self.inner.delete(object).await;
        if let Err(ref e) = result {
            tracing::error!(error = %e, object = %object.qualified_name(), "Error deleting object");
        }
        result
    }

    async fn update_status(&self, instance: &DynamicObject, status: &CommonStatus) -> Result<()> {
        tracing::debug!(
            instance = %instance.qualified_name(),
            conditions = status.conditions.len(),
            "Updating status"
        );
        self.inner.update_status(instance, status).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use opkit_core::new_object;
    use serde_json::json;

    fn service(name: &str) -> DynamicObject {
        new_object("v1", "Service", name).within("ns")
    }

    #[tokio::test]
    async fn test_create_assigns_uid_and_version() {
        let store = InMemoryObjectStore::new();
        store.create(&service("a")).await.unwrap();

        let stored = store.get(&service("a").object_reference()).await.unwrap();
        assert!(stored.metadata.uid.is_some());
        assert_eq!(stored.metadata.resource_version.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_create_twice_fails() {
        let store = InMemoryObjectStore::new();
        store.create(&service("a")).await.unwrap();
        let err = store.create(&service("a")).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_update_keeps_uid() {
        let store = InMemoryObjectStore::new();
        store.create(&service("a")).await.unwrap();
        let uid = store.get(&service("a").object_reference()).await.unwrap().metadata.uid;

        let changed = service("a").data(json!({"spec": {"port": 80}}));
        store.update(&changed).await.unwrap();

        let stored = store.get(&changed.object_reference()).await.unwrap();
        assert_eq!(stored.metadata.uid, uid);
        assert_eq!(stored.nested(&["spec", "port"]), Some(&json!(80)));
    }

    #[tokio::test]
    async fn test_update_missing_fails() {
        let store = InMemoryObjectStore::new();
        let err = store.update(&service("ghost")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_missing_is_an_error() {
        let store = InMemoryObjectStore::new();
        assert!(store.delete(&service("ghost")).await.is_err());
    }

    #[tokio::test]
    async fn test_update_status_requires_instance() {
        let store = InMemoryObjectStore::new();
        let status = CommonStatus::new();
        assert!(store.update_status(&service("a"), &status).await.is_err());

        store.create(&service("a")).await.unwrap();
        store.update_status(&service("a"), &status).await.unwrap();
        assert_eq!(store.status(&service("a").object_reference()).await, Some(status));
    }

    #[tokio::test]
    async fn test_tracing_store_delegates() {
        let store = TracingObjectStore::new(InMemoryObjectStore::new());
        store.create(&service("a")).await.unwrap();
        assert!(store.inner().contains(&service("a").object_reference()).await);
        assert_eq!(store.inner().len().await, 1);
    }
}
