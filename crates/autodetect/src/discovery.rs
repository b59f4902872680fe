//! API discovery: which resource kinds the server currently serves.
//!
//! Lists are the server's own `APIResourceList` documents from
//! `k8s-openapi`.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use opkit_core::GroupVersionKind;

pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::{APIResource, APIResourceList};

use crate::error::{Error, Result};

/// A served resource with the fields discovery matching reads.
#[must_use]
pub fn api_resource(name: &str, kind: &str, namespaced: bool) -> APIResource {
    APIResource {
        name: name.to_string(),
        kind: kind.to_string(),
        namespaced,
        ..APIResource::default()
    }
}

/// Every resource served under one group-version.
#[must_use]
pub fn resource_list(group_version: &str, resources: Vec<APIResource>) -> APIResourceList {
    APIResourceList {
        group_version: group_version.to_string(),
        resources,
    }
}

/// Whether `list` serves `gvk`.
#[must_use]
pub fn serves(list: &APIResourceList, gvk: &GroupVersionKind) -> bool {
    list.group_version == gvk.api_version() && list.resources.iter().any(|r| r.kind == gvk.kind)
}

/// Whether any list serves `gvk`.
#[must_use]
pub fn is_served(lists: &[APIResourceList], gvk: &GroupVersionKind) -> bool {
    lists.iter().any(|list| serves(list, gvk))
}

/// Source of the server's resource lists.
#[async_trait]
pub trait DiscoveryService: Send + Sync {
    /// List every group-version and the resources it serves.
    async fn server_resources(&self) -> Result<Vec<APIResourceList>>;
}

/// Discovery backed by a fixed, replaceable set of lists.
///
/// Useful for tests and for hosts that learn their API surface some other
/// way. `fail_with` makes the next calls error until cleared.
#[derive(Debug, Default)]
pub struct StaticDiscovery {
    lists: RwLock<Vec<APIResourceList>>,
    failure: RwLock<Option<String>>,
}

impl StaticDiscovery {
    #[must_use]
    pub fn new(lists: Vec<APIResourceList>) -> Self {
        Self {
            lists: RwLock::new(lists),
            failure: RwLock::new(None),
        }
    }

    /// Replace the served lists.
    pub fn set_lists(&self, lists: Vec<APIResourceList>) {
        *self.lists.write().unwrap_or_else(PoisonError::into_inner) = lists;
    }

    /// Serve `gvk` in addition to what is already served.
    pub fn serve(&self, gvk: &GroupVersionKind) {
        let mut lists = self.lists.write().unwrap_or_else(PoisonError::into_inner);
        let resource = api_resource(&gvk.kind.to_lowercase(), &gvk.kind, true);
        let group_version = gvk.api_version();
        match lists.iter_mut().find(|l| l.group_version == group_version) {
            Some(list) if !serves(list, gvk) => list.resources.push(resource),
            Some(_) => {}
            None => lists.push(resource_list(&group_version, vec![resource])),
        }
    }

    /// Stop serving `gvk`.
    pub fn withdraw(&self, gvk: &GroupVersionKind) {
        let mut lists = self.lists.write().unwrap_or_else(PoisonError::into_inner);
        let group_version = gvk.api_version();
        for list in lists.iter_mut().filter(|l| l.group_version == group_version) {
            list.resources.retain(|r| r.kind != gvk.kind);
        }
    }

    /// Fail discovery with `reason` until [`Self::recover`] is called.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = Some(reason.into());
    }

    /// Clear an injected failure.
    pub fn recover(&self) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[async_trait]
impl DiscoveryService for StaticDiscovery {
    async fn server_resources(&self) -> Result<Vec<APIResourceList>> {
        if let Some(reason) = self
            .failure
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(Error::discovery(reason));
        }
        Ok(self
            .lists
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}
