//! Readiness classification for dependent resources.
//!
//! Every predicate takes an optional resource and answers `Ok(true)` for
//! ready, `Ok(false)` for pending and `Err` for a terminal failure. An
//! absent resource is always pending.

use std::collections::HashMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Endpoints;
use opkit_core::{DynamicObject, DynamicObjectExt};
use serde_json::Value;

use crate::error::{Error, Result};

const CONDITION_STATUS_TRUE: &str = "True";
const READY_CONDITION: &str = "Ready";
const COMPONENTS_READY: &str = "ComponentsReady";
const REPLICA_FAILURE: &str = "ReplicaFailure";
const PROGRESSING: &str = "Progressing";

/// Deployment readiness.
///
/// Conditions are scanned in order: the first `ReplicaFailure` fails with
/// its reason, the first `Progressing` that is not `True` means pending.
///
/// # Errors
///
/// Returns [`Error::ResourceFailed`] when a replica failure is reported.
pub fn is_deployment_ready(resource: Option<&Deployment>) -> Result<bool> {
    let Some(deployment) = resource else {
        return Ok(false);
    };

    let conditions = deployment
        .status
        .as_ref()
        .and_then(|status| status.conditions.as_deref())
        .unwrap_or_default();

    for condition in conditions {
        match condition.type_.as_str() {
            REPLICA_FAILURE => {
                return Err(Error::resource_failed(
                    condition.reason.clone().unwrap_or_default(),
                ));
            }
            PROGRESSING if condition.status != CONDITION_STATUS_TRUE => return Ok(false),
            _ => {}
        }
    }

    Ok(true)
}

/// Endpoints readiness: some subset has at least one address.
///
/// # Errors
///
/// Never fails; the `Result` keeps the predicate signature uniform.
pub fn is_endpoints_ready(resource: Option<&Endpoints>) -> Result<bool> {
    Ok(resource
        .and_then(|endpoints| endpoints.subsets.as_deref())
        .is_some_and(|subsets| {
            subsets
                .iter()
                .any(|subset| subset.addresses.as_ref().is_some_and(|a| !a.is_empty()))
        }))
}

/// Job readiness.
///
/// # Errors
///
/// Returns [`Error::ResourceFailed`] as soon as any pod has failed.
pub fn is_job_ready(resource: Option<&Job>) -> Result<bool> {
    let Some(job) = resource else {
        return Ok(false);
    };

    let status = job.status.clone().unwrap_or_default();
    let (active, succeeded, failed) = (
        status.active.unwrap_or(0),
        status.succeeded.unwrap_or(0),
        status.failed.unwrap_or(0),
    );
    if failed > 0 {
        return Err(Error::resource_failed(format!(
            "Job Failed, check log for {}/{}",
            job.metadata.namespace.as_deref().unwrap_or_default(),
            job.metadata.name.as_deref().unwrap_or_default()
        )));
    }
    if active > 0 || succeeded == 0 {
        return Ok(false);
    }
    Ok(succeeded > 0)
}

/// Which field of a `Ready` condition marks readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyDiscriminator {
    /// `reason == "ComponentsReady"`.
    ComponentsReady,
    /// `status == "True"`.
    StatusTrue,
}

impl ReadyDiscriminator {
    fn matches(self, condition: &serde_json::Map<String, Value>) -> bool {
        let field = |key: &str| condition.get(key).and_then(Value::as_str);
        if field("type") != Some(READY_CONDITION) {
            return false;
        }
        match self {
            Self::ComponentsReady => field("reason") == Some(COMPONENTS_READY),
            Self::StatusTrue => field("status") == Some(CONDITION_STATUS_TRUE),
        }
    }
}

/// Readiness from the `status.conditions` list of a loosely typed object.
///
/// # Errors
///
/// Returns [`Error::ConditionsNotFound`] when `status.conditions` is missing,
/// is not a list, or holds an entry that is not an object.
pub fn is_condition_ready(resource: Option<&DynamicObject>, discriminator: ReadyDiscriminator) -> Result<bool> {
    let Some(object) = resource else {
        return Ok(false);
    };

    let not_found = || Error::conditions_not_found(object.object_kind());
    let conditions = object
        .nested(&["status", "conditions"])
        .and_then(Value::as_array)
        .ok_or_else(not_found)?;

    for item in conditions {
        let condition = item.as_object().ok_or_else(not_found)?;
        if discriminator.matches(condition) {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Service mesh control plane: `Ready` with reason `ComponentsReady`.
///
/// # Errors
///
/// See [`is_condition_ready`].
pub fn is_service_mesh_control_plane_ready(resource: Option<&DynamicObject>) -> Result<bool> {
    is_condition_ready(resource, ReadyDiscriminator::ComponentsReady)
}

/// Service mesh member roll: `Ready` with status `True`.
///
/// # Errors
///
/// See [`is_condition_ready`].
pub fn is_service_mesh_member_roll_ready(resource: Option<&DynamicObject>) -> Result<bool> {
    is_condition_ready(resource, ReadyDiscriminator::StatusTrue)
}

/// Service mesh member: `Ready` with status `True`.
///
/// # Errors
///
/// See [`is_condition_ready`].
pub fn is_service_mesh_member_ready(resource: Option<&DynamicObject>) -> Result<bool> {
    is_condition_ready(resource, ReadyDiscriminator::StatusTrue)
}

/// How a kind is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessPolicy {
    Deployment,
    Endpoints,
    Job,
    Conditions(ReadyDiscriminator),
}

impl ReadinessPolicy {
    /// Classify `resource` under this policy.
    ///
    /// # Errors
    ///
    /// Returns the predicate's failure, or [`Error::Object`] when a typed
    /// policy cannot decode the object.
    pub fn classify(self, resource: Option<&DynamicObject>) -> Result<bool> {
        let Some(object) = resource else {
            return Ok(false);
        };
        match self {
            Self::Deployment => is_deployment_ready(Some(&object.to_typed::<Deployment>()?)),
            Self::Endpoints => is_endpoints_ready(Some(&object.to_typed::<Endpoints>()?)),
            Self::Job => is_job_ready(Some(&object.to_typed::<Job>()?)),
            Self::Conditions(discriminator) => is_condition_ready(Some(object), discriminator),
        }
    }
}

/// Kind-to-policy lookup for loosely typed dependents.
///
/// Kinds without a registered policy fall back to `Ready` conditions with
/// status `True`.
#[derive(Debug, Clone)]
pub struct ReadinessRegistry {
    policies: HashMap<String, ReadinessPolicy>,
    fallback: ReadinessPolicy,
}

impl Default for ReadinessRegistry {
    fn default() -> Self {
        Self::new()
            .with_policy("Deployment", ReadinessPolicy::Deployment)
            .with_policy("Endpoints", ReadinessPolicy::Endpoints)
            .with_policy("Job", ReadinessPolicy::Job)
            .with_policy(
                "ServiceMeshControlPlane",
                ReadinessPolicy::Conditions(ReadyDiscriminator::ComponentsReady),
            )
            .with_policy(
                "ServiceMeshMemberRoll",
                ReadinessPolicy::Conditions(ReadyDiscriminator::StatusTrue),
            )
            .with_policy(
                "ServiceMeshMember",
                ReadinessPolicy::Conditions(ReadyDiscriminator::StatusTrue),
            )
    }
}

impl ReadinessRegistry {
    /// An empty registry; every kind uses the fallback.
    #[must_use]
    pub fn new() -> Self {
        Self {
            policies: HashMap::new(),
            fallback: ReadinessPolicy::Conditions(ReadyDiscriminator::StatusTrue),
        }
    }

    /// Register `policy` for `kind`, replacing any previous one.
    #[must_use]
    pub fn with_policy(mut self, kind: impl Into<String>, policy: ReadinessPolicy) -> Self {
        self.policies.insert(kind.into(), policy);
        self
    }

    /// Replace the fallback policy.
    #[must_use]
    pub const fn with_fallback(mut self, policy: ReadinessPolicy) -> Self {
        self.fallback = policy;
        self
    }

    /// The policy used for `kind`.
    #[must_use]
    pub fn policy_for(&self, kind: &str) -> ReadinessPolicy {
        self.policies.get(kind).copied().unwrap_or(self.fallback)
    }

    /// Classify a dependent by its kind.
    ///
    /// # Errors
    ///
    /// See [`ReadinessPolicy::classify`].
    pub fn classify(&self, resource: Option<&DynamicObject>) -> Result<bool> {
        match resource {
            None => Ok(false),
            Some(object) => self.policy_for(object.object_kind()).classify(Some(object)),
        }
    }

    /// Whether every resource is ready. Stops at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first classification failure.
    pub fn all_ready<'a, I>(&self, resources: I) -> Result<bool>
    where
        I: IntoIterator<Item = Option<&'a DynamicObject>>,
    {
        let mut ready = true;
        for resource in resources {
            ready &= self.classify(resource)?;
        }
        Ok(ready)
    }
}
