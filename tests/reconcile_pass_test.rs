//! Integration tests for whole reconcile passes.
//!
//! These tests verify that:
//! - Dependents are created with the instance as controller
//! - Readiness of dependents drives the Available condition
//! - Terminal dependent failures request a fast retry
//! - Status is persisted on every pass

#![forbid(clippy::unwrap_used)]
#![forbid(clippy::expect_used)]

use std::time::Duration;

use async_trait::async_trait;
use opkit::prelude::*;
use opkit::reconciler::{Error, Result};
use serde_json::{Value, json};

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

/// Observes the instance's web deployment and classifies it by kind.
struct GatewayState {
    store: Arc<InMemoryObjectStore>,
    registry: ReadinessRegistry,
    deployment: Option<DynamicObject>,
}

impl GatewayState {
    fn new(store: Arc<InMemoryObjectStore>) -> Self {
        Self {
            store,
            registry: ReadinessRegistry::default(),
            deployment: None,
        }
    }
}

#[async_trait]
impl Observer for GatewayState {
    async fn read(&mut self, _instance: &DynamicObject) -> Result<()> {
        self.deployment = match self.store.get(&web_deployment(None).object_reference()).await {
            Ok(found) => Some(found),
            Err(Error::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        Ok(())
    }
}

#[async_trait]
impl ReadinessProbe for GatewayState {
    async fn is_resources_ready(&self, _instance: &DynamicObject) -> Result<bool> {
        let current = match self.store.get(&web_deployment(None).object_reference()).await {
            Ok(found) => Some(found),
            Err(Error::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        self.registry.classify(current.as_ref())
    }
}

fn gateway() -> DynamicObject {
    new_object("gateway.example.com/v1", "Gateway", "edge").within("apps")
}

fn other_gateway() -> DynamicObject {
    new_object("gateway.example.com/v1", "Gateway", "other")
        .within("apps")
        .with_uid("other-uid")
}

fn web_deployment(status: Option<Value>) -> DynamicObject {
    let object = new_object("apps/v1", "Deployment", "edge-web").within("apps");
    match status {
        Some(status) => object.data(json!({ "spec": {"replicas": 2}, "status": status })),
        None => object.data(json!({ "spec": {"replicas": 2} })),
    }
}

fn settings() -> DynamicObject {
    new_object("v1", "ConfigMap", "edge-settings")
        .within("apps")
        .data(json!({ "data": {"listen": ":8080"} }))
}

fn foreign_settings() -> std::result::Result<DynamicObject, opkit::model::Error> {
    let mut foreign = settings();
    opkit::model::set_controller_reference(&other_gateway(), &mut foreign)?;
    Ok(foreign)
}

/// Desired state: deployment and settings exist, owned by the gateway.
fn compute(state: &GatewayState) -> DesiredState {
    let mut desired = DesiredState::new();
    if state.deployment.is_none() {
        desired
            .add_action(Action::create(
                web_deployment(Some(json!({"conditions": [{"type": "Progressing", "status": "False"}]}))),
                "create web deployment",
            ))
            .add_action(Action::create(settings(), "create settings"));
    } else {
        desired.add_action(Action::update(settings(), "update settings"));
    }
    desired
}

async fn setup() -> std::result::Result<(ReconcileCycle, Arc<InMemoryObjectStore>, DynamicObject), Error> {
    let store = Arc::new(InMemoryObjectStore::new());
    store.create(&gateway()).await?;
    let instance = store.get(&gateway().object_reference()).await?;
    Ok((ReconcileCycle::new(store.clone()), store, instance))
}

fn available(status: &CommonStatus) -> std::result::Result<&Condition, String> {
    status
        .condition(ConditionType::Available)
        .ok_or_else(|| "Available condition missing".to_string())
}

/// Test the lifecycle of a gateway from first pass to ready.
///
/// # GIVEN
/// A gateway instance with no dependents
///
/// # WHEN
/// Passes run while the web deployment progresses to ready
///
/// # THEN
/// The Available condition moves from Initializing to Reconciling and both
/// passes resync slowly
#[tokio::test]
async fn test_gateway_becomes_available() -> TestResult {
    // GIVEN
    let (cycle, store, instance) = setup().await?;
    let mut status = CommonStatus::new();
    let mut state = GatewayState::new(store.clone());

    // WHEN: first pass creates the dependents
    let result = cycle.reconcile(&instance, &mut status, &mut state, compute).await;

    // THEN
    assert_eq!(result, ReconcileResult::success());
    assert_eq!(result.requeue_after, Duration::from_secs(60 * 60));
    let condition = available(&status)?;
    assert_eq!(condition.status, ConditionStatus::False);
    assert_eq!(condition.reason, Some(StatusReason::Initializing));

    let deployment = store.get(&web_deployment(None).object_reference()).await?;
    let owner = deployment
        .controller_ref()
        .ok_or("deployment has no controller")?;
    assert_eq!(Some(owner.uid.as_str()), instance.metadata.uid.as_deref());
    assert!(store.contains(&settings().object_reference()).await);

    // WHEN: the deployment finishes progressing
    store
        .update(&web_deployment(Some(json!({"conditions": [
            {"type": "Available", "status": "True"},
            {"type": "Progressing", "status": "True", "reason": "NewReplicaSetAvailable"}
        ]}))))
        .await?;
    let result = cycle.reconcile(&instance, &mut status, &mut state, compute).await;

    // THEN
    assert_eq!(result, ReconcileResult::success());
    let condition = available(&status)?;
    assert_eq!(condition.status, ConditionStatus::True);
    assert_eq!(condition.reason, Some(StatusReason::Reconciling));
    assert_eq!(status.conditions.len(), 1);

    let persisted = store
        .status(&instance.object_reference())
        .await
        .ok_or("status was not persisted")?;
    assert_eq!(persisted, status);
    Ok(())
}

/// Test that a replica failure is surfaced as Failing.
///
/// # GIVEN
/// A gateway whose web deployment reports a replica failure
///
/// # WHEN
/// A pass runs
///
/// # THEN
/// Available is False with reason Failing, the failure reason is the
/// message, and the pass requeues after 5 seconds
#[tokio::test]
async fn test_replica_failure_is_failing() -> TestResult {
    // GIVEN
    let (cycle, store, instance) = setup().await?;
    store
        .create(&web_deployment(Some(json!({"conditions": [
            {"type": "ReplicaFailure", "status": "True", "reason": "FailedCreate"}
        ]}))))
        .await?;
    store.create(&settings()).await?;
    let mut status = CommonStatus::new();
    let mut state = GatewayState::new(store.clone());

    // WHEN
    let result = cycle.reconcile(&instance, &mut status, &mut state, compute).await;

    // THEN
    assert_eq!(result, ReconcileResult::error());
    assert!(result.requeue);
    let condition = available(&status)?;
    assert_eq!(condition.reason, Some(StatusReason::Failing));
    assert_eq!(condition.message, "FailedCreate");
    Ok(())
}

/// Test that a stored dependent owned by someone else fails the pass.
///
/// # GIVEN
/// A stored settings object already controlled by a different owner
///
/// # WHEN
/// A pass updates it from a freshly built copy without owner references
///
/// # THEN
/// The pass fails fast, records Failing and leaves the stored controller
/// in place
#[tokio::test]
async fn test_foreign_controller_fails_pass() -> TestResult {
    // GIVEN
    let (cycle, store, instance) = setup().await?;
    store.create(&web_deployment(Some(json!({"conditions": []})))).await?;
    store.create(&foreign_settings()?).await?;

    let mut status = CommonStatus::new();
    let mut state = GatewayState::new(store.clone());

    // WHEN
    let result = cycle.reconcile(&instance, &mut status, &mut state, compute).await;

    // THEN
    assert_eq!(result, ReconcileResult::error());
    let condition = available(&status)?;
    assert_eq!(condition.reason, Some(StatusReason::Failing));
    assert!(condition.message.contains("already controlled"), "{}", condition.message);

    let stored = store.get(&settings().object_reference()).await?;
    let owner = stored.controller_ref().ok_or("settings lost its controller")?;
    assert_eq!(owner.name, "other");
    Ok(())
}

/// Test that a desired object carrying another controller fails the pass.
///
/// # GIVEN
/// Unowned stored settings and a desired copy controlled by another gateway
///
/// # WHEN
/// A pass applies the desired copy
///
/// # THEN
/// The pass fails fast and the stored settings stay unowned
#[tokio::test]
async fn test_desired_object_with_foreign_controller_fails_pass() -> TestResult {
    // GIVEN
    let (cycle, store, instance) = setup().await?;
    store.create(&web_deployment(Some(json!({"conditions": []})))).await?;
    store.create(&settings()).await?;
    let foreign = foreign_settings()?;

    let mut status = CommonStatus::new();
    let mut state = GatewayState::new(store.clone());

    // WHEN
    let result = cycle
        .reconcile(&instance, &mut status, &mut state, |_: &GatewayState| {
            let mut desired = DesiredState::new();
            desired.add_action(Action::update(foreign, "update settings"));
            desired
        })
        .await;

    // THEN
    assert_eq!(result, ReconcileResult::error());
    assert_eq!(available(&status)?.reason, Some(StatusReason::Failing));
    let stored = store.get(&settings().object_reference()).await?;
    assert!(stored.controller_ref().is_none());
    Ok(())
}

/// Test that a not-ready observation reports Initializing.
///
/// # GIVEN
/// An observer that reports its dependent as not ready
///
/// # WHEN
/// The current state is read
///
/// # THEN
/// The pass stops with reason Initializing and a fast retry
#[tokio::test]
async fn test_not_ready_observation_is_initializing() -> TestResult {
    struct Pending;

    #[async_trait]
    impl Observer for Pending {
        async fn read(&mut self, _instance: &DynamicObject) -> Result<()> {
            Err(Error::not_ready_for(&web_deployment(None)))
        }
    }

    // GIVEN
    let (cycle, _, instance) = setup().await?;
    let mut status = CommonStatus::new();

    // WHEN
    let flow = cycle
        .read_current_state(&instance, &mut status, &mut Pending)
        .await;

    // THEN
    assert_eq!(flow, std::ops::ControlFlow::Break(ReconcileResult::error()));
    let condition = available(&status)?;
    assert_eq!(condition.reason, Some(StatusReason::Initializing));
    assert_eq!(condition.message, "apps/edge-web is not ready");
    Ok(())
}
