//! Reconcile cycle: read, apply, classify, persist status, schedule requeue.
//!
//! A host scheduler drives one pass per instance at a time. Every exit path
//! writes an `Available` condition to the instance status and returns the
//! delay before the next pass.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use opkit_core::{
    CommonStatus, Condition, ConditionStatus, ConditionType, DynamicObject, DynamicObjectExt, StatusReason,
};
use tracing::{debug, error};

use crate::action::DesiredState;
use crate::error::{Error, Result};
use crate::runner::{ActionRunner, ControllerActionRunner};
use crate::store::ObjectStore;

/// Requeue delay after a successful pass.
pub const REQUEUE_DELAY: Duration = Duration::from_secs(60 * 60);

/// Requeue delay after a failed pass.
pub const REQUEUE_DELAY_ERROR: Duration = Duration::from_secs(5);

const MESSAGE_READY: &str = "All resources are ready";
const MESSAGE_NOT_READY: &str = "One or more resources are not ready";

/// When the host should run the next pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    pub requeue_after: Duration,
    pub requeue: bool,
}

impl ReconcileResult {
    /// Fast retry after a failure.
    #[must_use]
    pub const fn error() -> Self {
        Self {
            requeue_after: REQUEUE_DELAY_ERROR,
            requeue: true,
        }
    }

    /// Slow resync after a success.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            requeue_after: REQUEUE_DELAY,
            requeue: false,
        }
    }
}

/// Reads the current state of an instance's dependents.
#[async_trait]
pub trait Observer: Send + Sync {
    /// Observe dependents of `instance`, caching what was found.
    async fn read(&mut self, instance: &DynamicObject) -> Result<()>;
}

/// Decides whether an instance's dependents are ready.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// `Ok(false)` means pending; `Err` means a terminal failure.
    async fn is_resources_ready(&self, instance: &DynamicObject) -> Result<bool>;
}

/// One reconcile pass against an object store.
#[derive(Clone)]
pub struct ReconcileCycle {
    store: Arc<dyn ObjectStore>,
}

impl ReconcileCycle {
    /// Create a cycle writing through `store`.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Observe current state; on failure record it and stop the pass.
    pub async fn read_current_state<O: Observer + ?Sized>(
        &self,
        instance: &DynamicObject,
        status: &mut CommonStatus,
        observer: &mut O,
    ) -> ControlFlow<ReconcileResult> {
        match observer.read(instance).await {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => ControlFlow::Break(self.manage_error(instance, status, &e).await),
        }
    }

    /// Apply `desired` on behalf of `instance`, then classify readiness.
    pub async fn run_desired_state_actions<P: ReadinessProbe + ?Sized>(
        &self,
        instance: &DynamicObject,
        status: &mut CommonStatus,
        probe: &P,
        desired: &DesiredState,
    ) -> ReconcileResult {
        let runner = ControllerActionRunner::new(Arc::clone(&self.store), instance.clone());
        self.run_desired_state_actions_with(&runner, instance, status, probe, desired)
            .await
    }

    /// Like [`Self::run_desired_state_actions`] with a caller-chosen runner.
    pub async fn run_desired_state_actions_with<R, P>(
        &self,
        runner: &R,
        instance: &DynamicObject,
        status: &mut CommonStatus,
        probe: &P,
        desired: &DesiredState,
    ) -> ReconcileResult
    where
        R: ActionRunner + ?Sized,
        P: ReadinessProbe + ?Sized,
    {
        if let Err(e) = runner.run_all(desired).await {
            return self.manage_error(instance, status, &e).await;
        }

        match probe.is_resources_ready(instance).await {
            Ok(ready) => self.manage_success(instance, status, ready).await,
            Err(e) => self.manage_error(instance, status, &e).await,
        }
    }

    /// Record a failed pass and ask for a fast retry.
    ///
    /// A not-ready dependent reports `Initializing`; anything else reports
    /// `Failing`. A failed status write is logged and does not change the
    /// result.
    pub async fn manage_error(
        &self,
        instance: &DynamicObject,
        status: &mut CommonStatus,
        issue: &Error,
    ) -> ReconcileResult {
        let reason = if issue.is_not_ready() {
            StatusReason::Initializing
        } else {
            StatusReason::Failing
        };
        status.set_condition(Condition::new(
            ConditionType::Available,
            ConditionStatus::False,
            reason,
            issue.to_string(),
        ));

        if let Err(e) = self.store.update_status(instance, status).await {
            error!(error = %e, instance = %instance.qualified_name(), "unable to update status");
        }

        ReconcileResult::error()
    }

    /// Record a completed pass.
    ///
    /// Ready and pending passes both resync slowly; only a failed status
    /// write asks for a fast retry.
    pub async fn manage_success(
        &self,
        instance: &DynamicObject,
        status: &mut CommonStatus,
        resources_ready: bool,
    ) -> ReconcileResult {
        let condition = if resources_ready {
            Condition::new(
                ConditionType::Available,
                ConditionStatus::True,
                StatusReason::Reconciling,
                MESSAGE_READY,
            )
        } else {
            Condition::new(
                ConditionType::Available,
                ConditionStatus::False,
                StatusReason::Initializing,
                MESSAGE_NOT_READY,
            )
        };
        status.set_condition(condition);

        match self.store.update_status(instance, status).await {
            Ok(()) => ReconcileResult::success(),
            Err(e) => {
                error!(error = %e, instance = %instance.qualified_name(), "unable to update status");
                ReconcileResult::error()
            }
        }
    }

    /// Run a whole pass: observe, compute desired state, apply, classify.
    pub async fn reconcile<S, F>(
        &self,
        instance: &DynamicObject,
        status: &mut CommonStatus,
        state: &mut S,
        compute: F,
    ) -> ReconcileResult
    where
        S: Observer + ReadinessProbe,
        F: FnOnce(&S) -> DesiredState,
    {
        if let ControlFlow::Break(result) = self.read_current_state(instance, status, state).await {
            return result;
        }

        let desired = compute(&*state);
        debug!(
            instance = %instance.qualified_name(),
            actions = desired.len(),
            "Computed desired state"
        );
        self.run_desired_state_actions(instance, status, &*state, &desired)
            .await
    }
}
