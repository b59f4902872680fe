//! Action runner: applies a desired state against an object store.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use opkit_core::{DynamicObject, DynamicObjectExt, same_owner, set_controller_reference};
use tracing::{error, info, warn};

use crate::action::DesiredState;
use crate::error::{Error, Result};
use crate::store::ObjectStore;

/// Trait for applying actions.
///
/// `run_all` has a fail-fast default built on the per-operation methods.
#[async_trait]
pub trait ActionRunner: Send + Sync {
    /// Apply every action in order, stopping at the first failure.
    async fn run_all(&self, desired: &DesiredState) -> Result<()> {
        run_all_recorded(self, desired).await.into_result()
    }

    /// Create an object, setting the owner reference unless skipped.
    async fn create(&self, object: &DynamicObject, skip_owner_ref: bool) -> Result<()>;

    /// Update an object, setting the owner reference unless skipped.
    async fn update(&self, object: &DynamicObject, skip_owner_ref: bool) -> Result<()>;

    /// Delete an object.
    async fn delete(&self, object: &DynamicObject) -> Result<()>;

    /// Yield a carried error unchanged.
    fn error(&self, error: &Error) -> Result<()> {
        Err(error.clone())
    }
}

/// Outcome of a single action attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Success,
    Failed,
}

impl ActionOutcome {
    /// Upper-case label used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one attempted action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    /// Position in the desired state.
    pub index: usize,
    /// Operation name (`create`, `update`, `delete`, `error`).
    pub operation: &'static str,
    /// Whether the action applied.
    pub outcome: ActionOutcome,
    /// The action's message.
    pub message: String,
}

/// Trail of a `run_all` pass.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    /// Attempted actions, in order. Never longer than the desired state.
    pub records: im::Vector<ActionRecord>,
    /// The error that stopped the pass, if any.
    pub error: Option<Error>,
}

impl ApplyReport {
    /// Number of actions attempted, including the failed one.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.records.len()
    }

    /// Whether every action applied.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Collapse the report into the pass outcome.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the pass.
    pub fn into_result(self) -> Result<()> {
        self.error.map_or(Ok(()), Err)
    }
}

/// Apply `desired` through `runner`, recording every attempt.
///
/// Stops at the first failing action; later actions are never attempted
/// and nothing already applied is rolled back.
pub async fn run_all_recorded<R: ActionRunner + ?Sized>(runner: &R, desired: &DesiredState) -> ApplyReport {
    let mut report = ApplyReport::default();

    for (index, action) in desired.iter().enumerate() {
        let (message, outcome) = action.run(runner).await;
        let status = if outcome.is_ok() {
            ActionOutcome::Success
        } else {
            ActionOutcome::Failed
        };

        report.records.push_back(ActionRecord {
            index,
            operation: action.operation(),
            outcome: status,
            message: message.to_string(),
        });

        match outcome {
            Ok(()) => {
                info!(index, outcome = %status, operation = action.operation(), "{message}");
            }
            Err(e) => {
                warn!(index, outcome = %status, operation = action.operation(), error = %e, "{message}");
                report.error = Some(e);
                break;
            }
        }
    }

    report
}

/// Runner that applies actions on behalf of a managing instance.
///
/// Create and update establish the instance as controller of the target
/// before writing, unless the action opts out. An update keeps the owner
/// references already stored on the target, so an object controlled by
/// someone else is refused rather than taken over. Store failures surface
/// as [`Error::Apply`].
pub struct ControllerActionRunner {
    store: Arc<dyn ObjectStore>,
    owner: DynamicObject,
}

impl ControllerActionRunner {
    /// Create a runner for actions owned by `owner`.
    pub fn new(store: Arc<dyn ObjectStore>, owner: DynamicObject) -> Self {
        Self { store, owner }
    }

    /// The managing instance.
    #[must_use]
    pub const fn owner(&self) -> &DynamicObject {
        &self.owner
    }

    /// Apply `desired` and return the full trail.
    pub async fn run_all_recorded(&self, desired: &DesiredState) -> ApplyReport {
        run_all_recorded(self, desired).await
    }

    fn prepare(&self, mut target: DynamicObject) -> Result<DynamicObject> {
        set_controller_reference(&self.owner, &mut target).map_err(|e| {
            error!(error = %e, object = %target.qualified_name(), "Error setting controller reference");
            Error::from(e)
        })?;
        Ok(target)
    }

    /// Carry over owner references from the stored copy of `target`.
    async fn merge_stored_owners(&self, target: &mut DynamicObject) -> Result<()> {
        let stored = match self.store.get(&target.object_reference()).await {
            Ok(stored) => stored,
            Err(Error::NotFound { .. }) => return Ok(()),
            Err(e) => return Err(apply_error("update", target, &e)),
        };

        let inherited = stored.metadata.owner_references.unwrap_or_default();
        let refs = target.metadata.owner_references.get_or_insert_with(Vec::new);
        for reference in inherited {
            if !refs.iter().any(|r| same_owner(r, &reference)) {
                refs.push(reference);
            }
        }
        Ok(())
    }
}

fn apply_error(operation: &str, object: &DynamicObject, cause: &Error) -> Error {
    error!(error = %cause, operation, object = %object.qualified_name(), "Error applying object");
    Error::apply(operation, object.qualified_name(), cause.to_string())
}

#[async_trait]
impl ActionRunner for ControllerActionRunner {
    async fn create(&self, object: &DynamicObject, skip_owner_ref: bool) -> Result<()> {
        let target = if skip_owner_ref {
            object.clone()
        } else {
            self.prepare(object.clone())?
        };
        self.store
            .create(&target)
            .await
            .map_err(|e| apply_error("create", &target, &e))
    }

    async fn update(&self, object: &DynamicObject, skip_owner_ref: bool) -> Result<()> {
        let target = if skip_owner_ref {
            object.clone()
        } else {
            let mut merged = object.clone();
            self.merge_stored_owners(&mut merged).await?;
            self.prepare(merged)?
        };
        self.store
            .update(&target)
            .await
            .map_err(|e| apply_error("update", &target, &e))
    }

    async fn delete(&self, object: &DynamicObject) -> Result<()> {
        self.store
            .delete(object)
            .await
            .map_err(|e| apply_error("delete", object, &e))
    }
}
