//! Declarative reconciliation of a managed instance against its dependents.
//!
//! - **Actions**: an ordered [`DesiredState`] of create, update and delete
//!   steps, applied fail-fast by an [`ActionRunner`]
//! - **Readiness**: predicates that turn dependent status into ready,
//!   pending or failed
//! - **Reconcile cycle**: maps each pass outcome to an `Available`
//!   condition and a requeue delay
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use opkit_reconciler::{Action, DesiredState, InMemoryObjectStore, ReconcileCycle};
//!
//! let store = Arc::new(InMemoryObjectStore::new());
//! let cycle = ReconcileCycle::new(store);
//!
//! let mut desired = DesiredState::new();
//! desired.add_action(Action::create(config_map, "create settings"));
//!
//! let result = cycle
//!     .run_desired_state_actions(&instance, &mut status, &readiness, &desired)
//!     .await;
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod action;
pub mod cycle;
pub mod error;
pub mod readiness;
pub mod runner;
pub mod store;

pub use action::{Action, DesiredState};
pub use cycle::{
    Observer, REQUEUE_DELAY, REQUEUE_DELAY_ERROR, ReadinessProbe, ReconcileCycle, ReconcileResult,
};
pub use error::{Error, Result};
pub use readiness::{
    ReadinessPolicy, ReadinessRegistry, ReadyDiscriminator, is_condition_ready,
    is_deployment_ready, is_endpoints_ready, is_job_ready, is_service_mesh_control_plane_ready, is_service_mesh_member_ready,
    is_service_mesh_member_roll_ready,
};
pub use runner::{
    ActionOutcome, ActionRecord, ActionRunner, ApplyReport, ControllerActionRunner, run_all_recorded,
};
pub use store::{InMemoryObjectStore, ObjectStore, TracingObjectStore};
