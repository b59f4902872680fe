//! # opkit
//!
//! Toolkit for operators that reconcile a managed instance against the
//! dependents it owns.
//!
//! - [`model`]: object model, owner references and status conditions
//! - [`reconciler`]: ordered actions, readiness classifiers and the
//!   reconcile cycle that turns outcomes into conditions and requeue delays
//! - [`autodetect`]: a background watcher recording which resource kinds
//!   the server serves
//!
//! Most hosts only need the [`prelude`]:
//!
//! ```ignore
//! use opkit::prelude::*;
//!
//! opkit::telemetry::init_tracing()?;
//!
//! let store = Arc::new(InMemoryObjectStore::new());
//! let cycle = ReconcileCycle::new(store);
//! let result = cycle.reconcile(&instance, &mut status, &mut state, compute_desired).await;
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod prelude;
pub mod telemetry;

pub use opkit_autodetect as autodetect;
pub use opkit_core as model;
pub use opkit_reconciler as reconciler;
