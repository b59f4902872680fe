//! Background capability watcher.
//!
//! Periodically asks discovery which of the configured kinds the server
//! serves, writes the answer to a [`SharedStateStore`] and reports how each
//! kind changed since the previous tick.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use opkit_core::{GroupVersionKind, GroupVersionKindExt};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::{DEFAULT_INTERVAL, DetectConfig};
use crate::discovery::{DiscoveryService, is_served};
use crate::error::Result;
use crate::state::SharedStateStore;

/// Exit code used when a capability change forces a restart.
pub const EXIT_CODE_ON_CHANGE: i32 = 1;

/// How a kind's availability moved across one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Unavailable before, available now.
    Deployed,
    /// Available before, unavailable now.
    Undeployed,
    /// Unavailable before and now.
    Absent,
    /// Available before and now.
    Present,
}

impl Transition {
    /// Classify a before/after pair.
    #[must_use]
    pub const fn between(before: bool, after: bool) -> Self {
        match (before, after) {
            (false, true) => Self::Deployed,
            (true, false) => Self::Undeployed,
            (false, false) => Self::Absent,
            (true, true) => Self::Present,
        }
    }

    /// Whether availability flipped.
    #[must_use]
    pub const fn is_change(self) -> bool {
        matches!(self, Self::Deployed | Self::Undeployed)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Deployed => "deployed",
            Self::Undeployed => "undeployed",
            Self::Absent => "absent",
            Self::Present => "present",
        };
        f.write_str(name)
    }
}

/// One kind's transition in a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityChange {
    pub gvk: GroupVersionKind,
    pub transition: Transition,
}

/// Ends the process when capabilities change.
pub trait Terminator: Send + Sync {
    fn terminate(&self, code: i32);
}

/// Exits the process immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExit;

impl Terminator for ProcessExit {
    fn terminate(&self, code: i32) {
        std::process::exit(code);
    }
}

/// Handle for stopping a running watcher.
#[derive(Clone)]
pub struct WatcherHandle {
    stop_tx: watch::Sender<bool>,
}

impl WatcherHandle {
    /// Stop the watcher. Ticks already in flight complete.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Whether the watcher task has exited.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stop_tx.is_closed()
    }
}

/// Periodically detects which configured kinds are served.
pub struct CapabilityWatcher {
    config: DetectConfig,
    discovery: Arc<dyn DiscoveryService>,
    state: Arc<SharedStateStore>,
    terminator: Arc<dyn Terminator>,
}

impl CapabilityWatcher {
    /// Create a watcher writing to `state`.
    pub fn new(config: DetectConfig, discovery: Arc<dyn DiscoveryService>, state: Arc<SharedStateStore>) -> Self {
        Self {
            config,
            discovery,
            state,
            terminator: Arc::new(ProcessExit),
        }
    }

    /// Replace how the process is ended on a change.
    #[must_use]
    pub fn with_terminator(mut self, terminator: Arc<dyn Terminator>) -> Self {
        self.terminator = terminator;
        self
    }

    /// The store this watcher writes to.
    #[must_use]
    pub const fn state(&self) -> &Arc<SharedStateStore> {
        &self.state
    }

    #[must_use]
    pub const fn config(&self) -> &DetectConfig {
        &self.config
    }

    /// Last detected availability of `gvk`.
    #[must_use]
    pub fn is_resource_available(&self, gvk: &GroupVersionKind) -> bool {
        self.state.get(&gvk.capability_key())
    }

    /// Poll discovery once and record every configured kind.
    ///
    /// # Errors
    ///
    /// Returns the discovery error; the store is left untouched.
    pub async fn detect_capabilities(&self) -> Result<()> {
        let lists = self.discovery.server_resources().await.inspect_err(|e| {
            error!(error = %e, "Failed to get API List");
        })?;

        for gvk in &self.config.group_version_kinds {
            self.state.set(gvk.capability_key(), is_served(&lists, gvk));
        }
        Ok(())
    }

    /// Run one detection tick and report every kind's transition.
    ///
    /// With exit-on-change, the first deployed or undeployed kind ends the
    /// process through the terminator.
    ///
    /// # Errors
    ///
    /// Returns the discovery error; no transitions are reported for that
    /// tick.
    pub async fn tick(&self) -> Result<Vec<CapabilityChange>> {
        let previous: Vec<bool> = self
            .config
            .group_version_kinds
            .iter()
            .map(|gvk| self.is_resource_available(gvk))
            .collect();

        self.detect_capabilities().await?;

        let changes: Vec<CapabilityChange> = self
            .config
            .group_version_kinds
            .iter()
            .zip(previous)
            .map(|(gvk, before)| CapabilityChange {
                gvk: gvk.clone(),
                transition: Transition::between(before, self.is_resource_available(gvk)),
            })
            .collect();

        for change in &changes {
            self.report(change);
            if self.config.exit_on_change && change.transition.is_change() {
                self.terminator.terminate(EXIT_CODE_ON_CHANGE);
                break;
            }
        }

        Ok(changes)
    }

    fn report(&self, change: &CapabilityChange) {
        let gvk = change.gvk.capability_key();
        let restart = self.config.exit_on_change;
        match change.transition {
            Transition::Deployed if restart => info!(
                capability = %gvk,
                "{gvk} is deployed in cluster. Restarting operator to enable all APIs ...."
            ),
            Transition::Deployed => info!(capability = %gvk, "{gvk} is deployed in cluster"),
            Transition::Undeployed if restart => info!(
                capability = %gvk,
                "{gvk} is undeployed. Restarting operator to disable some APIs ...."
            ),
            Transition::Undeployed => info!(capability = %gvk, "{gvk} is undeployed in cluster"),
            Transition::Absent => info!(capability = %gvk, "{gvk} is not deployed in cluster"),
            Transition::Present => {}
        }
    }

    /// Start ticking in the background. The first tick runs immediately.
    ///
    /// Seed the store with [`Self::detect_capabilities`] first when
    /// exit-on-change is set; otherwise kinds already served count as
    /// deployed on the first tick. A zero interval falls back to the
    /// default.
    ///
    /// The watcher runs until [`WatcherHandle::stop`] is called. Dropping
    /// every handle leaves it running for the life of the runtime.
    #[must_use = "the handle is the only way to stop the watcher"]
    pub fn start(self) -> WatcherHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let interval = effective_interval(&self.config);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!(
            interval_secs = interval.as_secs(),
            kinds = self.config.group_version_kinds.len(),
            "Starting capability watcher"
        );

        tokio::spawn(async move {
            let mut stoppable = true;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Discovery failures are logged in detect_capabilities.
                        let _ = self.tick().await;
                    }
                    changed = stop_rx.changed(), if stoppable => {
                        match changed {
                            Ok(()) if *stop_rx.borrow() => break,
                            Ok(()) => {}
                            Err(_) => {
                                warn!("Capability watcher handle dropped, watcher can no longer be stopped");
                                stoppable = false;
                            }
                        }
                    }
                }
            }
            debug!("Capability watcher stopped");
        });

        WatcherHandle { stop_tx }
    }
}

/// Availability of `gvk` in the process-wide store.
#[must_use]
pub fn is_resource_available(gvk: &GroupVersionKind) -> bool {
    SharedStateStore::global().get(&gvk.capability_key())
}

/// Tick interval a watcher built from `config` would use.
#[must_use]
pub fn effective_interval(config: &DetectConfig) -> Duration {
    if config.interval.is_zero() {
        DEFAULT_INTERVAL
    } else {
        config.interval
    }
}
