//! Background detection of which resource kinds the server serves.
//!
//! A [`CapabilityWatcher`] polls a [`DiscoveryService`] on an interval and
//! records one boolean per configured kind in a [`SharedStateStore`]. Hosts
//! read the store to decide which optional integrations to enable.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod config;
pub mod discovery;
pub mod error;
pub mod state;
pub mod watcher;

pub use config::{DEFAULT_INTERVAL, DetectConfig};
pub use discovery::{
    APIResource, APIResourceList, DiscoveryService, StaticDiscovery, api_resource, is_served,
    resource_list, serves,
};
pub use error::{Error, Result};
pub use state::SharedStateStore;
pub use watcher::{
    CapabilityChange, CapabilityWatcher, EXIT_CODE_ON_CHANGE, ProcessExit, Terminator, Transition,
    WatcherHandle, effective_interval, is_resource_available,
};
