#![doc = "psync-core: reconciliation logic for printer address-book sync."]

//! This crate holds the reconciliation core: building the directory
//! snapshot, deciding per-device additions and removals, producing the
//! audit trail, and driving the device fleet. The directory and device
//! clients are consumed through the traits in [`contract`]; their wire
//! protocols live with the implementors (see the `psync` binary crate).

pub mod audit;
pub mod config;
pub mod contract;
pub mod error;
pub mod reconcile;
pub mod snapshot;
pub mod synchronise;
pub mod tag;
