//! In-memory backing model for ticktrack.
//!
//! This crate provides the data layer the timer observes: an entry store with
//! an active-entry pointer and per-entry watchers, a local broadcast bus, and
//! a fixed identity. Snapshots can be written to and read from JSON files.

#![warn(missing_docs)]

pub mod bus;
pub mod error;
pub mod identity;
pub mod store;

pub use bus::LocalBus;
pub use error::{Result, StorageError};
pub use identity::StaticIdentity;
pub use store::{EntryStore, StoreSnapshot};
