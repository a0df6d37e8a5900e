//! Live elapsed-time readout for the active time entry.
//!
//! This crate keeps a display in step with whichever entry is currently
//! running. It is organized around a single-threaded [`Reconciler`] fed by
//! [`Signal`]s:
//!
//! - [`SubscriptionTracker`] keeps per-entry watches in step with the
//!   displayed entry using mark, add and clear passes
//! - [`ActiveEntryResolver`] tells an identity change apart from an
//!   in-place update
//! - [`BroadcastFilter`] picks relevant messages off the untargeted bus
//! - [`TickScheduler`] re-renders on whole-second boundaries of the
//!   elapsed time
//!
//! Collaborators (data model, bus, timers, view) are reached through the
//! traits in [`ports`].

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod filter;
pub mod ports;
pub mod reconciler;
pub mod resolver;
pub mod signal;
pub mod ticker;
pub mod tracker;

#[cfg(test)]
mod testing;

pub use config::{Strategy, TimerConfig};
pub use error::{ConfigError, Result, TimerError};
pub use filter::{BroadcastFilter, Regime, Verdict};
pub use ports::{
    ActiveEntryProvider, Bus, BusHandle, BusListener, Clock, Collaborators, CommandSink,
    DisplaySurface, EntryLookup, IdentityResolver, ManagerListener, PropertyListener,
    PropertySource, SystemClock, TickToken, TimerHandle, TimerService, WatchHandle,
};
pub use reconciler::{ActiveEntryChanged, Reconciler};
pub use resolver::{ActiveEntryResolver, IdentityChange};
pub use signal::{Signal, SignalQueue, SignalSink};
pub use ticker::{next_delay, TickScheduler, DEFAULT_PERIOD};
pub use tracker::{EntrySubscriptions, SubscriptionTracker, Watchable};
