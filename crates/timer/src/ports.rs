//! Collaborator interfaces the timer consumes.
//!
//! Everything here is implemented by another layer: the backing data model,
//! the message bus, identity resolution and the view. Listeners handed to
//! these traits must only enqueue work; they are invoked from whatever
//! context the collaborator mutates its state in.

use std::sync::Arc;
use std::time::Duration;

use ticktrack_core::{
    ChangeMessage, EntryId, EntryProperty, ManagerProperty, MessageKind, RunningView, Time,
    TrackedEntry,
};

/// Handle for a watch registered with a provider or property source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchHandle(pub u64);

/// Handle for a bus subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusHandle(pub u64);

/// Handle for a scheduled one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

/// Identifies one scheduled tick; echoed back when the timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickToken(pub u64);

impl std::fmt::Display for TickToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tick#{}", self.0)
    }
}

/// Listener for active-entry manager pushes.
pub type ManagerListener = Arc<dyn Fn(ManagerProperty) + Send + Sync>;

/// Listener for property changes of one entry.
pub type PropertyListener = Arc<dyn Fn(EntryId, EntryProperty) + Send + Sync>;

/// Listener for bus messages.
pub type BusListener = Arc<dyn Fn(&ChangeMessage) + Send + Sync>;

/// Source of the single canonical active entry.
pub trait ActiveEntryProvider: Send + Sync {
    /// The active entry, if any.
    fn active(&self) -> Option<TrackedEntry>;

    /// Register for `Active`/`Running` pushes.
    fn watch_active(&self, listener: ManagerListener) -> WatchHandle;

    /// Drop a registration made with [`ActiveEntryProvider::watch_active`].
    fn unwatch_active(&self, handle: WatchHandle);
}

/// Per-entry property change notifications.
pub trait PropertySource: Send + Sync {
    /// Register for changes of `entry`.
    fn watch_entry(&self, entry: EntryId, listener: PropertyListener) -> WatchHandle;

    /// Drop a registration made with [`PropertySource::watch_entry`].
    fn unwatch_entry(&self, handle: WatchHandle);
}

/// Broadcast-only message bus.
pub trait Bus: Send + Sync {
    /// Subscribe to every message of `kind`.
    fn subscribe(&self, kind: MessageKind, listener: BusListener) -> BusHandle;

    /// Cancel a subscription.
    fn unsubscribe(&self, handle: BusHandle);
}

/// Read access to entries by identity.
pub trait EntryLookup: Send + Sync {
    /// Find an entry by id.
    fn find(&self, id: EntryId) -> Option<TrackedEntry>;

    /// The first running entry, used for cold-start discovery.
    fn first_running(&self) -> Option<TrackedEntry>;
}

/// Decides whether an entry belongs to the viewing user.
pub trait IdentityResolver: Send + Sync {
    /// Whether the viewer owns `entry`.
    fn owns_entry(&self, entry: &TrackedEntry) -> bool;
}

/// Outgoing commands to the data layer.
pub trait CommandSink: Send + Sync {
    /// Ask the data layer to stop `entry`. Fire-and-forget.
    fn stop_entry(&self, entry: EntryId);
}

/// One-shot timers delivering [`TickToken`]s back to the dispatch queue.
pub trait TimerService: Send + Sync {
    /// Fire `token` once after `delay`.
    fn schedule(&self, delay: Duration, token: TickToken) -> TimerHandle;

    /// Cancel (or release, if it already fired) a timer.
    fn cancel(&self, handle: TimerHandle);
}

/// Wall clock.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> Time;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Time {
        chrono::Utc::now()
    }
}

/// The view the timer renders into.
pub trait DisplaySurface: Send {
    /// Full layout of a running entry.
    fn show_running(&mut self, view: &RunningView);

    /// Stopped/idle layout.
    fn show_stopped(&mut self);

    /// Replace the duration text only.
    fn update_duration(&mut self, text: &str);

    /// Collapse or restore the whole surface.
    fn set_hidden(&mut self, hidden: bool);
}

/// Every collaborator the reconciler talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Active entry manager
    pub provider: Arc<dyn ActiveEntryProvider>,
    /// Per-entry change notifications
    pub properties: Arc<dyn PropertySource>,
    /// Broadcast bus
    pub bus: Arc<dyn Bus>,
    /// Entry lookup for bus messages
    pub lookup: Arc<dyn EntryLookup>,
    /// Ownership check
    pub identity: Arc<dyn IdentityResolver>,
    /// Stop command target
    pub commands: Arc<dyn CommandSink>,
    /// One-shot timers
    pub timer: Arc<dyn TimerService>,
    /// Wall clock
    pub clock: Arc<dyn Clock>,
}
