//! In-memory entry store.
//!
//! Holds every entry, the viewer's active-entry pointer and the listeners
//! registered against both. Each mutation notifies, in order, the watchers
//! of the touched entry, the active-entry watchers and the bus. Listeners are
//! called after the store is unlocked.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use ticktrack_core::{
    ChangeMessage, ChangedField, EntryId, EntryProperty, ManagerProperty, ProjectRef, Time,
    TrackedEntry, UserId,
};
use ticktrack_timer::{
    ActiveEntryProvider, Clock, CommandSink, EntryLookup, ManagerListener, PropertyListener,
    PropertySource, SystemClock, WatchHandle,
};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::bus::LocalBus;
use crate::error::{Result, StorageError};

/// Serialized form of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// The viewer's active entry
    pub active: Option<EntryId>,
    /// Entries in creation order
    pub entries: Vec<TrackedEntry>,
}

#[derive(Default)]
struct State {
    entries: HashMap<EntryId, TrackedEntry>,
    order: Vec<EntryId>,
    active: Option<EntryId>,
    next_handle: u64,
    managers: HashMap<WatchHandle, ManagerListener>,
    watchers: HashMap<WatchHandle, (EntryId, PropertyListener)>,
}

impl State {
    fn handle(&mut self) -> WatchHandle {
        self.next_handle += 1;
        WatchHandle(self.next_handle)
    }

    fn entry_mut(&mut self, id: EntryId) -> Result<&mut TrackedEntry> {
        self.entries.get_mut(&id).ok_or(StorageError::NotFound(id))
    }
}

/// Notifications gathered under the lock.
struct Outbox {
    entry: EntryId,
    properties: Vec<EntryProperty>,
    manager: Option<ManagerProperty>,
    field: ChangedField,
}

impl Outbox {
    fn new(entry: EntryId, field: ChangedField) -> Self {
        Self {
            entry,
            properties: Vec::new(),
            manager: None,
            field,
        }
    }

    fn property(mut self, property: EntryProperty) -> Self {
        self.properties.push(property);
        self
    }
}

/// Shared in-memory entries with an active-entry pointer for one viewer.
pub struct EntryStore {
    viewer: UserId,
    bus: Arc<LocalBus>,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

impl EntryStore {
    /// Create an empty store for `viewer` publishing on `bus`.
    pub fn new(viewer: UserId, bus: Arc<LocalBus>) -> Self {
        Self {
            viewer,
            bus,
            clock: Arc::new(SystemClock),
            state: Mutex::new(State::default()),
        }
    }

    /// Create a store holding `snapshot`.
    pub fn from_snapshot(viewer: UserId, bus: Arc<LocalBus>, snapshot: StoreSnapshot) -> Self {
        let store = Self::new(viewer, bus);
        {
            let mut state = store.lock();
            for entry in snapshot.entries {
                state.order.push(entry.id);
                state.entries.insert(entry.id, entry);
            }
            state.active = snapshot.active.filter(|id| state.entries.contains_key(id));
        }
        store
    }

    /// Use `clock` for stop commands.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The user whose active entry this store tracks.
    pub fn viewer(&self) -> &UserId {
        &self.viewer
    }

    /// The bus mutations are published on.
    pub fn bus(&self) -> &Arc<LocalBus> {
        &self.bus
    }

    /// Load a snapshot file. A missing file yields an empty store.
    pub async fn load(viewer: UserId, bus: Arc<LocalBus>, path: impl AsRef<Path>) -> Result<Self> {
        let snapshot = match fs::read_to_string(path.as_ref()).await {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreSnapshot::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self::from_snapshot(viewer, bus, snapshot))
    }

    /// Write a snapshot file.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        fs::write(path.as_ref(), json.as_bytes()).await?;
        debug!(path = %path.as_ref().display(), "store saved");
        Ok(())
    }

    /// Copy of every entry and the active pointer.
    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.lock();
        StoreSnapshot {
            active: state.active,
            entries: state
                .order
                .iter()
                .filter_map(|id| state.entries.get(id).cloned())
                .collect(),
        }
    }

    /// Look up one entry.
    pub fn get(&self, id: EntryId) -> Option<TrackedEntry> {
        self.lock().entries.get(&id).cloned()
    }

    /// Start a new running entry.
    ///
    /// An entry owned by the viewer becomes the active entry.
    pub fn start_entry(
        &self,
        owner: UserId,
        description: impl Into<String>,
        project: Option<ProjectRef>,
        at: Time,
    ) -> TrackedEntry {
        let mut entry = TrackedEntry::started(owner, at).with_description(description);
        entry.project = project;

        let mut outbox = Outbox::new(entry.id, ChangedField::Running);
        {
            let mut state = self.lock();
            state.order.push(entry.id);
            state.entries.insert(entry.id, entry.clone());
            if entry.owner == self.viewer {
                state.active = Some(entry.id);
                outbox.manager = Some(ManagerProperty::Active);
            }
        }

        info!(entry_id = %entry.id, owner = %entry.owner, "entry started");
        self.deliver(outbox);
        entry
    }

    /// Stop a running entry at `at`.
    pub fn stop_entry(&self, id: EntryId, at: Time) -> Result<TrackedEntry> {
        let mut outbox = Outbox::new(id, ChangedField::Running)
            .property(EntryProperty::Running)
            .property(EntryProperty::StopTime);
        let stopped = {
            let mut state = self.lock();
            let entry = state.entry_mut(id)?;
            if !entry.running {
                return Err(StorageError::NotRunning(id));
            }
            entry.running = false;
            entry.stop = Some(at.max(entry.start));
            let stopped = entry.clone();
            if state.active == Some(id) {
                outbox.manager = Some(ManagerProperty::Running);
            }
            stopped
        };

        info!(entry_id = %id, "entry stopped");
        self.deliver(outbox);
        Ok(stopped)
    }

    /// Move the start time.
    pub fn set_start(&self, id: EntryId, start: Time) -> Result<()> {
        self.lock().entry_mut(id)?.start = start;
        self.deliver(Outbox::new(id, ChangedField::Elapsed).property(EntryProperty::StartTime));
        Ok(())
    }

    /// Replace the description.
    pub fn set_description(&self, id: EntryId, description: impl Into<String>) -> Result<()> {
        self.lock().entry_mut(id)?.description = description.into();
        self.deliver(
            Outbox::new(id, ChangedField::Description).property(EntryProperty::Description),
        );
        Ok(())
    }

    /// Replace the project.
    pub fn set_project(&self, id: EntryId, project: Option<ProjectRef>) -> Result<()> {
        self.lock().entry_mut(id)?.project = project;
        self.deliver(
            Outbox::new(id, ChangedField::Other("project".to_string()))
                .property(EntryProperty::Project),
        );
        Ok(())
    }

    /// Hand an entry to `owner`.
    ///
    /// A running entry handed to the viewer becomes active; the active entry
    /// handed away leaves the viewer with none.
    pub fn share(&self, id: EntryId, owner: UserId) -> Result<()> {
        let mut outbox = Outbox::new(id, ChangedField::VisibilityScope);
        {
            let mut state = self.lock();
            let entry = state.entry_mut(id)?;
            entry.owner = owner;
            let (running, mine) = (entry.running, entry.owner == self.viewer);

            if mine && running && state.active != Some(id) {
                state.active = Some(id);
                outbox.manager = Some(ManagerProperty::Active);
            } else if !mine && state.active == Some(id) {
                state.active = None;
                outbox.manager = Some(ManagerProperty::Active);
            }
        }

        debug!(entry_id = %id, "entry shared");
        self.deliver(outbox);
        Ok(())
    }

    /// Number of active-entry watchers.
    pub fn manager_watch_count(&self) -> usize {
        self.lock().managers.len()
    }

    /// Number of per-entry watchers.
    pub fn entry_watch_count(&self) -> usize {
        self.lock().watchers.len()
    }

    fn deliver(&self, outbox: Outbox) {
        let (watchers, managers) = {
            let state = self.lock();
            let watchers: Vec<PropertyListener> = state
                .watchers
                .values()
                .filter(|(entry, _)| *entry == outbox.entry)
                .map(|(_, listener)| listener.clone())
                .collect();
            let managers: Vec<ManagerListener> = if outbox.manager.is_some() {
                state.managers.values().cloned().collect()
            } else {
                Vec::new()
            };
            (watchers, managers)
        };

        for property in &outbox.properties {
            for listener in &watchers {
                listener(outbox.entry, *property);
            }
        }
        if let Some(property) = outbox.manager {
            for listener in &managers {
                listener(property);
            }
        }
        self.bus
            .publish(&ChangeMessage::new(outbox.entry, outbox.field));
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ActiveEntryProvider for EntryStore {
    fn active(&self) -> Option<TrackedEntry> {
        let state = self.lock();
        state.active.and_then(|id| state.entries.get(&id).cloned())
    }

    fn watch_active(&self, listener: ManagerListener) -> WatchHandle {
        let mut state = self.lock();
        let handle = state.handle();
        state.managers.insert(handle, listener);
        handle
    }

    fn unwatch_active(&self, handle: WatchHandle) {
        self.lock().managers.remove(&handle);
    }
}

impl PropertySource for EntryStore {
    fn watch_entry(&self, entry: EntryId, listener: PropertyListener) -> WatchHandle {
        let mut state = self.lock();
        let handle = state.handle();
        state.watchers.insert(handle, (entry, listener));
        handle
    }

    fn unwatch_entry(&self, handle: WatchHandle) {
        self.lock().watchers.remove(&handle);
    }
}

impl EntryLookup for EntryStore {
    fn find(&self, id: EntryId) -> Option<TrackedEntry> {
        self.get(id)
    }

    /// The viewer's most recently created running entry.
    fn first_running(&self) -> Option<TrackedEntry> {
        let state = self.lock();
        state
            .order
            .iter()
            .rev()
            .filter_map(|id| state.entries.get(id))
            .find(|entry| entry.running && entry.owner == self.viewer)
            .cloned()
    }
}

impl CommandSink for EntryStore {
    fn stop_entry(&self, entry: EntryId) {
        let now = self.clock.now();
        if let Err(e) = EntryStore::stop_entry(self, entry, now) {
            warn!(entry_id = %entry, error = %e, "stop command failed");
        }
    }
}
