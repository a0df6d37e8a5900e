//! Fakes shared by the unit tests of this crate.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::TimeZone;
use ticktrack_core::{
    ChangeMessage, ChangedField, EntryId, EntryProperty, ManagerProperty, MessageKind,
    RunningView, Time, TrackedEntry, UserId,
};

use crate::ports::*;

pub fn at(secs: i64) -> Time {
    chrono::Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Running(RunningView),
    Stopped,
    Duration(String),
    Hidden(bool),
}

/// Surface recording every call; clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingSurface {
    log: Arc<Mutex<Vec<Frame>>>,
}

impl RecordingSurface {
    pub fn frames(&self) -> Vec<Frame> {
        self.log.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Frame> {
        self.log.lock().unwrap().last().cloned()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }
}

impl DisplaySurface for RecordingSurface {
    fn show_running(&mut self, view: &RunningView) {
        self.log.lock().unwrap().push(Frame::Running(view.clone()));
    }

    fn show_stopped(&mut self) {
        self.log.lock().unwrap().push(Frame::Stopped);
    }

    fn update_duration(&mut self, text: &str) {
        self.log.lock().unwrap().push(Frame::Duration(text.to_string()));
    }

    fn set_hidden(&mut self, hidden: bool) {
        let mut log = self.log.lock().unwrap();
        let current = log
            .iter()
            .rev()
            .find_map(|frame| match frame {
                Frame::Hidden(h) => Some(*h),
                _ => None,
            })
            .unwrap_or(false);
        // Only record transitions.
        if current != hidden {
            log.push(Frame::Hidden(hidden));
        }
    }
}

/// Timer that never fires on its own.
#[derive(Default)]
pub struct ManualTimer {
    next: Mutex<u64>,
    scheduled: Mutex<Vec<(TimerHandle, Duration, TickToken)>>,
    cancelled: Mutex<HashSet<TimerHandle>>,
}

impl ManualTimer {
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.lock().unwrap().len()
    }

    pub fn live_count(&self) -> usize {
        let cancelled = self.cancelled.lock().unwrap();
        self.scheduled
            .lock()
            .unwrap()
            .iter()
            .filter(|(h, _, _)| !cancelled.contains(h))
            .count()
    }

    /// Most recently armed tick.
    pub fn last(&self) -> Option<(Duration, TickToken)> {
        self.scheduled
            .lock()
            .unwrap()
            .last()
            .map(|(_, delay, token)| (*delay, *token))
    }
}

impl TimerService for ManualTimer {
    fn schedule(&self, delay: Duration, token: TickToken) -> TimerHandle {
        let mut next = self.next.lock().unwrap();
        *next += 1;
        let handle = TimerHandle(*next);
        self.scheduled.lock().unwrap().push((handle, delay, token));
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        self.cancelled.lock().unwrap().insert(handle);
    }
}

pub struct FakeClock(Mutex<Time>);

impl FakeClock {
    pub fn new(now: Time) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: Time) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Time {
        *self.0.lock().unwrap()
    }
}

/// Minimal backing model: entries, the active pointer, and every listener
/// kind. Mutations notify listeners synchronously.
pub struct FakeModel {
    viewer: UserId,
    next: Mutex<u64>,
    entries: Mutex<HashMap<EntryId, TrackedEntry>>,
    active: Mutex<Option<EntryId>>,
    managers: Mutex<HashMap<u64, ManagerListener>>,
    watchers: Mutex<HashMap<u64, (EntryId, PropertyListener)>>,
    bus: Mutex<HashMap<u64, BusListener>>,
    stop_commands: Mutex<Vec<EntryId>>,
}

impl FakeModel {
    pub fn new(viewer: &str) -> Self {
        Self {
            viewer: UserId::new(viewer),
            next: Mutex::new(0),
            entries: Mutex::new(HashMap::new()),
            active: Mutex::new(None),
            managers: Mutex::new(HashMap::new()),
            watchers: Mutex::new(HashMap::new()),
            bus: Mutex::new(HashMap::new()),
            stop_commands: Mutex::new(Vec::new()),
        }
    }

    fn next_id(&self) -> u64 {
        let mut next = self.next.lock().unwrap();
        *next += 1;
        *next
    }

    /// Start a new entry owned by `owner` and make it active if owned by
    /// the viewer.
    pub fn start(&self, owner: &str, start: Time) -> TrackedEntry {
        let entry = TrackedEntry::started(UserId::new(owner), start);
        self.entries.lock().unwrap().insert(entry.id, entry.clone());
        if entry.owner == self.viewer {
            *self.active.lock().unwrap() = Some(entry.id);
            self.push(ManagerProperty::Active);
        }
        self.broadcast(entry.id, ChangedField::Running);
        entry
    }

    /// Stop `id` at `when`.
    pub fn stop(&self, id: EntryId, when: Time) {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(&id) {
            entry.running = false;
            entry.stop = Some(when);
        }
        self.notify(id, EntryProperty::Running);
        if *self.active.lock().unwrap() == Some(id) {
            self.push(ManagerProperty::Running);
        }
        self.broadcast(id, ChangedField::Running);
    }

    pub fn edit(&self, id: EntryId, edit: impl FnOnce(&mut TrackedEntry)) {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(&id) {
            edit(entry);
        }
    }

    pub fn notify(&self, id: EntryId, property: EntryProperty) {
        let listeners: Vec<PropertyListener> = self
            .watchers
            .lock()
            .unwrap()
            .values()
            .filter(|(e, _)| *e == id)
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(id, property);
        }
    }

    pub fn push(&self, property: ManagerProperty) {
        let listeners: Vec<ManagerListener> =
            self.managers.lock().unwrap().values().cloned().collect();
        for listener in listeners {
            listener(property);
        }
    }

    pub fn broadcast(&self, subject: EntryId, field: ChangedField) {
        let message = ChangeMessage::new(subject, field);
        let listeners: Vec<BusListener> = self.bus.lock().unwrap().values().cloned().collect();
        for listener in listeners {
            listener(&message);
        }
    }

    pub fn manager_watch_count(&self) -> usize {
        self.managers.lock().unwrap().len()
    }

    pub fn entry_watch_count(&self) -> usize {
        self.watchers.lock().unwrap().len()
    }

    pub fn bus_subscriber_count(&self) -> usize {
        self.bus.lock().unwrap().len()
    }

    pub fn stop_commands(&self) -> Vec<EntryId> {
        self.stop_commands.lock().unwrap().clone()
    }
}

impl ActiveEntryProvider for FakeModel {
    fn active(&self) -> Option<TrackedEntry> {
        let active = (*self.active.lock().unwrap())?;
        self.entries.lock().unwrap().get(&active).cloned()
    }

    fn watch_active(&self, listener: ManagerListener) -> WatchHandle {
        let id = self.next_id();
        self.managers.lock().unwrap().insert(id, listener);
        WatchHandle(id)
    }

    fn unwatch_active(&self, handle: WatchHandle) {
        self.managers.lock().unwrap().remove(&handle.0);
    }
}

impl PropertySource for FakeModel {
    fn watch_entry(&self, entry: EntryId, listener: PropertyListener) -> WatchHandle {
        let id = self.next_id();
        self.watchers.lock().unwrap().insert(id, (entry, listener));
        WatchHandle(id)
    }

    fn unwatch_entry(&self, handle: WatchHandle) {
        self.watchers.lock().unwrap().remove(&handle.0);
    }
}

impl Bus for FakeModel {
    fn subscribe(&self, _kind: MessageKind, listener: BusListener) -> BusHandle {
        let id = self.next_id();
        self.bus.lock().unwrap().insert(id, listener);
        BusHandle(id)
    }

    fn unsubscribe(&self, handle: BusHandle) {
        self.bus.lock().unwrap().remove(&handle.0);
    }
}

impl EntryLookup for FakeModel {
    fn find(&self, id: EntryId) -> Option<TrackedEntry> {
        self.entries.lock().unwrap().get(&id).cloned()
    }

    fn first_running(&self) -> Option<TrackedEntry> {
        self.entries
            .lock()
            .unwrap()
            .values()
            .find(|e| e.running && e.owner == self.viewer)
            .cloned()
    }
}

impl IdentityResolver for FakeModel {
    fn owns_entry(&self, entry: &TrackedEntry) -> bool {
        entry.owner == self.viewer
    }
}

impl CommandSink for FakeModel {
    fn stop_entry(&self, entry: EntryId) {
        self.stop_commands.lock().unwrap().push(entry);
    }
}

/// Wire every port to `model`, `timer` and `clock`.
pub fn collaborators(
    model: &Arc<FakeModel>,
    timer: &Arc<ManualTimer>,
    clock: &Arc<FakeClock>,
) -> Collaborators {
    Collaborators {
        provider: model.clone(),
        properties: model.clone(),
        bus: model.clone(),
        lookup: model.clone(),
        identity: model.clone(),
        commands: model.clone(),
        timer: timer.clone(),
        clock: clock.clone(),
    }
}
