//! Local copy of the active entry and identity-change detection.

use ticktrack_core::{EntryId, TrackedEntry};
use tracing::debug;

use crate::ports::ActiveEntryProvider;

/// Outcome of syncing the local copy with a fetched entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityChange {
    /// A different entry (or none) is now active; a full rebind is needed.
    Changed,
    /// Same entry as before (or still none); a value refresh is enough.
    Unchanged,
}

impl IdentityChange {
    /// Whether a full rebind is needed.
    pub fn is_changed(self) -> bool {
        matches!(self, IdentityChange::Changed)
    }
}

/// Holds the display copy of the canonical active entry.
///
/// An entry that is no longer running is treated the same as no entry:
/// the copy is dropped once tracking stops.
#[derive(Debug, Default)]
pub struct ActiveEntryResolver {
    local: Option<TrackedEntry>,
}

impl ActiveEntryResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// The local copy, if an entry is being tracked.
    pub fn current(&self) -> Option<&TrackedEntry> {
        self.local.as_ref()
    }

    /// Identity of the tracked entry.
    pub fn current_id(&self) -> Option<EntryId> {
        self.local.as_ref().map(|e| e.id)
    }

    /// Fetch from `provider` and sync.
    pub fn refresh(&mut self, provider: &dyn ActiveEntryProvider) -> IdentityChange {
        self.sync(provider.active())
    }

    /// Sync the local copy with `fetched`.
    pub fn sync(&mut self, fetched: Option<TrackedEntry>) -> IdentityChange {
        let fetched = fetched.filter(|e| e.running);

        let previous = self.current_id();

        match (previous, fetched) {
            (None, None) => IdentityChange::Unchanged,
            (Some(previous), Some(entry)) if previous == entry.id => {
                if let Some(local) = self.local.as_mut() {
                    local.apply(&entry);
                }
                IdentityChange::Unchanged
            }
            (None, Some(entry)) => {
                debug!(entry_id = %entry.id, "tracking new entry");
                self.local = Some(entry);
                IdentityChange::Changed
            }
            (Some(previous), Some(entry)) => {
                debug!(%previous, entry_id = %entry.id, "active entry replaced");
                self.local = Some(entry);
                IdentityChange::Changed
            }
            (Some(previous), None) => {
                debug!(entry_id = %previous, "active entry dropped");
                self.local = None;
                IdentityChange::Changed
            }
        }
    }

    /// Forget the local copy.
    pub fn clear(&mut self) {
        self.local = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ticktrack_core::UserId;

    fn entry() -> TrackedEntry {
        TrackedEntry::started(UserId::new("ann"), Utc::now())
    }

    #[test]
    fn test_identity_changes_only_on_transitions() {
        let a = entry();
        let b = entry();
        let feed = [Some(a.clone()), Some(a), Some(b.clone()), Some(b), None];

        let mut resolver = ActiveEntryResolver::new();
        let changes: Vec<bool> = feed
            .into_iter()
            .map(|fetched| resolver.sync(fetched).is_changed())
            .collect();

        assert_eq!(changes, vec![true, false, true, false, true]);
        assert!(resolver.current().is_none());
    }

    #[test]
    fn test_same_identity_updates_in_place() {
        let a = entry();
        let mut resolver = ActiveEntryResolver::new();
        resolver.sync(Some(a.clone()));

        let mut edited = a.clone();
        edited.description = "Standup".to_string();
        assert_eq!(resolver.sync(Some(edited)), IdentityChange::Unchanged);
        assert_eq!(resolver.current().unwrap().description, "Standup");
        assert_eq!(resolver.current_id(), Some(a.id));
    }

    #[test]
    fn test_stopped_entry_counts_as_absent() {
        let a = entry();
        let mut resolver = ActiveEntryResolver::new();
        resolver.sync(Some(a.clone()));

        let mut stopped = a;
        stopped.running = false;
        assert_eq!(resolver.sync(Some(stopped.clone())), IdentityChange::Changed);
        assert!(resolver.current().is_none());

        assert_eq!(resolver.sync(Some(stopped)), IdentityChange::Unchanged);
    }

    #[test]
    fn test_nothing_to_nothing_is_unchanged() {
        let mut resolver = ActiveEntryResolver::new();
        assert_eq!(resolver.sync(None), IdentityChange::Unchanged);
    }
}
