//! Relevance filter for untargeted bus messages.
//!
//! The bus has no per-object routing, so every change to every entry reaches
//! the timer. The filter rejects most of them on the subject id and field
//! name alone, and only then pays for an entry lookup.

use ticktrack_core::{ChangeMessage, ChangedField, EntryId, TrackedEntry};
use tracing::{debug, trace};

use crate::ports::{EntryLookup, IdentityResolver};

/// Which regime the filter is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Regime {
    /// Nothing is tracked; waiting for an entry to start
    #[default]
    Idle,
    /// The given entry is tracked
    Tracking(EntryId),
}

/// What the caller should do about a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Not relevant
    Ignore,
    /// The tracked entry changed but is still running
    Refresh(TrackedEntry),
    /// The tracked entry stopped (or vanished); the filter is now idle
    Stop,
    /// A newly running entry owned by the viewer; the filter now tracks it
    Adopt(TrackedEntry),
}

/// Two-regime filter over [`ChangeMessage`]s.
#[derive(Debug, Default)]
pub struct BroadcastFilter {
    regime: Regime,
}

impl BroadcastFilter {
    /// Create an idle filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current regime.
    pub fn regime(&self) -> Regime {
        self.regime
    }

    /// Align the regime with what is actually displayed.
    pub fn follow(&mut self, tracked: Option<EntryId>) {
        self.regime = match tracked {
            Some(id) => Regime::Tracking(id),
            None => Regime::Idle,
        };
    }

    /// Find an already running entry the viewer owns.
    pub fn cold_start(
        &self,
        lookup: &dyn EntryLookup,
        identity: &dyn IdentityResolver,
    ) -> Option<TrackedEntry> {
        lookup
            .first_running()
            .filter(|entry| entry.running && identity.owns_entry(entry))
    }

    /// Decide whether `message` affects the display, updating the regime.
    pub fn evaluate(
        &mut self,
        message: &ChangeMessage,
        lookup: &dyn EntryLookup,
        identity: &dyn IdentityResolver,
    ) -> Verdict {
        match self.regime {
            Regime::Tracking(tracked) => {
                if message.subject != tracked
                    || !matches!(message.field, ChangedField::Running | ChangedField::Elapsed)
                {
                    return Verdict::Ignore;
                }

                match lookup.find(tracked) {
                    Some(entry) if entry.running => Verdict::Refresh(entry),
                    _ => {
                        debug!(entry_id = %tracked, "tracked entry stopped");
                        self.regime = Regime::Idle;
                        Verdict::Stop
                    }
                }
            }
            Regime::Idle => {
                if !matches!(
                    message.field,
                    ChangedField::Running | ChangedField::VisibilityScope
                ) {
                    return Verdict::Ignore;
                }

                let Some(entry) = lookup.find(message.subject) else {
                    trace!(subject = %message.subject, "unknown subject ignored");
                    return Verdict::Ignore;
                };

                if !entry.running || !identity.owns_entry(&entry) {
                    return Verdict::Ignore;
                }

                debug!(entry_id = %entry.id, field = ?message.field, "adopting running entry");
                self.regime = Regime::Tracking(entry.id);
                Verdict::Adopt(entry)
            }
        }
    }
}
