//! Tracked time entry model.

use serde::{Deserialize, Serialize};

use crate::id::{EntryId, ProjectId, UserId};
use crate::Time;

/// A project reference carried by an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    /// Project identifier
    pub id: ProjectId,

    /// Display name
    pub name: String,
}

impl ProjectRef {
    /// Create a new project reference.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ProjectId::new(),
            name: name.into(),
        }
    }
}

/// A time entry as seen by the timer.
///
/// Entries are owned by the backing data layer. The timer only reads them
/// and keeps a local copy for the current display cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntry {
    /// Stable identity
    pub id: EntryId,

    /// Whether the entry is currently running
    pub running: bool,

    /// When tracking started
    pub start: Time,

    /// When tracking stopped
    pub stop: Option<Time>,

    /// Free-form description
    pub description: String,

    /// Owning project
    pub project: Option<ProjectRef>,

    /// Who the entry belongs to
    pub owner: UserId,
}

impl TrackedEntry {
    /// Create a running entry started at `start`.
    pub fn started(owner: UserId, start: Time) -> Self {
        Self {
            id: EntryId::new(),
            running: true,
            start,
            stop: None,
            description: String::new(),
            project: None,
            owner,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the project.
    pub fn with_project(mut self, project: ProjectRef) -> Self {
        self.project = Some(project);
        self
    }

    /// Elapsed time of this entry as of `now`.
    ///
    /// Running entries measure up to `now`, stopped ones up to their stop
    /// time. Never negative.
    pub fn duration(&self, now: Time) -> chrono::Duration {
        let end = match (self.running, self.stop) {
            (true, _) | (false, None) => now,
            (false, Some(stop)) => stop,
        };
        let elapsed = end - self.start;
        if elapsed < chrono::Duration::zero() {
            chrono::Duration::zero()
        } else {
            elapsed
        }
    }

    /// Overwrite every field except the identity with `other`'s.
    pub fn apply(&mut self, other: &TrackedEntry) {
        debug_assert_eq!(self.id, other.id);
        self.running = other.running;
        self.start = other.start;
        self.stop = other.stop;
        self.description.clone_from(&other.description);
        self.project.clone_from(&other.project);
        self.owner.clone_from(&other.owner);
    }

    /// Project label used by the compact layout.
    pub fn project_label(&self) -> &str {
        match &self.project {
            Some(project) => &project.name,
            None => "(no project)",
        }
    }

    /// Description label used by the compact layout.
    pub fn description_label(&self) -> &str {
        if self.description.is_empty() {
            "(no description)"
        } else {
            &self.description
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn at(secs: i64) -> Time {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_running_duration_measures_to_now() {
        let entry = TrackedEntry::started(UserId::new("ann"), at(0));
        assert_eq!(entry.duration(at(90)), Duration::seconds(90));
    }

    #[test]
    fn test_stopped_duration_measures_to_stop() {
        let mut entry = TrackedEntry::started(UserId::new("ann"), at(0));
        entry.running = false;
        entry.stop = Some(at(30));
        assert_eq!(entry.duration(at(500)), Duration::seconds(30));
    }

    #[test]
    fn test_duration_before_start_is_zero() {
        let entry = TrackedEntry::started(UserId::new("ann"), at(100));
        assert_eq!(entry.duration(at(40)), Duration::zero());
    }

    #[test]
    fn test_apply_keeps_identity() {
        let mut local = TrackedEntry::started(UserId::new("ann"), at(0));
        let mut remote = local.clone();
        remote.description = "Write report".to_string();
        remote.start = at(-60);

        local.apply(&remote);
        assert_eq!(local, remote);
    }

    #[test]
    fn test_labels_fall_back_when_empty() {
        let entry = TrackedEntry::started(UserId::new("ann"), at(0));
        assert_eq!(entry.project_label(), "(no project)");
        assert_eq!(entry.description_label(), "(no description)");

        let entry = entry
            .with_description("Review")
            .with_project(ProjectRef::new("Website"));
        assert_eq!(entry.project_label(), "Website");
        assert_eq!(entry.description_label(), "Review");
    }

    #[test]
    fn test_entry_serializes_to_json() {
        let entry = TrackedEntry::started(UserId::new("ann"), at(0)).with_description("Review");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["running"], true);
        assert_eq!(json["description"], "Review");
        assert_eq!(json["owner"], "ann");
    }
}
