//! Display-side state and formatting.

use serde::{Deserialize, Serialize};

use crate::entry::TrackedEntry;
use crate::id::EntryId;

/// What the timer currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayState {
    /// Nothing is running
    #[default]
    Stopped,
    /// The given entry is running
    Running(EntryId),
}

impl DisplayState {
    /// The entry being shown, if any.
    pub fn entry(&self) -> Option<EntryId> {
        match self {
            DisplayState::Stopped => None,
            DisplayState::Running(id) => Some(*id),
        }
    }

    /// Whether an entry is running.
    pub fn is_running(&self) -> bool {
        matches!(self, DisplayState::Running(_))
    }
}

impl std::fmt::Display for DisplayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayState::Stopped => write!(f, "stopped"),
            DisplayState::Running(id) => write!(f, "running({})", id),
        }
    }
}

/// Full layout for a running entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningView {
    /// Entry being shown
    pub entry_id: EntryId,

    /// Formatted elapsed time
    pub duration: String,

    /// Project label, only in compact mode
    pub project: Option<String>,

    /// Description label, only in compact mode
    pub description: Option<String>,
}

impl RunningView {
    /// Build the layout for `entry`.
    pub fn new(entry: &TrackedEntry, elapsed_secs: u64, compact: bool) -> Self {
        let (project, description) = if compact {
            (
                Some(entry.project_label().to_string()),
                Some(entry.description_label().to_string()),
            )
        } else {
            (None, None)
        };

        Self {
            entry_id: entry.id,
            duration: format_duration(elapsed_secs),
            project,
            description,
        }
    }
}

/// Format whole seconds as `hh:mm:ss`, prefixed by `d.` past one day.
pub fn format_duration(total_secs: u64) -> String {
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;

    if days > 0 {
        format!("{}.{:02}:{:02}:{:02}", days, hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}
