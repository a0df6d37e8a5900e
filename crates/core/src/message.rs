//! Change notifications exchanged between the backing model and observers.

use serde::{Deserialize, Serialize};

use crate::id::EntryId;

/// Property pushed by the active-entry manager when its pointer moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManagerProperty {
    /// A different entry became the active one (or none is active)
    Active,
    /// The active entry's running flag flipped
    Running,
}

/// Property of a single entry that changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryProperty {
    /// Running/stopped state
    Running,
    /// Start time
    StartTime,
    /// Stop time
    StopTime,
    /// Description text
    Description,
    /// Project reference
    Project,
}

impl EntryProperty {
    /// Whether the change moves the elapsed time or running state.
    pub fn affects_clock(self) -> bool {
        matches!(self, Self::Running | Self::StartTime | Self::StopTime)
    }
}

/// Kind of message published on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Some field of some model object changed
    ModelChanged,
}

/// Field named by a bus change message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangedField {
    /// Running flag
    Running,
    /// Elapsed duration (start/stop edits)
    Elapsed,
    /// Who can see the entry (sharing, workspace moves)
    VisibilityScope,
    /// Description text
    Description,
    /// Anything this crate has no name for
    Other(String),
}

/// Untargeted "something changed" notification broadcast on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMessage {
    /// Object the change happened on
    pub subject: EntryId,

    /// Which field changed
    pub field: ChangedField,
}

impl ChangeMessage {
    /// Create a new change message.
    pub fn new(subject: EntryId, field: ChangedField) -> Self {
        Self { subject, field }
    }

    /// The kind of message this is.
    pub fn kind(&self) -> MessageKind {
        MessageKind::ModelChanged
    }
}
