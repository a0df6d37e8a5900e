//! ticktrack core data models.
//!
//! This crate defines the entry, message and display types shared by the
//! timer engine, the runtime and the in-memory backing model.

#![warn(missing_docs)]

mod id;
mod entry;
mod message;
mod display;

pub use id::*;
pub use entry::{TrackedEntry, ProjectRef};
pub use message::{ManagerProperty, EntryProperty, MessageKind, ChangedField, ChangeMessage};
pub use display::{DisplayState, RunningView, format_duration};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
