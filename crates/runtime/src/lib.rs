//! Tokio runtime for the ticktrack timer.
//!
//! A single dispatcher task owns the [`ticktrack_timer::Reconciler`] and
//! drains one queue of commands. Collaborator callbacks and timer expiries
//! are turned into queued signals, so the reconciler never runs
//! concurrently with itself.

#![warn(missing_docs)]

pub mod dispatcher;
pub mod error;
pub mod sink;
pub mod timer;

pub use dispatcher::{spawn, DispatchHandle, ModelPorts, TimerSnapshot};
pub use error::{Result, RuntimeError};
pub use sink::QueueSink;
pub use timer::{TokioClock, TokioTimer};
