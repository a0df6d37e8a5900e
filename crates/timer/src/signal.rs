//! Signals delivered to the reconciler's dispatch queue.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use ticktrack_core::{ChangeMessage, EntryId, EntryProperty, ManagerProperty};

use crate::ports::TickToken;

/// One unit of work for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// The active-entry manager pushed a change
    Manager(ManagerProperty),
    /// A watched entry changed
    EntryChanged {
        /// Entry that changed
        entry: EntryId,
        /// Property that changed
        property: EntryProperty,
    },
    /// A bus message arrived
    Bus(ChangeMessage),
    /// A scheduled tick fired
    Tick(TickToken),
    /// The user asked to stop the tracked entry
    StopRequested,
}

/// Where listeners post signals.
pub trait SignalSink: Send + Sync {
    /// Enqueue `signal`.
    fn post(&self, signal: Signal);
}

/// FIFO queue of signals drained by [`crate::Reconciler::run_queued`].
#[derive(Debug, Default)]
pub struct SignalQueue {
    pending: Mutex<VecDeque<Signal>>,
}

impl SignalQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the oldest signal.
    pub fn pop(&self) -> Option<Signal> {
        self.lock().pop_front()
    }

    /// Number of queued signals.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Signal>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SignalSink for SignalQueue {
    fn post(&self, signal: Signal) {
        self.lock().push_back(signal);
    }
}
