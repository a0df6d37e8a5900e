//! Signal sink backed by the dispatcher queue.

use ticktrack_timer::{Signal, SignalSink};
use tokio::sync::mpsc;
use tracing::trace;

use crate::dispatcher::Command;

/// Posts signals onto the dispatcher's queue.
///
/// Posting never blocks and may be done from any thread; signals posted
/// after the dispatcher has shut down are dropped.
///
/// The sink holds the queue weakly, so the reconciler and its timers never
/// keep the dispatcher alive once every [`DispatchHandle`] is gone.
///
/// [`DispatchHandle`]: crate::DispatchHandle
#[derive(Clone)]
pub struct QueueSink {
    tx: mpsc::WeakUnboundedSender<Command>,
}

impl QueueSink {
    pub(crate) fn new(tx: mpsc::WeakUnboundedSender<Command>) -> Self {
        Self { tx }
    }
}

impl SignalSink for QueueSink {
    fn post(&self, signal: Signal) {
        let Some(tx) = self.tx.upgrade() else {
            trace!("signal dropped; dispatcher closed");
            return;
        };
        if tx.send(Command::Signal(signal)).is_err() {
            trace!("signal dropped; dispatcher closed");
        }
    }
}
