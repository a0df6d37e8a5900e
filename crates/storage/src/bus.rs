//! Process-local broadcast bus.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ticktrack_core::{ChangeMessage, MessageKind};
use ticktrack_timer::{Bus, BusHandle, BusListener};
use tracing::trace;

#[derive(Default)]
struct Subscribers {
    next: u64,
    listeners: HashMap<BusHandle, (MessageKind, BusListener)>,
}

/// Untargeted bus: every published message reaches every subscriber of its
/// kind.
#[derive(Default)]
pub struct LocalBus {
    inner: Mutex<Subscribers>,
}

impl LocalBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `message` to the subscribers of its kind.
    ///
    /// Listeners run after the subscriber table is unlocked, so they may
    /// subscribe or unsubscribe.
    pub fn publish(&self, message: &ChangeMessage) {
        let kind = message.kind();
        let listeners: Vec<BusListener> = self
            .lock()
            .listeners
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, listener)| listener.clone())
            .collect();

        trace!(
            subject = %message.subject,
            field = ?message.field,
            receivers = listeners.len(),
            "publish"
        );
        for listener in listeners {
            listener(message);
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Bus for LocalBus {
    fn subscribe(&self, kind: MessageKind, listener: BusListener) -> BusHandle {
        let mut inner = self.lock();
        inner.next += 1;
        let handle = BusHandle(inner.next);
        inner.listeners.insert(handle, (kind, listener));
        handle
    }

    fn unsubscribe(&self, handle: BusHandle) {
        self.lock().listeners.remove(&handle);
    }
}
