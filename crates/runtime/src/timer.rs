//! Tokio-backed timers and clock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use ticktrack_core::Time;
use ticktrack_timer::{Clock, Signal, SignalSink, TickToken, TimerHandle, TimerService};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

#[derive(Default)]
struct Tasks {
    next: u64,
    running: HashMap<TimerHandle, JoinHandle<()>>,
}

/// One-shot timers as sleeping tasks.
///
/// A fired timer posts [`Signal::Tick`] with its token. Cancelling aborts
/// the task; a tick already posted by then is left for the reconciler to
/// discard.
pub struct TokioTimer {
    runtime: Handle,
    sink: Arc<dyn SignalSink>,
    tasks: Mutex<Tasks>,
}

impl TokioTimer {
    /// Create a timer posting into `sink`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(sink: Arc<dyn SignalSink>) -> Self {
        Self {
            runtime: Handle::current(),
            sink,
            tasks: Mutex::new(Tasks::default()),
        }
    }

    /// Number of timers scheduled and not yet cancelled.
    pub fn outstanding(&self) -> usize {
        self.lock().running.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TimerService for TokioTimer {
    fn schedule(&self, delay: Duration, token: TickToken) -> TimerHandle {
        let sink = self.sink.clone();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            trace!(%token, "tick fired");
            sink.post(Signal::Tick(token));
        });

        let mut tasks = self.lock();
        tasks.next += 1;
        let handle = TimerHandle(tasks.next);
        tasks.running.insert(handle, task);
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(task) = self.lock().running.remove(&handle) {
            task.abort();
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        for (_, task) in self.lock().running.drain() {
            task.abort();
        }
    }
}

/// Wall clock that advances with tokio's clock.
///
/// Reads the wall time once and then adds monotonic time from
/// [`tokio::time::Instant`], so it follows a paused or advanced test clock
/// the same way the timers do.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    wall: Time,
    base: Instant,
}

impl TokioClock {
    /// Clock anchored at the current wall time.
    pub fn new() -> Self {
        Self::anchored(Utc::now())
    }

    /// Clock reading `wall` right now.
    pub fn anchored(wall: Time) -> Self {
        Self {
            wall,
            base: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Time {
        let elapsed = chrono::Duration::from_std(self.base.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall + elapsed
    }
}
