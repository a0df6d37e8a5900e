//! Self-rescheduling clock tick.
//!
//! Each tick renders the elapsed time and arms exactly one one-shot timer
//! for the next whole-period boundary of the entry's elapsed time, so the
//! readout flips in step with the seconds instead of drifting by a fixed
//! polling interval.

use std::sync::Arc;
use std::time::Duration;

use ticktrack_core::{format_duration, RunningView, Time, TrackedEntry};
use tracing::trace;

use crate::ports::{DisplaySurface, TickToken, TimerHandle, TimerService};

/// Default tick period.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(1000);

/// Delay until the next period boundary of `elapsed`.
///
/// Always in `1..=period` milliseconds: exactly on a boundary waits a full
/// period rather than firing immediately.
pub fn next_delay(elapsed: chrono::Duration, period: Duration) -> Duration {
    let period_ms = (period.as_millis() as u64).max(1);
    let elapsed_ms = elapsed.num_milliseconds().max(0) as u64;
    Duration::from_millis(period_ms - elapsed_ms % period_ms)
}

#[derive(Debug, Clone, Copy)]
struct PendingTick {
    handle: TimerHandle,
    token: TickToken,
}

/// Owns the single pending tick of one display.
pub struct TickScheduler {
    timer: Arc<dyn TimerService>,
    period: Duration,
    pending: Option<PendingTick>,
    next_token: u64,
    last_rendered: Option<u64>,
    compact: bool,
}

impl TickScheduler {
    /// Create a scheduler with nothing pending.
    pub fn new(timer: Arc<dyn TimerService>, period: Duration) -> Self {
        Self {
            timer,
            period,
            pending: None,
            next_token: 0,
            last_rendered: None,
            compact: false,
        }
    }

    /// Whether the compact layout is used.
    pub fn compact(&self) -> bool {
        self.compact
    }

    /// Switch the compact layout on or off.
    pub fn set_compact(&mut self, compact: bool) {
        self.compact = compact;
    }

    /// Whole seconds shown by the last render.
    pub fn last_rendered_secs(&self) -> Option<u64> {
        self.last_rendered
    }

    /// Token of the pending tick.
    pub fn pending_token(&self) -> Option<TickToken> {
        self.pending.map(|p| p.token)
    }

    /// Whether a tick is pending.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of pending ticks; never more than one.
    pub fn pending_count(&self) -> usize {
        usize::from(self.pending.is_some())
    }

    /// Render the full running layout for `entry`.
    pub fn layout(&mut self, entry: &TrackedEntry, now: Time, surface: &mut dyn DisplaySurface) {
        let secs = elapsed_secs(entry, now);
        surface.show_running(&RunningView::new(entry, secs, self.compact));
        self.last_rendered = Some(secs);
    }

    /// Replace only the duration text.
    pub fn render(&mut self, entry: &TrackedEntry, now: Time, surface: &mut dyn DisplaySurface) {
        let secs = elapsed_secs(entry, now);
        surface.update_duration(&format_duration(secs));
        self.last_rendered = Some(secs);
    }

    /// Render, then arm the next tick. Returns the delay armed, if any.
    pub fn render_and_reschedule(
        &mut self,
        entry: &TrackedEntry,
        now: Time,
        surface: &mut dyn DisplaySurface,
    ) -> Option<Duration> {
        self.render(entry, now, surface);
        self.reschedule(entry, now)
    }

    /// Cancel the pending tick and, for a running entry, arm the next one.
    pub fn reschedule(&mut self, entry: &TrackedEntry, now: Time) -> Option<Duration> {
        self.cancel();
        if !entry.running {
            return None;
        }

        let delay = next_delay(entry.duration(now), self.period);
        self.next_token += 1;
        let token = TickToken(self.next_token);
        let handle = self.timer.schedule(delay, token);
        trace!(%token, delay_ms = delay.as_millis() as u64, "tick armed");
        self.pending = Some(PendingTick { handle, token });
        Some(delay)
    }

    /// Accept a fired tick.
    ///
    /// Returns `false` for anything but the pending token: a tick that was
    /// superseded or cancelled after its timer already fired.
    pub fn acknowledge(&mut self, token: TickToken) -> bool {
        match self.pending {
            Some(pending) if pending.token == token => {
                self.pending = None;
                self.timer.cancel(pending.handle);
                true
            }
            _ => false,
        }
    }

    /// Cancel the pending tick, if any.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            trace!(token = %pending.token, "tick cancelled");
            self.timer.cancel(pending.handle);
        }
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn elapsed_secs(entry: &TrackedEntry, now: Time) -> u64 {
    entry.duration(now).num_seconds().max(0) as u64
}
