//! The reconciler - ties subscriptions, identity tracking, bus filtering and
//! the clock together for one display.
//!
//! Every input arrives as a [`Signal`] and is handled to completion before
//! the next one, so no state here is shared across threads. The flow for
//! each signal is:
//!
//! ```text
//! fetch entry → resolver.sync → changed?  ─yes→ rebind (subscriptions, layout, tick)
//!                                          └no→ refresh (duration text, tick if none)
//! ```

use std::sync::Arc;

use ticktrack_core::{
    ChangeMessage, DisplayState, EntryId, EntryProperty, ManagerProperty, MessageKind, TrackedEntry,
};
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

use crate::config::{Strategy, TimerConfig};
use crate::error::{Result, TimerError};
use crate::filter::{BroadcastFilter, Verdict};
use crate::ports::{BusHandle, Collaborators, DisplaySurface, PropertyListener, WatchHandle};
use crate::resolver::{ActiveEntryResolver, IdentityChange};
use crate::signal::{Signal, SignalQueue, SignalSink};
use crate::ticker::TickScheduler;
use crate::tracker::EntrySubscriptions;

/// Raised whenever the tracked entry's identity changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveEntryChanged {
    /// The entry now tracked, if any
    pub entry: Option<EntryId>,
}

/// How much of the display an unchanged identity still needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Duration text only; keep the pending tick
    Refresh,
    /// Duration text and a fresh tick (start/stop edits, fired ticks)
    Retime,
    /// Full layout without subscription churn (label edits)
    Relayout,
}

enum Upstream {
    Manager(WatchHandle),
    Bus(BusHandle),
}

/// Keeps one display in sync with the active entry.
pub struct Reconciler {
    config: TimerConfig,
    ports: Collaborators,
    sink: Arc<dyn SignalSink>,
    resolver: ActiveEntryResolver,
    subscriptions: EntrySubscriptions,
    filter: BroadcastFilter,
    ticker: TickScheduler,
    display: DisplayState,
    hidden: bool,
    first_cycle: bool,
    surface: Option<Box<dyn DisplaySurface>>,
    upstream: Option<Upstream>,
    changes: broadcast::Sender<ActiveEntryChanged>,
}

impl Reconciler {
    /// Create an idle reconciler. Listeners it registers post into `sink`.
    pub fn new(config: TimerConfig, ports: Collaborators, sink: Arc<dyn SignalSink>) -> Self {
        let mut ticker = TickScheduler::new(ports.timer.clone(), config.tick_period());
        ticker.set_compact(config.compact);
        let (changes, _) = broadcast::channel(16);

        Self {
            hidden: config.hidden,
            subscriptions: EntrySubscriptions::new(ports.properties.clone()),
            resolver: ActiveEntryResolver::new(),
            filter: BroadcastFilter::new(),
            display: DisplayState::Stopped,
            first_cycle: true,
            surface: None,
            upstream: None,
            config,
            ports,
            sink,
            ticker,
            changes,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Whether `start` has been called without a matching `stop`.
    pub fn is_active(&self) -> bool {
        self.surface.is_some()
    }

    /// What the display currently shows.
    pub fn current_display_state(&self) -> DisplayState {
        self.display
    }

    /// The local copy of the tracked entry.
    pub fn current_entry(&self) -> Option<&TrackedEntry> {
        self.resolver.current()
    }

    /// Number of live per-entry subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Number of pending ticks.
    pub fn pending_tick_count(&self) -> usize {
        self.ticker.pending_count()
    }

    /// Whether the display is collapsed.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Whether the compact layout is used.
    pub fn is_compact(&self) -> bool {
        self.ticker.compact()
    }

    /// Receive an event each time the tracked identity changes.
    pub fn subscribe_entry_changes(&self) -> broadcast::Receiver<ActiveEntryChanged> {
        self.changes.subscribe()
    }

    /// Attach `surface`, hook up to the model and render the initial state.
    pub fn start(&mut self, surface: Box<dyn DisplaySurface>) -> Result<()> {
        if self.is_active() {
            return Err(TimerError::AlreadyActive);
        }

        self.surface = Some(surface);
        self.first_cycle = true;

        let sink = self.sink.clone();
        self.upstream = Some(match self.config.strategy {
            Strategy::Manager => Upstream::Manager(
                self.ports
                    .provider
                    .watch_active(Arc::new(move |property: ManagerProperty| {
                        sink.post(Signal::Manager(property))
                    })),
            ),
            Strategy::Bus => Upstream::Bus(self.ports.bus.subscribe(
                MessageKind::ModelChanged,
                Arc::new(move |message: &ChangeMessage| sink.post(Signal::Bus(message.clone()))),
            )),
        });

        let initial = match self.config.strategy {
            Strategy::Manager => self.ports.provider.active(),
            Strategy::Bus => self
                .filter
                .cold_start(self.ports.lookup.as_ref(), self.ports.identity.as_ref()),
        };
        self.reconcile(initial, Pass::Refresh);

        info!(strategy = %self.config.strategy, state = %self.display, "timer started");
        Ok(())
    }

    /// Tear down: release every listener and the pending tick.
    ///
    /// Returns the surface passed to [`Reconciler::start`]. The reconciler
    /// can be started again afterwards.
    pub fn stop(&mut self) -> Result<Box<dyn DisplaySurface>> {
        let surface = self.surface.take().ok_or(TimerError::NotActive)?;

        self.release_upstream();
        self.subscriptions.clear();
        self.ticker.cancel();
        self.resolver.clear();
        self.filter.follow(None);
        self.display = DisplayState::Stopped;
        self.first_cycle = true;

        info!("timer stopped");
        Ok(surface)
    }

    /// Handle one signal.
    pub fn dispatch(&mut self, signal: Signal) -> Result<()> {
        if !self.is_active() {
            return Err(TimerError::NotActive);
        }

        match signal {
            Signal::Manager(property) => {
                trace!(?property, "manager push");
                let fetched = self.ports.provider.active();
                self.reconcile(fetched, Pass::Refresh);
            }
            Signal::EntryChanged { entry, property } => {
                if self.resolver.current_id() != Some(entry) {
                    debug!(entry_id = %entry, ?property, "change for untracked entry ignored");
                    return Ok(());
                }
                let pass = if property.affects_clock() {
                    Pass::Retime
                } else {
                    Pass::Relayout
                };
                let fetched = self.fetch_tracked();
                self.reconcile(fetched, pass);
            }
            Signal::Bus(message) => {
                let verdict = self.filter.evaluate(
                    &message,
                    self.ports.lookup.as_ref(),
                    self.ports.identity.as_ref(),
                );
                match verdict {
                    Verdict::Ignore => {}
                    Verdict::Refresh(entry) => self.reconcile(Some(entry), Pass::Retime),
                    Verdict::Adopt(entry) => self.reconcile(Some(entry), Pass::Refresh),
                    Verdict::Stop => self.reconcile(None, Pass::Refresh),
                }
            }
            Signal::Tick(token) => {
                if !self.ticker.acknowledge(token) {
                    debug!(%token, "stale tick discarded");
                    return Ok(());
                }
                let fetched = self.fetch_tracked();
                self.reconcile(fetched, Pass::Retime);
            }
            Signal::StopRequested => self.request_stop()?,
        }

        Ok(())
    }

    /// Dispatch queued signals in arrival order until the queue is empty.
    ///
    /// Signals posted while dispatching are handled in the same call.
    /// Returns how many were handled.
    pub fn run_queued(&mut self, queue: &SignalQueue) -> Result<usize> {
        let mut handled = 0;
        while let Some(signal) = queue.pop() {
            self.dispatch(signal)?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Ask the data layer to stop the tracked entry.
    ///
    /// The display only changes once the model reports the entry stopped.
    pub fn request_stop(&mut self) -> Result<()> {
        if !self.is_active() {
            return Err(TimerError::NotActive);
        }

        match self.resolver.current() {
            Some(entry) if entry.running => {
                info!(entry_id = %entry.id, "stop requested");
                self.ports.commands.stop_entry(entry.id);
            }
            _ => debug!("stop requested with nothing running"),
        }
        Ok(())
    }

    /// Switch the compact layout on or off.
    pub fn set_compact(&mut self, compact: bool) -> Result<()> {
        if !self.is_active() {
            return Err(TimerError::NotActive);
        }
        if self.ticker.compact() == compact {
            return Ok(());
        }

        self.ticker.set_compact(compact);
        self.render_full();
        Ok(())
    }

    /// Collapse or restore the display.
    pub fn set_hidden(&mut self, hidden: bool) -> Result<()> {
        if !self.is_active() {
            return Err(TimerError::NotActive);
        }

        self.hidden = hidden;
        self.render_full();
        Ok(())
    }

    /// Re-read the tracked entry from the source this strategy trusts.
    fn fetch_tracked(&self) -> Option<TrackedEntry> {
        match self.config.strategy {
            Strategy::Manager => self.ports.provider.active(),
            Strategy::Bus => self
                .resolver
                .current_id()
                .and_then(|id| self.ports.lookup.find(id)),
        }
    }

    fn reconcile(&mut self, fetched: Option<TrackedEntry>, pass: Pass) {
        // The bus only announces changes, so losing the tracked entry means
        // asking the model whether another owned entry is already running.
        let fetched = match (self.config.strategy, fetched) {
            (_, Some(entry)) if entry.running => Some(entry),
            (Strategy::Bus, _) => self
                .filter
                .cold_start(self.ports.lookup.as_ref(), self.ports.identity.as_ref()),
            (Strategy::Manager, fetched) => fetched,
        };
        let change = self.resolver.sync(fetched);
        let rebind = self.first_cycle || change == IdentityChange::Changed;
        self.first_cycle = false;

        if rebind {
            self.rebind();
        } else {
            self.refresh(pass);
        }
    }

    fn rebind(&mut self) {
        let tracked = self.resolver.current_id();

        self.subscriptions.mark_all_stale();
        if let Some(id) = tracked {
            let sink = self.sink.clone();
            let listener: PropertyListener =
                Arc::new(move |entry: EntryId, property: EntryProperty| {
                    sink.post(Signal::EntryChanged { entry, property })
                });
            self.subscriptions.add(id, listener);
        }
        let released = self.subscriptions.clear_stale();
        self.filter.follow(tracked);

        debug!(
            entry_id = ?tracked,
            released,
            subscriptions = self.subscriptions.len(),
            "rebind"
        );

        self.render_full();
        // Err only means nobody is listening.
        let _ = self.changes.send(ActiveEntryChanged { entry: tracked });
    }

    fn refresh(&mut self, pass: Pass) {
        if pass == Pass::Relayout {
            self.render_full();
            return;
        }

        let Some(surface) = self.surface.as_deref_mut() else {
            return;
        };
        let Some(entry) = self.resolver.current() else {
            self.ticker.cancel();
            self.display = DisplayState::Stopped;
            return;
        };
        if self.hidden {
            return;
        }

        let now = self.ports.clock.now();
        if pass == Pass::Refresh && self.ticker.has_pending() {
            self.ticker.render(entry, now, surface);
        } else {
            self.ticker.render_and_reschedule(entry, now, surface);
        }
    }

    fn render_full(&mut self) {
        let Some(surface) = self.surface.as_deref_mut() else {
            return;
        };

        self.display = match self.resolver.current() {
            Some(entry) => DisplayState::Running(entry.id),
            None => DisplayState::Stopped,
        };

        if self.hidden {
            surface.set_hidden(true);
            self.ticker.cancel();
            return;
        }
        surface.set_hidden(false);

        match self.resolver.current() {
            Some(entry) => {
                let now = self.ports.clock.now();
                self.ticker.layout(entry, now, surface);
                self.ticker.reschedule(entry, now);
            }
            None => {
                surface.show_stopped();
                self.ticker.cancel();
            }
        }
    }

    fn release_upstream(&mut self) {
        match self.upstream.take() {
            Some(Upstream::Manager(handle)) => self.ports.provider.unwatch_active(handle),
            Some(Upstream::Bus(handle)) => self.ports.bus.unsubscribe(handle),
            None => {}
        }
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.release_upstream();
    }
}
