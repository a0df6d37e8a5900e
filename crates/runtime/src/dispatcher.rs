//! The dispatcher task and its handle.

use std::sync::Arc;

use ticktrack_core::{DisplayState, TrackedEntry};
use ticktrack_storage::{EntryStore, LocalBus, StaticIdentity};
use ticktrack_timer::{
    ActiveEntryChanged, ActiveEntryProvider, Bus, Clock, Collaborators, CommandSink,
    DisplaySurface, EntryLookup, IdentityResolver, PropertySource, Reconciler, Signal,
    SignalSink, TimerConfig, TimerError, TimerService,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::error::{Result, RuntimeError};
use crate::sink::QueueSink;
use crate::timer::{TokioClock, TokioTimer};

/// Everything the data layer provides; the runtime adds the timer.
#[derive(Clone)]
pub struct ModelPorts {
    /// Active entry manager
    pub provider: Arc<dyn ActiveEntryProvider>,
    /// Per-entry change notifications
    pub properties: Arc<dyn PropertySource>,
    /// Broadcast bus
    pub bus: Arc<dyn Bus>,
    /// Entry lookup for bus messages
    pub lookup: Arc<dyn EntryLookup>,
    /// Ownership check
    pub identity: Arc<dyn IdentityResolver>,
    /// Stop command target
    pub commands: Arc<dyn CommandSink>,
    /// Wall clock
    pub clock: Arc<dyn Clock>,
}

impl ModelPorts {
    /// Ports backed by an in-memory store, its bus and a fixed identity.
    ///
    /// The clock follows tokio time. Must be called from within a tokio
    /// runtime.
    pub fn local(store: Arc<EntryStore>, bus: Arc<LocalBus>, identity: StaticIdentity) -> Self {
        Self {
            provider: store.clone(),
            properties: store.clone(),
            lookup: store.clone(),
            commands: store,
            bus,
            identity: Arc::new(identity),
            clock: Arc::new(TokioClock::new()),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn with_timer(self, timer: Arc<dyn TimerService>) -> Collaborators {
        Collaborators {
            provider: self.provider,
            properties: self.properties,
            bus: self.bus,
            lookup: self.lookup,
            identity: self.identity,
            commands: self.commands,
            timer,
            clock: self.clock,
        }
    }
}

/// Point-in-time view of the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSnapshot {
    /// Whether a surface is attached
    pub active: bool,
    /// What the display shows
    pub display: DisplayState,
    /// Local copy of the tracked entry
    pub entry: Option<TrackedEntry>,
    /// Live per-entry subscriptions
    pub subscriptions: usize,
    /// Pending ticks
    pub pending_ticks: usize,
    /// Whether the display is collapsed
    pub hidden: bool,
    /// Whether the compact layout is used
    pub compact: bool,
}

type Reply<T> = oneshot::Sender<T>;

/// Work items for the dispatcher.
pub(crate) enum Command {
    Signal(Signal),
    Start(Box<dyn DisplaySurface>, Reply<std::result::Result<(), TimerError>>),
    Stop(Reply<std::result::Result<Box<dyn DisplaySurface>, TimerError>>),
    RequestStop(Reply<std::result::Result<(), TimerError>>),
    SetCompact(bool, Reply<std::result::Result<(), TimerError>>),
    SetHidden(bool, Reply<std::result::Result<(), TimerError>>),
    Snapshot(Reply<TimerSnapshot>),
    SubscribeChanges(Reply<broadcast::Receiver<ActiveEntryChanged>>),
    Shutdown(Reply<()>),
}

/// Cheap, cloneable handle to a running dispatcher.
#[derive(Clone)]
pub struct DispatchHandle {
    tx: mpsc::UnboundedSender<Command>,
}

/// Spawn a dispatcher task for one display.
///
/// Must be called from within a tokio runtime. The task ends after
/// [`DispatchHandle::shutdown`] or once every handle is dropped.
pub fn spawn(config: TimerConfig, model: ModelPorts) -> (DispatchHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink: Arc<dyn SignalSink> = Arc::new(QueueSink::new(tx.downgrade()));
    let timer = Arc::new(TokioTimer::new(sink.clone()));
    let reconciler = Reconciler::new(config, model.with_timer(timer), sink);

    let task = tokio::spawn(run(reconciler, rx));
    (DispatchHandle { tx }, task)
}

async fn run(mut reconciler: Reconciler, mut rx: mpsc::UnboundedReceiver<Command>) {
    info!(strategy = %reconciler.config().strategy, "dispatcher running");

    while let Some(command) = rx.recv().await {
        match command {
            Command::Signal(signal) => {
                trace!(?signal, "dispatch");
                if let Err(e) = reconciler.dispatch(signal) {
                    // Ticks and callbacks already queued when the timer stopped.
                    debug!(error = %e, "signal dropped");
                }
            }
            Command::Start(surface, reply) => {
                let _ = reply.send(reconciler.start(surface));
            }
            Command::Stop(reply) => {
                let _ = reply.send(reconciler.stop());
            }
            Command::RequestStop(reply) => {
                let _ = reply.send(reconciler.request_stop());
            }
            Command::SetCompact(compact, reply) => {
                let _ = reply.send(reconciler.set_compact(compact));
            }
            Command::SetHidden(hidden, reply) => {
                let _ = reply.send(reconciler.set_hidden(hidden));
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(snapshot(&reconciler));
            }
            Command::SubscribeChanges(reply) => {
                let _ = reply.send(reconciler.subscribe_entry_changes());
            }
            Command::Shutdown(reply) => {
                if reconciler.is_active() {
                    let _ = reconciler.stop();
                }
                let _ = reply.send(());
                break;
            }
        }
    }

    // Every handle dropped without a shutdown.
    if reconciler.is_active() {
        let _ = reconciler.stop();
    }
    info!("dispatcher stopped");
}

fn snapshot(reconciler: &Reconciler) -> TimerSnapshot {
    TimerSnapshot {
        active: reconciler.is_active(),
        display: reconciler.current_display_state(),
        entry: reconciler.current_entry().cloned(),
        subscriptions: reconciler.subscription_count(),
        pending_ticks: reconciler.pending_tick_count(),
        hidden: reconciler.is_hidden(),
        compact: reconciler.is_compact(),
    }
}

impl DispatchHandle {
    /// Attach `surface` and start following the active entry.
    pub async fn start(&self, surface: Box<dyn DisplaySurface>) -> Result<()> {
        self.call(|reply| Command::Start(surface, reply)).await??;
        Ok(())
    }

    /// Tear down and get the surface back.
    pub async fn stop(&self) -> Result<Box<dyn DisplaySurface>> {
        Ok(self.call(Command::Stop).await??)
    }

    /// Ask the data layer to stop the tracked entry.
    pub async fn request_stop(&self) -> Result<()> {
        self.call(Command::RequestStop).await??;
        Ok(())
    }

    /// Switch the compact layout on or off.
    pub async fn set_compact(&self, compact: bool) -> Result<()> {
        self.call(|reply| Command::SetCompact(compact, reply)).await??;
        Ok(())
    }

    /// Collapse or restore the display.
    pub async fn set_hidden(&self, hidden: bool) -> Result<()> {
        self.call(|reply| Command::SetHidden(hidden, reply)).await??;
        Ok(())
    }

    /// Current reconciler state.
    pub async fn snapshot(&self) -> Result<TimerSnapshot> {
        self.call(Command::Snapshot).await
    }

    /// Receive an event each time the tracked identity changes.
    pub async fn subscribe_entry_changes(&self) -> Result<broadcast::Receiver<ActiveEntryChanged>> {
        self.call(Command::SubscribeChanges).await
    }

    /// Stop the display if needed and end the dispatcher task.
    pub async fn shutdown(&self) -> Result<()> {
        self.call(Command::Shutdown).await
    }

    async fn call<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(command(reply))
            .map_err(|_| RuntimeError::Closed)?;
        response.await.map_err(|_| RuntimeError::Closed)
    }
}
