//! Configuration watcher.
//!
//! Every reason to resynchronize becomes a [`Trigger`] on one channel. A
//! single dispatch loop consumes the channel, so synchronization passes never
//! overlap. Triggers that queue up while a pass runs are folded into the next
//! pass instead of being replayed one by one.

use parking_lot::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;

use crate::engine::RuleEngine;
use crate::error::{Error, Result};
use crate::ruleset::{SyncConfig, WATCHED_KEYS};
use crate::store::{ConfigStore, StoreValues};
use crate::sync::{RuleSynchronizer, SyncReport};

/// Channel on which a pass outcome is delivered to an interactive caller.
pub type SyncReply = Sender<Result<SyncReport>>;

/// A reason to run a synchronization pass.
#[derive(Debug)]
pub enum Trigger {
    /// First run: seed missing configuration defaults, then synchronize
    Installed,
    /// Host startup
    Startup,
    /// The store reported changes to these keys
    StoreChanged(Vec<String>),
    /// Explicit request carrying the caller's current configuration
    SyncNow {
        config: SyncConfig,
        reply: Option<SyncReply>,
    },
    /// Stop the dispatch loop after handling what is already queued
    Shutdown,
}

/// Dispatch loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatcherState {
    #[default]
    Idle,
    Syncing,
}

/// Where a pass takes its configuration from.
#[derive(Debug)]
enum Source {
    Store,
    Request(SyncConfig),
}

/// Triggers folded into one pass.
#[derive(Debug, Default)]
struct Fold {
    source: Option<Source>,
    store_touched: bool,
    seed_defaults: bool,
    replies: Vec<SyncReply>,
    shutdown: bool,
}

impl Fold {
    /// Fold triggers in arrival order.
    ///
    /// Any store-side trigger makes the pass read the store, which is never
    /// older than a request snapshot. Otherwise the newest request is used.
    fn new(triggers: impl IntoIterator<Item = Trigger>) -> Self {
        let mut fold = Fold::default();
        for trigger in triggers {
            match trigger {
                Trigger::Installed => {
                    fold.seed_defaults = true;
                    fold.store_touched = true;
                }
                Trigger::Startup => fold.store_touched = true,
                Trigger::StoreChanged(keys) => {
                    if keys.iter().any(|key| WATCHED_KEYS.contains(&key.as_str())) {
                        fold.store_touched = true;
                    } else {
                        log::debug!("Ignoring change to unrelated keys {:?}", keys);
                    }
                }
                Trigger::SyncNow { config, reply } => {
                    fold.source = Some(Source::Request(config));
                    fold.replies.extend(reply);
                }
                Trigger::Shutdown => fold.shutdown = true,
            }
        }
        if fold.store_touched {
            fold.source = Some(Source::Store);
        }
        fold
    }
}

/// Trigger sender shared by every handle. The store listener only holds a
/// weak reference, so the channel closes once the last handle is gone.
type SharedSender = Arc<Mutex<Sender<Trigger>>>;

/// ConfigWatcher owns the synchronizer and runs one pass per batch of triggers.
pub struct ConfigWatcher<S: ?Sized, E> {
    store: Arc<S>,
    synchronizer: RuleSynchronizer<E>,
    tx: Option<SharedSender>,
    rx: Receiver<Trigger>,
    state: Arc<Mutex<WatcherState>>,
}

impl<S, E> ConfigWatcher<S, E>
where
    S: ConfigStore + ?Sized + 'static,
    E: RuleEngine,
{
    /// Create a watcher and subscribe it to store changes.
    pub fn new(store: Arc<S>, synchronizer: RuleSynchronizer<E>) -> Self {
        let (tx, rx) = mpsc::channel();
        let tx: SharedSender = Arc::new(Mutex::new(tx));

        let listener_tx: Weak<Mutex<Sender<Trigger>>> = Arc::downgrade(&tx);
        store.subscribe(Box::new(move |change| match listener_tx.upgrade() {
            Some(tx) => tx.lock().send(Trigger::StoreChanged(change.keys())).is_ok(),
            None => false,
        }));

        Self {
            store,
            synchronizer,
            tx: Some(tx),
            rx,
            state: Arc::new(Mutex::new(WatcherState::Idle)),
        }
    }

    /// Get a handle for sending triggers.
    pub fn handle(&self) -> WatcherHandle {
        let tx = match &self.tx {
            Some(tx) => tx.clone(),
            // Only `run` takes the sender, and it consumes the watcher
            None => Arc::new(Mutex::new(mpsc::channel().0)),
        };
        WatcherHandle {
            tx,
            state: self.state.clone(),
        }
    }

    /// Get the current state.
    pub fn state(&self) -> WatcherState {
        *self.state.lock()
    }

    /// Get the synchronizer.
    pub fn synchronizer(&self) -> &RuleSynchronizer<E> {
        &self.synchronizer
    }

    /// Handle queued triggers without blocking; returns the number of passes run.
    pub fn run_pending(&mut self) -> usize {
        let mut passes = 0;
        loop {
            let triggers: Vec<Trigger> = self.rx.try_iter().collect();
            if triggers.is_empty() {
                return passes;
            }
            let fold = Fold::new(triggers);
            let shutdown = fold.shutdown;
            if fold.source.is_some() {
                self.run_pass(fold);
                passes += 1;
            }
            if shutdown {
                return passes;
            }
        }
    }

    /// Run the dispatch loop until a shutdown trigger arrives or every
    /// handle has been dropped.
    pub fn run(mut self) {
        self.tx = None;
        log::debug!("Watcher started");
        while let Ok(first) = self.rx.recv() {
            let triggers = std::iter::once(first).chain(self.rx.try_iter()).collect::<Vec<_>>();
            if triggers.len() > 1 {
                log::debug!("Coalescing {} triggers into one pass", triggers.len());
            }

            let fold = Fold::new(triggers);
            let shutdown = fold.shutdown;
            if fold.source.is_some() {
                self.run_pass(fold);
            }
            if shutdown {
                break;
            }
        }
        log::debug!("Watcher stopped");
    }

    /// Run one synchronization pass and deliver its outcome.
    fn run_pass(&mut self, fold: Fold) {
        *self.state.lock() = WatcherState::Syncing;

        if fold.seed_defaults {
            if let Err(e) = self.seed_defaults() {
                log::error!("Failed to seed default configuration: {}", e);
            }
        }

        let result = match fold.source {
            Some(Source::Request(config)) => self.synchronizer.sync(&config),
            Some(Source::Store) | None => SyncConfig::load(&*self.store)
                .and_then(|config| self.synchronizer.sync(&config)),
        };

        *self.state.lock() = WatcherState::Idle;

        if let Err(ref e) = result {
            if fold.replies.is_empty() {
                log::error!("Background synchronization failed: {}", e);
            } else {
                log::warn!("Requested synchronization failed: {}", e);
            }
        }
        for reply in fold.replies {
            let _ = reply.send(result.clone());
        }
    }

    /// Write defaults for watched keys the store does not hold yet.
    fn seed_defaults(&self) -> Result<()> {
        let present = self.store.get(&WATCHED_KEYS).map_err(Error::StoreRead)?;
        let missing: StoreValues = SyncConfig::default()
            .to_values()
            .into_iter()
            .filter(|(key, _)| !present.contains_key(key))
            .collect();

        if missing.is_empty() {
            return Ok(());
        }
        log::info!("Seeding default configuration for {:?}", missing.keys().collect::<Vec<_>>());
        self.store.set(missing).map_err(Error::StoreWrite)
    }
}

impl<S, E> ConfigWatcher<S, E>
where
    S: ConfigStore + ?Sized + 'static,
    E: RuleEngine + 'static,
{
    /// Run the dispatch loop on a dedicated thread.
    pub fn spawn(self) -> (WatcherHandle, JoinHandle<()>) {
        let handle = self.handle();
        let thread = std::thread::spawn(move || self.run());
        (handle, thread)
    }
}

/// A pass result not yet received.
pub struct PendingSync {
    rx: Receiver<Result<SyncReport>>,
}

impl PendingSync {
    /// Block until the pass covering the request completes.
    pub fn wait(self) -> Result<SyncReport> {
        self.rx.recv().map_err(|_| Error::WatcherStopped)?
    }

    /// Get the result if the pass has completed.
    pub fn try_result(&self) -> Option<Result<SyncReport>> {
        self.rx.try_recv().ok()
    }
}

/// Cloneable sender side of a watcher.
#[derive(Clone)]
pub struct WatcherHandle {
    tx: SharedSender,
    state: Arc<Mutex<WatcherState>>,
}

impl WatcherHandle {
    /// Send a trigger.
    pub fn trigger(&self, trigger: Trigger) -> Result<()> {
        self.tx.lock().send(trigger).map_err(|_| Error::WatcherStopped)
    }

    /// Report first-run initialization.
    pub fn installed(&self) -> Result<()> {
        self.trigger(Trigger::Installed)
    }

    /// Report host startup.
    pub fn startup(&self) -> Result<()> {
        self.trigger(Trigger::Startup)
    }

    /// Request a pass for `config` without waiting for it.
    pub fn submit(&self, config: SyncConfig) -> Result<PendingSync> {
        let (reply, rx) = mpsc::channel();
        self.trigger(Trigger::SyncNow {
            config,
            reply: Some(reply),
        })?;
        Ok(PendingSync { rx })
    }

    /// Request a pass for `config` and wait for its outcome.
    pub fn request_sync(&self, config: SyncConfig) -> Result<SyncReport> {
        self.submit(config)?.wait()
    }

    /// Stop the dispatch loop.
    pub fn shutdown(&self) -> Result<()> {
        self.trigger(Trigger::Shutdown)
    }

    /// Get the dispatch loop state.
    pub fn state(&self) -> WatcherState {
        *self.state.lock()
    }
}
