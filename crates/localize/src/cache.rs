//! Per-locale lazily loaded string cache.
//!
//! Each [`ProviderCache`] is a cheap handle onto a single actor task that owns
//! the cached strings. Every mutation (force flag, requirement count, loads,
//! unloads and lookups) is a [`Command`] drained by that one task, so a cache
//! never runs two state changes at once while distinct caches run in parallel.
//!
//! # Lifecycle
//!
//! `Unloaded -> Loaded -> PendingUnload -> Unloaded`
//!
//! A cache is *required* while it is forced or has a positive requirement
//! count. A required cache is loaded eagerly. When it stops being required it
//! enters `PendingUnload` and arms a debounce timer; the strings are only
//! dropped if the timer fires while the cache is still unrequired. Becoming
//! required again, or serving a lookup, cancels or restarts the countdown.
//!
//! The timer runs as its own task and re-enters the queue with
//! [`Command::UnloadTimerFired`]. Every arm and cancel advances a generation
//! counter, and a fired timer carrying an older generation is ignored, which
//! covers timers that were already running when they were cancelled.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::I18nError;
use crate::source::{StringSource, Strings};

/// Lookup keys and loaded keys are compared in this form.
pub(crate) fn normalize_key(key: &str) -> String {
    key.to_lowercase()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheState {
    Unloaded,
    Loaded,
    PendingUnload,
}

/// Point-in-time view of a cache, taken on its serialized context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheStatus {
    pub state: CacheState,
    pub requirements: usize,
    pub forced: bool,
    pub entries: usize,
    /// Successful loads since the cache was created.
    pub loads: u64,
    /// Debounced unloads since the cache was created.
    pub unloads: u64,
}

/// Requirement bookkeeping a new cache starts out with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Demand {
    pub forced: bool,
    pub requirements: usize,
}

enum Command {
    SetForceLoad(bool),
    AddRequirement,
    RemoveRequirement,
    GetString {
        key: String,
        reply: oneshot::Sender<Result<Option<String>, I18nError>>,
    },
    Status {
        reply: oneshot::Sender<CacheStatus>,
    },
    UnloadTimerFired {
        generation: u64,
    },
}

/// Handle to a per-locale cache actor.
///
/// Cloning is cheap; the actor stops once every handle has been dropped.
#[derive(Clone)]
pub struct ProviderCache {
    locale: Arc<str>,
    source: Arc<dyn StringSource>,
    commands: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for ProviderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCache")
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}

impl ProviderCache {
    /// Start the actor for `locale` on `runtime`.
    ///
    /// The cache begins `Unloaded` and immediately loads if `demand` makes it
    /// required.
    pub fn spawn(
        locale: impl Into<String>,
        source: Arc<dyn StringSource>,
        unload_interval: Duration,
        demand: Demand,
        runtime: &Handle,
    ) -> Self {
        let locale: Arc<str> = Arc::from(locale.into());
        let (tx, rx) = mpsc::unbounded_channel();

        let actor = CacheActor::new(
            Arc::clone(&locale),
            Arc::clone(&source),
            tx.downgrade(),
            unload_interval,
            demand,
        );
        runtime.spawn(actor.run(rx));

        Self {
            locale,
            source,
            commands: tx,
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn source(&self) -> &Arc<dyn StringSource> {
        &self.source
    }

    /// Keep the strings resident regardless of the requirement count.
    pub fn set_force_load(&self, force: bool) {
        self.send(Command::SetForceLoad(force));
    }

    pub fn add_requirement(&self) {
        self.send(Command::AddRequirement);
    }

    /// Decrement the requirement count; it never drops below zero.
    pub fn remove_requirement(&self) {
        self.send(Command::RemoveRequirement);
    }

    /// Look up `key`, loading the strings first if necessary.
    ///
    /// Returns `Ok(None)` when the locale has no entry for the key. A failed
    /// load is reported here and retried on the next access.
    pub async fn get_string(&self, key: &str) -> Result<Option<String>, I18nError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::GetString {
                key: normalize_key(key),
                reply,
            })
            .map_err(|_| self.closed())?;
        rx.await.map_err(|_| self.closed())?
    }

    /// Blocking variant of [`Self::get_string`].
    ///
    /// Must not be called from a thread that drives the cache's runtime.
    pub fn get_string_blocking(&self, key: &str) -> Result<Option<String>, I18nError> {
        pollster::block_on(self.get_string(key))
    }

    pub async fn status(&self) -> Result<CacheStatus, I18nError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Status { reply })
            .map_err(|_| self.closed())?;
        rx.await.map_err(|_| self.closed())
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!(locale = %self.locale, "provider cache is no longer running; command dropped");
        }
    }

    fn closed(&self) -> I18nError {
        I18nError::ProviderClosed {
            locale: self.locale.to_string(),
        }
    }
}

struct CacheActor {
    locale: Arc<str>,
    source: Arc<dyn StringSource>,
    commands: mpsc::WeakUnboundedSender<Command>,
    unload_interval: Duration,

    state: CacheState,
    requirements: usize,
    forced: bool,
    strings: HashMap<String, String>,

    generation: u64,
    timer: Option<JoinHandle<()>>,

    loads: u64,
    unloads: u64,
}

impl CacheActor {
    fn new(
        locale: Arc<str>,
        source: Arc<dyn StringSource>,
        commands: mpsc::WeakUnboundedSender<Command>,
        unload_interval: Duration,
        demand: Demand,
    ) -> Self {
        Self {
            locale,
            source,
            commands,
            unload_interval,
            state: CacheState::Unloaded,
            requirements: demand.requirements,
            forced: demand.forced,
            strings: HashMap::new(),
            generation: 0,
            timer: None,
            loads: 0,
            unloads: 0,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        self.update().await;
        while let Some(command) = rx.recv().await {
            self.handle(command).await;
        }
        self.cancel_unload();
        trace!(locale = %self.locale, "provider cache stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::SetForceLoad(force) => {
                self.forced = force;
                self.update().await;
            }
            Command::AddRequirement => {
                self.requirements += 1;
                self.update().await;
            }
            Command::RemoveRequirement => {
                self.requirements = self.requirements.saturating_sub(1);
                self.update().await;
            }
            Command::GetString { key, reply } => {
                let result = self.get_string(&key).await;
                let _ = reply.send(result);
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Command::UnloadTimerFired { generation } => self.on_unload_timer(generation),
        }
    }

    fn is_required(&self) -> bool {
        self.forced || self.requirements > 0
    }

    /// Apply the transition rule after a force or requirement change.
    async fn update(&mut self) {
        match (self.is_required(), self.state) {
            (true, CacheState::Unloaded) => {
                if let Err(err) = self.load().await {
                    warn!(locale = %self.locale, error = ?err, "failed to load required strings");
                }
            }
            (true, CacheState::PendingUnload) => {
                self.cancel_unload();
                self.state = CacheState::Loaded;
                debug!(locale = %self.locale, "pending unload cancelled");
            }
            (false, CacheState::Loaded) => {
                self.state = CacheState::PendingUnload;
                self.arm_unload();
            }
            _ => {}
        }
    }

    async fn get_string(&mut self, key: &str) -> Result<Option<String>, I18nError> {
        match self.state {
            CacheState::Unloaded => {
                self.load().await?;
                if !self.is_required() {
                    self.state = CacheState::PendingUnload;
                    self.arm_unload();
                }
            }
            // An access is demand too: restart the countdown.
            CacheState::PendingUnload => self.arm_unload(),
            CacheState::Loaded => {}
        }
        Ok(self.strings.get(key).cloned())
    }

    async fn load(&mut self) -> Result<(), I18nError> {
        self.strings.clear();
        self.state = CacheState::Unloaded;

        let source = Arc::clone(&self.source);
        let loaded = tokio::task::spawn_blocking(move || source.load_strings()).await;

        let strings = match loaded {
            Ok(Ok(strings)) => strings,
            Ok(Err(source)) => {
                return Err(I18nError::Load {
                    locale: self.locale.to_string(),
                    source,
                });
            }
            Err(err) if err.is_panic() => {
                return Err(I18nError::LoadPanicked {
                    locale: self.locale.to_string(),
                });
            }
            Err(_) => {
                return Err(I18nError::ProviderClosed {
                    locale: self.locale.to_string(),
                });
            }
        };

        self.strings = self.fold_keys(strings);
        self.state = CacheState::Loaded;
        self.loads += 1;
        debug!(locale = %self.locale, entries = self.strings.len(), "strings loaded");
        Ok(())
    }

    /// Normalize loaded keys. When two keys differ only in case, the first in
    /// byte order wins so repeated loads resolve the same way.
    fn fold_keys(&self, strings: Strings) -> HashMap<String, String> {
        let mut entries: Vec<_> = strings.into_iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let mut folded = HashMap::with_capacity(entries.len());
        for (key, value) in entries {
            match folded.entry(normalize_key(&key)) {
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
                Entry::Occupied(slot) => {
                    warn!(
                        locale = %self.locale,
                        key = %key,
                        normalized = %slot.key(),
                        "key differs from another only in case; ignoring it"
                    );
                }
            }
        }
        folded
    }

    /// (Re)start the debounce countdown.
    fn arm_unload(&mut self) {
        self.cancel_unload();
        let generation = self.generation;
        let commands = self.commands.clone();
        let interval = self.unload_interval;
        let deadline = tokio::time::Instant::now() + interval;

        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(Command::UnloadTimerFired { generation });
            }
        }));
        trace!(locale = %self.locale, generation, ?interval, "unload armed");
    }

    fn cancel_unload(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn on_unload_timer(&mut self, generation: u64) {
        if generation != self.generation || self.state != CacheState::PendingUnload {
            trace!(locale = %self.locale, generation, "stale unload timer ignored");
            return;
        }
        self.timer = None;
        if self.is_required() {
            return;
        }

        self.strings = HashMap::new();
        self.state = CacheState::Unloaded;
        self.unloads += 1;
        debug!(locale = %self.locale, "strings unloaded");
    }

    fn status(&self) -> CacheStatus {
        CacheStatus {
            state: self.state,
            requirements: self.requirements,
            forced: self.forced,
            entries: self.strings.len(),
            loads: self.loads,
            unloads: self.unloads,
        }
    }
}
