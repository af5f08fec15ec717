use super::builder::PemKeyStoreBuilder;
use super::metrics::{MetricsErrorKind, MetricsRecorder};
use super::supervisor::{run_reload_task, AliasSlot, Engine, ReloadOutcome, Trigger};
use crate::config::AliasRegistry;
use crate::error::{Error, Result};
use crate::pem::PemBundle;
use crate::prelude::{debug, info, warn};
use crate::provider::ProviderKind;
use crate::source::FileSystem;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle for receiving reload notifications from a [`PemKeyStore`].
///
/// Each published reload, for any alias, bumps a monotonic sequence number.
/// Registration-time parses do not notify. Slow receivers may skip
/// intermediate numbers.
///
/// # Examples
///
/// ```no_run
/// # use pem_keystore::{KeyStoreConfig, PemKeyStore};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = PemKeyStore::builder()
///     .alias("server", ["/etc/tls/server.pem"])
///     .refresh_interval(5)
///     .build()?;
/// store.start()?;
///
/// let mut updates = store.updated();
/// updates.changed().await?;
/// println!("reload #{}", updates.last());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct KeyStoreUpdates {
    rx: watch::Receiver<u64>,
}

impl KeyStoreUpdates {
    /// Waits for the next published reload and returns its sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] once the key store and all its reload tasks are gone.
    pub async fn changed(&mut self) -> Result<u64> {
        self.rx.changed().await.map_err(|_| Error::Closed)?;
        Ok(*self.rx.borrow())
    }

    /// Returns the last sequence number without waiting.
    pub fn last(&self) -> u64 {
        *self.rx.borrow()
    }

    /// Waits until the sequence number satisfies `f`, returning immediately if
    /// it already does.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] once the key store and all its reload tasks are gone.
    pub async fn wait_for<F>(&mut self, mut f: F) -> Result<u64>
    where
        F: FnMut(&u64) -> bool,
    {
        let current = self.last();
        if f(&current) {
            return Ok(current);
        }
        loop {
            let seq = self.changed().await?;
            if f(&seq) {
                return Ok(seq);
            }
        }
    }
}

/// Alias-keyed TLS credentials backed by PEM files.
///
/// Every registered alias is parsed once during [`PemKeyStoreBuilder::build`];
/// a failure there fails the build. With [`ProviderKind::Reloadable`],
/// [`PemKeyStore::start`] arms one poll task per alias with a non-zero refresh
/// interval. Each tick re-stats the alias' files and, if any modification time
/// moved, re-reads, re-parses, and atomically publishes the new bundle. A failed
/// reload is logged and the previous bundle keeps serving.
///
/// Reads never block on reloads and never observe a half-built bundle. Cloning
/// is cheap and clones share state.
#[derive(Clone, Debug)]
pub struct PemKeyStore {
    inner: Arc<Inner>,
}

struct Inner {
    kind: ProviderKind,

    // Registration order; `index` maps alias to position.
    slots: Vec<Arc<AliasSlot>>,
    index: HashMap<String, usize>,

    engine: Arc<Engine>,

    // Lifecycle.
    started: AtomicBool,
    closed: AtomicBool,
    cancel: CancellationToken,
    shutdown_timeout: Option<Duration>,
    tasks: Mutex<Vec<(String, JoinHandle<()>)>>,
}

impl Debug for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PemKeyStore")
            .field("kind", &self.kind)
            .field(
                "aliases",
                &self.slots.iter().map(|s| s.alias()).collect::<Vec<_>>(),
            )
            .field("engine", &self.engine)
            .field("started", &self.started.load(Ordering::Relaxed))
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("tasks", &"<Mutex<Vec<JoinHandle<()>>>>")
            .finish()
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Best-effort cancellation. Do not block in Drop.
        self.cancel.cancel();
    }
}

impl PemKeyStore {
    /// Creates a builder for configuring a [`PemKeyStore`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pem_keystore::PemKeyStore;
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = PemKeyStore::builder()
    ///     .alias("server", ["/etc/tls/chain.pem", "/etc/tls/key.pem"])
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> PemKeyStoreBuilder {
        PemKeyStoreBuilder::new()
    }

    /// Returns which provider variant this store is.
    pub fn kind(&self) -> ProviderKind {
        self.inner.kind
    }

    /// Arms the reload timers.
    ///
    /// Only [`ProviderKind::Reloadable`] stores poll; for a static store this is a
    /// no-op. Aliases whose refresh interval is zero are never polled. Calling
    /// `start` more than once has no additional effect. The first tick of each
    /// alias fires one full interval after this call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] after shutdown, and [`Error::NoRuntime`] if called
    /// outside a Tokio runtime.
    pub fn start(&self) -> Result<()> {
        self.assert_open()?;

        if self.inner.kind == ProviderKind::Static {
            debug!("Static key store; no reload tasks to start");
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let mut tasks = self.lock_tasks();
        for slot in &self.inner.slots {
            let Some(period) = slot.entry().refresh_interval() else {
                continue;
            };
            let handle = runtime.spawn(run_reload_task(
                Arc::clone(&self.inner.engine),
                Arc::clone(slot),
                period,
                self.inner.cancel.clone(),
            ));
            tasks.push((slot.alias().to_string(), handle));
        }

        info!(
            "Key store started: provider={}, aliases={}, reload_tasks={}",
            self.inner.kind,
            self.inner.slots.len(),
            tasks.len()
        );
        Ok(())
    }

    /// Re-stats the alias' files now and publishes a new bundle if they changed.
    ///
    /// Waits for any in-flight reload of the alias and performs blocking file
    /// I/O; call it from a blocking context when inside an async runtime.
    /// Returns `true` if a new bundle was published.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unregistered alias, [`Error::Closed`]
    /// after shutdown, and the read or parse error if the reload failed. The
    /// previous bundle stays published on failure.
    pub fn reload(&self, alias: &str) -> Result<bool> {
        self.assert_open()?;
        let slot = self.slot(alias).ok_or_else(|| Error::NotFound {
            alias: alias.to_string(),
        })?;
        let outcome = self.inner.engine.reload(slot, Trigger::OnDemand)?;
        Ok(outcome == ReloadOutcome::Published)
    }

    /// Runs [`PemKeyStore::reload`] for every alias in registration order.
    ///
    /// Every alias is attempted even if an earlier one fails. Returns the number
    /// of aliases that published a new bundle.
    ///
    /// # Errors
    ///
    /// Returns the first failure encountered.
    pub fn reload_all(&self) -> Result<usize> {
        self.assert_open()?;
        let mut published = 0;
        let mut first_err = None;

        for slot in &self.inner.slots {
            match self.inner.engine.reload(slot, Trigger::OnDemand) {
                Ok(ReloadOutcome::Published) => published += 1,
                Ok(_) => {}
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(published),
        }
    }

    /// Returns a handle for receiving reload notifications.
    ///
    /// The initial sequence number is 0.
    pub fn updated(&self) -> KeyStoreUpdates {
        KeyStoreUpdates {
            rx: self.inner.engine.subscribe(),
        }
    }

    /// Returns `true` if the store is open, every alias has a published bundle,
    /// and every started reload task is still running.
    ///
    /// This is a best-effort check for monitoring.
    pub fn is_healthy(&self) -> bool {
        if self.inner.closed.load(Ordering::Acquire) || self.inner.cancel.is_cancelled() {
            return false;
        }
        // Reload tasks only return once cancelled.
        let tasks_alive = self
            .lock_tasks()
            .iter()
            .all(|(_, handle)| !handle.is_finished());
        tasks_alive && self.inner.slots.iter().all(|s| s.current().is_some())
    }

    /// Stops the reload tasks and waits for them to finish.
    ///
    /// Published bundles stay readable afterwards; they just stop changing.
    /// Idempotent.
    ///
    /// **Note:** This may wait as long as an in-flight file read takes. Prefer
    /// [`PemKeyStore::shutdown_with_timeout`] when a bound is needed.
    pub async fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.cancel.cancel();

        let tasks = std::mem::take(&mut *self.lock_tasks());
        for (alias, handle) in tasks {
            if let Err(e) = handle.await {
                warn!(
                    "Error joining reload task during shutdown: alias={}, error={}",
                    alias,
                    e
                );
                self.inner
                    .engine
                    .record_error(&alias, MetricsErrorKind::TaskJoinFailed);
            }
        }
        info!("Key store shut down");
    }

    /// Stops the reload tasks, aborting any still running after `timeout`.
    ///
    /// Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShutdownTimeout`] if the tasks had to be aborted.
    pub async fn shutdown_with_timeout(&self, timeout: Duration) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.cancel.cancel();

        let mut tasks = std::mem::take(&mut *self.lock_tasks());
        if tasks.is_empty() {
            return Ok(());
        }

        let engine = &self.inner.engine;
        let join_all = async {
            for (alias, handle) in &mut tasks {
                if let Err(e) = handle.await {
                    warn!(
                        "Error joining reload task during shutdown: alias={}, error={}",
                        alias,
                        e
                    );
                    engine.record_error(alias, MetricsErrorKind::TaskJoinFailed);
                }
            }
        };

        if tokio::time::timeout(timeout, join_all).await.is_ok() {
            return Ok(());
        }

        warn!("Shutdown timeout exceeded; aborting reload tasks");
        for (_, handle) in tasks {
            if !handle.is_finished() {
                handle.abort();
                let _ = handle.await;
            }
        }
        Err(Error::ShutdownTimeout)
    }

    /// Stops the reload tasks using the timeout configured on the builder, or
    /// waits indefinitely if none was set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShutdownTimeout`] if the configured timeout is exceeded.
    pub async fn shutdown_configured(&self) -> Result<()> {
        if let Some(timeout) = self.inner.shutdown_timeout {
            self.shutdown_with_timeout(timeout).await
        } else {
            self.shutdown().await;
            Ok(())
        }
    }
}

impl PemKeyStore {
    pub(super) fn build_with(
        kind: ProviderKind,
        registry: AliasRegistry,
        fs: Arc<dyn FileSystem>,
        metrics: Option<Arc<dyn MetricsRecorder>>,
        shutdown_timeout: Option<Duration>,
    ) -> Result<Self> {
        let engine = Arc::new(Engine::new(fs, metrics));

        let mut slots = Vec::with_capacity(registry.len());
        let mut index = HashMap::with_capacity(registry.len());
        for entry in registry {
            let slot = AliasSlot::new(entry);
            engine.reload(&slot, Trigger::Initial)?;
            index.insert(slot.alias().to_string(), slots.len());
            slots.push(Arc::new(slot));
        }

        debug!(
            "Key store built: provider={}, aliases={}",
            kind,
            slots.len()
        );

        Ok(Self {
            inner: Arc::new(Inner {
                kind,
                slots,
                index,
                engine,
                started: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                shutdown_timeout,
                tasks: Mutex::new(Vec::new()),
            }),
        })
    }

    fn slot(&self, alias: &str) -> Option<&AliasSlot> {
        self.inner
            .index
            .get(alias)
            .map(|&i| self.inner.slots[i].as_ref())
    }

    /// Returns the bundle currently published for `alias`.
    pub(crate) fn published(&self, alias: &str) -> Option<Arc<PemBundle>> {
        self.slot(alias).and_then(AliasSlot::current)
    }

    /// Iterates aliases in registration order with their published bundles.
    pub(crate) fn published_in_order(&self) -> impl Iterator<Item = (&str, Arc<PemBundle>)> + '_ {
        self.inner
            .slots
            .iter()
            .filter_map(|slot| slot.current().map(|bundle| (slot.alias(), bundle)))
    }

    pub(crate) fn alias_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.inner.slots.iter().map(|slot| slot.alias())
    }

    pub(crate) fn has_alias(&self, alias: &str) -> bool {
        self.inner.index.contains_key(alias)
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<(String, JoinHandle<()>)>> {
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn assert_open(&self) -> Result<()> {
        if self.inner.closed.load(Ordering::Acquire) || self.inner.cancel.is_cancelled() {
            return Err(Error::Closed);
        }
        Ok(())
    }
}
