use super::failures::{FailureLog, Severity};
use super::metrics::{MetricsErrorKind, MetricsRecorder};
use crate::config::AliasEntry;
use crate::error::{Error, SourceReadError};
use crate::pem::{parse_bundle, KeyPairStatus, PemBundle};
use crate::prelude::{debug, info, warn};
use crate::source::{FileSystem, MultiFileSource};
use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// A bundle together with the modification times observed when it was read.
///
/// Both are swapped in one store so readers never see a bundle paired with
/// another bundle's change-detection state.
#[derive(Debug)]
pub(super) struct Published {
    pub(super) bundle: Arc<PemBundle>,
    pub(super) mtimes: Vec<SystemTime>,
}

/// Per-alias state: immutable registration, published snapshot, writer lock.
#[derive(Debug)]
pub(super) struct AliasSlot {
    entry: AliasEntry,
    published: ArcSwapOption<Published>,
    // Held for the whole stat/read/parse/publish step.
    writer: Mutex<FailureLog>,
}

impl AliasSlot {
    pub(super) fn new(entry: AliasEntry) -> Self {
        Self {
            entry,
            published: ArcSwapOption::empty(),
            writer: Mutex::new(FailureLog::default()),
        }
    }

    pub(super) fn entry(&self) -> &AliasEntry {
        &self.entry
    }

    pub(super) fn alias(&self) -> &str {
        self.entry.alias()
    }

    /// Returns the currently published bundle.
    pub(super) fn current(&self) -> Option<Arc<PemBundle>> {
        self.published
            .load_full()
            .map(|p| Arc::clone(&p.bundle))
    }
}

/// What started a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Trigger {
    /// Registration-time parse.
    Initial,
    /// Periodic timer tick.
    Timer,
    /// Explicit request from the host.
    OnDemand,
}

/// Result of one reload step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ReloadOutcome {
    /// A new bundle was published.
    Published,
    /// Modification times matched the published snapshot; nothing was read.
    Unchanged,
    /// Another reload held the writer lock; the tick was dropped.
    Skipped,
}

/// Reload machinery shared by the key store and its background tasks.
pub(super) struct Engine {
    fs: Arc<dyn FileSystem>,
    metrics: Option<Arc<dyn MetricsRecorder>>,
    update_seq: AtomicU64,
    update_tx: watch::Sender<u64>,
    update_rx: watch::Receiver<u64>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("fs", &self.fs)
            .field(
                "metrics",
                &self.metrics.as_ref().map(|_| "<MetricsRecorder>"),
            )
            .field("update_seq", &self.update_seq)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub(super) fn new(
        fs: Arc<dyn FileSystem>,
        metrics: Option<Arc<dyn MetricsRecorder>>,
    ) -> Self {
        let (update_tx, update_rx) = watch::channel(0u64);
        Self {
            fs,
            metrics,
            update_seq: AtomicU64::new(0),
            update_tx,
            update_rx,
        }
    }

    pub(super) fn subscribe(&self) -> watch::Receiver<u64> {
        self.update_rx.clone()
    }

    /// Runs one stat/compare/read/parse/publish step for `slot`.
    ///
    /// Timer ticks give up immediately if another reload of the alias is in
    /// progress; other triggers wait for it. On failure the published bundle
    /// and its modification times are left untouched, so the next tick retries.
    pub(super) fn reload(
        &self,
        slot: &AliasSlot,
        trigger: Trigger,
    ) -> Result<ReloadOutcome, Error> {
        let mut failures = match trigger {
            Trigger::Timer => match slot.writer.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::WouldBlock) => {
                    debug!(
                        "Reload already in progress; skipping tick: alias={}",
                        slot.alias()
                    );
                    self.record_error(slot.alias(), MetricsErrorKind::ReloadSkippedOverlap);
                    return Ok(ReloadOutcome::Skipped);
                }
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            },
            Trigger::Initial | Trigger::OnDemand => {
                slot.writer.lock().unwrap_or_else(PoisonError::into_inner)
            }
        };

        let outcome = match refresh(slot, self.fs.as_ref()) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.report_failure(slot, &mut failures, &e, trigger);
                return Err(e);
            }
        };

        if let Some(failed) = failures.recover() {
            info!(
                "Reload recovered after {} failure(s): alias={}",
                failed,
                slot.alias()
            );
        }

        match outcome {
            ReloadOutcome::Published if trigger == Trigger::Initial => {
                debug!("Registered alias: alias={}", slot.alias());
            }
            ReloadOutcome::Published => {
                info!("Published reloaded credentials: alias={}", slot.alias());
                self.record_reload(slot.alias());
                self.notify_update();
            }
            ReloadOutcome::Unchanged | ReloadOutcome::Skipped => {
                if let Some(metrics) = self.metrics.as_deref() {
                    metrics.record_unchanged(slot.alias());
                }
            }
        }
        Ok(outcome)
    }

    fn report_failure(
        &self,
        slot: &AliasSlot,
        failures: &mut FailureLog,
        err: &Error,
        trigger: Trigger,
    ) {
        let kind = match err {
            Error::SourceRead(SourceReadError::Stat { .. }) => MetricsErrorKind::Stat,
            Error::SourceRead(_) => MetricsErrorKind::SourceRead,
            Error::KeyMismatch { .. } => MetricsErrorKind::KeyMismatch,
            _ => MetricsErrorKind::Parse,
        };
        self.record_error(slot.alias(), kind);

        let paths = describe_paths(slot.entry.source());

        match failures.note(kind) {
            Severity::Loud => warn!(
                "Reload failed; keeping previous credentials: alias={}, paths=[{}], trigger={:?}, error={}",
                slot.alias(),
                paths,
                trigger,
                err
            ),
            Severity::Quiet => debug!(
                "Reload failed; keeping previous credentials: alias={}, paths=[{}], trigger={:?}, error={}, repeats={}, failures_since_healthy={}",
                slot.alias(),
                paths,
                trigger,
                err,
                failures.repeats(),
                failures.since_healthy()
            ),
        }
    }

    pub(super) fn record_error(&self, alias: &str, kind: MetricsErrorKind) {
        if let Some(metrics) = self.metrics.as_deref() {
            metrics.record_error(alias, kind);
        }
    }

    fn record_reload(&self, alias: &str) {
        if let Some(metrics) = self.metrics.as_deref() {
            metrics.record_reload(alias);
        }
    }

    fn notify_update(&self) {
        let next = self.update_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let _ = self.update_tx.send(next);
    }
}

/// Every configured path of a source, comma separated, for failure records.
fn describe_paths(source: &MultiFileSource) -> String {
    source
        .paths()
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Stats the sources and, if any modification time moved, re-reads, parses,
/// and publishes. Must be called with the slot's writer lock held.
fn refresh(slot: &AliasSlot, fs: &dyn FileSystem) -> Result<ReloadOutcome, Error> {
    let source = slot.entry.source();
    let mtimes = source.modified_times(fs)?;

    if let Some(current) = &*slot.published.load() {
        if current.mtimes == mtimes {
            return Ok(ReloadOutcome::Unchanged);
        }
    }

    let bytes = source.read_with(fs)?;
    let bundle = parse_bundle(&bytes)?;

    // A chain and key rewritten one after the other can be caught half way.
    if bundle.key_pair_status() == KeyPairStatus::Mismatched {
        return Err(Error::KeyMismatch {
            leaf_subject: bundle
                .leaf_certificate()
                .and_then(|leaf| leaf.subject().ok())
                .unwrap_or_default(),
        });
    }

    slot.published.store(Some(Arc::new(Published {
        bundle: Arc::new(bundle),
        mtimes,
    })));
    Ok(ReloadOutcome::Published)
}

const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Polls one alias every `period` until `token` is cancelled.
///
/// The first tick fires one full period after start. Blocking file work runs on
/// the blocking pool; ticks missed while it runs are skipped, not queued.
pub(super) async fn run_reload_task(
    engine: Arc<Engine>,
    slot: Arc<AliasSlot>,
    period: Duration,
    token: CancellationToken,
) {
    // Intervals are bounded by configuration; the fallback only guards the clock.
    let start = Instant::now()
        .checked_add(period)
        .unwrap_or_else(|| Instant::now() + FAR_FUTURE);
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    debug!(
        "Starting reload task: alias={}, interval_secs={}",
        slot.alias(),
        period.as_secs()
    );

    loop {
        tokio::select! {
            () = token.cancelled() => {
                debug!("Reload task cancelled: alias={}", slot.alias());
                return;
            }
            _ = ticker.tick() => {}
        }

        let step_engine = Arc::clone(&engine);
        let step_slot = Arc::clone(&slot);
        let step = tokio::task::spawn_blocking(move || {
            // Failures are logged and counted inside `reload`.
            let _ = step_engine.reload(&step_slot, Trigger::Timer);
        });

        if let Err(e) = step.await {
            warn!(
                "Reload step did not complete: alias={}, error={}",
                slot.alias(),
                e
            );
            engine.record_error(slot.alias(), MetricsErrorKind::TaskJoinFailed);
        }
    }
}
