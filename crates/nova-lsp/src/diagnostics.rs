//! `DiagnosticsManager`: pending-file tracking plus a debounced lint cycle.
//!
//! Built directly on [`nova_scheduler::KeyedDebouncer`] — the exact pattern
//! it documents itself for ("coalesce rapid-fire `didChange` notifications
//! for the same file before kicking off diagnostics"), keyed under a single
//! fixed key so repeated `scheduleLint` calls collapse into one run.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use nova_core::{Diagnostic, FileUri, Severity};
use nova_scheduler::{KeyedDebouncer, PoolKind, Scheduler};

const DEBOUNCE_KEY: &str = "diagnostics";

/// Invoked once a debounced (or immediate) lint cycle actually runs. Returns
/// diagnostics for whatever subset of `pending` it could lint; entries
/// missing from the result map are treated as "no diagnostics".
pub trait LintAction: Send + Sync {
    fn lint(&self, pending: &HashSet<FileUri>) -> BTreeMap<FileUri, Vec<Diagnostic>>;
}

impl<F> LintAction for F
where
    F: Fn(&HashSet<FileUri>) -> BTreeMap<FileUri, Vec<Diagnostic>> + Send + Sync,
{
    fn lint(&self, pending: &HashSet<FileUri>) -> BTreeMap<FileUri, Vec<Diagnostic>> {
        self(pending)
    }
}

/// The LSP transport side of publication; kept as a trait so this module
/// doesn't need to know about `lsp-server`/stdio at all.
pub trait DiagnosticsClient: Send + Sync {
    fn publish_diagnostics(&self, uri: &FileUri, diagnostics: Vec<Diagnostic>);
}

fn severity_at_least(severity: Severity, floor: Severity) -> bool {
    fn rank(s: Severity) -> u8 {
        match s {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
            Severity::Hint => 3,
        }
    }
    rank(severity) <= rank(floor)
}

struct Inner {
    pending: Mutex<HashSet<FileUri>>,
    scheduler: Scheduler,
    debouncer: Mutex<Arc<KeyedDebouncer>>,
    delay: Mutex<Duration>,
    client: RwLock<Option<Arc<dyn DiagnosticsClient>>>,
    action: RwLock<Option<Arc<dyn LintAction>>>,
    is_classpath_ready: Arc<dyn Fn() -> bool + Send + Sync>,
    is_file_open: Arc<dyn Fn(&FileUri) -> bool + Send + Sync>,
    level: RwLock<Severity>,
}

/// `spec.md` §4.I, exactly: pending set + debouncer + lint action, gated on
/// classpath readiness so degraded mode never produces false errors.
#[derive(Clone)]
pub struct DiagnosticsManager {
    inner: Arc<Inner>,
}

impl DiagnosticsManager {
    pub fn new(
        scheduler: Scheduler,
        debounce_time: Duration,
        is_classpath_ready: Arc<dyn Fn() -> bool + Send + Sync>,
        is_file_open: Arc<dyn Fn(&FileUri) -> bool + Send + Sync>,
    ) -> Self {
        let debouncer = Arc::new(KeyedDebouncer::new(scheduler.clone(), PoolKind::Compute, debounce_time));
        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(HashSet::new()),
                scheduler,
                debouncer: Mutex::new(debouncer),
                delay: Mutex::new(debounce_time),
                client: RwLock::new(None),
                action: RwLock::new(None),
                is_classpath_ready,
                is_file_open,
                level: RwLock::new(Severity::Hint),
            }),
        }
    }

    pub fn connect(&self, client: Arc<dyn DiagnosticsClient>) {
        *self.inner.client.write() = Some(client);
    }

    pub fn set_lint_action(&self, action: Arc<dyn LintAction>) {
        *self.inner.action.write() = Some(action);
    }

    pub fn set_level(&self, level: Severity) {
        *self.inner.level.write() = level;
    }

    /// Swaps the debouncer for one with a new delay; any job already
    /// in-flight on the old debouncer keeps running to completion.
    pub fn update_debounce_time(&self, debounce_time: Duration) {
        *self.inner.delay.lock() = debounce_time;
        let fresh = KeyedDebouncer::new(self.inner.scheduler.clone(), PoolKind::Compute, debounce_time);
        *self.inner.debouncer.lock() = Arc::new(fresh);
    }

    pub fn schedule_lint(&self, uri: FileUri) {
        self.inner.pending.lock().insert(uri);
        let inner = self.inner.clone();
        let debouncer = self.inner.debouncer.lock().clone();
        debouncer.debounce(DEBOUNCE_KEY, move |token: CancellationToken| {
            run_lint_cycle(&inner, &token);
            Ok::<(), std::convert::Infallible>(())
        });
    }

    /// Insert and lint right away, bypassing the debounce delay entirely
    /// (used e.g. after the classpath transitions to READY, to lint every
    /// currently-open file without waiting out a debounce window).
    pub fn lint_immediately(&self, uri: FileUri) {
        self.inner.pending.lock().insert(uri);
        let inner = self.inner.clone();
        let token = CancellationToken::new();
        self.inner
            .scheduler
            .spawn_compute_with_token(token.clone(), move |token| {
                run_lint_cycle(&inner, &token);
            });
    }

    /// Atomic drain-and-return of the pending set.
    pub fn clear_pending(&self) -> HashSet<FileUri> {
        std::mem::take(&mut *self.inner.pending.lock())
    }
}

fn run_lint_cycle(inner: &Inner, cancel: &CancellationToken) {
    if cancel.is_cancelled() || !(inner.is_classpath_ready)() {
        return;
    }

    let pending = std::mem::take(&mut *inner.pending.lock());
    if pending.is_empty() {
        return;
    }

    let Some(action) = inner.action.read().clone() else {
        return;
    };
    let diagnostics = action.lint(&pending);

    // `cancelCallback`: a concurrent close/cancel observed while linting ran
    // short-circuits publication entirely.
    if cancel.is_cancelled() {
        return;
    }
    let Some(client) = inner.client.read().clone() else {
        return;
    };

    let level = *inner.level.read();
    for uri in &pending {
        if !(inner.is_file_open)(uri) {
            continue;
        }
        let filtered: Vec<Diagnostic> = diagnostics
            .get(uri)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|d| severity_at_least(d.severity, level))
            .collect();
        client.publish_diagnostics(uri, filtered);
    }
}
