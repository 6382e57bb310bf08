//! `LspExecutorPool`: per-operation-kind serial executors plus a general
//! background pool, request cancellation, debouncing, and progress
//! reporting.
//!
//! Four named single-worker executors (one per [`OperationKind`]) preserve
//! per-kind request ordering for request/response LSP operations
//! (`textDocument/definition`, `/hover`, `/completion`, `/references`), while
//! a general pool (blocking via `rayon`, async via `tokio`) absorbs
//! background work that doesn't need to preserve a strict per-client-request
//! order: classpath resolution, indexing, and debounced diagnostics.

mod debounce;
mod executor;
mod progress;
mod request;

pub use debounce::KeyedDebouncer;
pub use executor::{OperationKind, SHUTDOWN_TIMEOUT_SECONDS};
pub use progress::{Progress, ProgressEvent, ProgressId};
pub use request::Cancelled;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use nova_core::RequestId;

use executor::OperationExecutor;
use progress::ProgressInner;
use request::RequestTable;

/// Which general-pool lane a unit of background work runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    /// CPU-bound work, run on the `rayon` thread pool.
    Compute,
    /// Work that's mostly waiting (process I/O, future build-tool RPCs), run
    /// as a `tokio` task.
    Io,
}

const PROGRESS_BROADCAST_CAPACITY: usize = 256;

struct Inner {
    operations: [OperationExecutor; OperationKind::COUNT],
    compute_pool: rayon::ThreadPool,
    requests: RequestTable,
    progress: ProgressInner,
    progress_counter: AtomicU64,
}

/// Central scheduling façade handed to every long-running or per-request
/// piece of work in the server.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Default for Scheduler {
    fn default() -> Self {
        let compute_pool = rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("kls-compute-{i}"))
            .build()
            .expect("failed to build compute thread pool");
        let (progress_tx, _rx) = broadcast::channel(PROGRESS_BROADCAST_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                operations: OperationKind::spawn_all(),
                compute_pool,
                requests: RequestTable::new(),
                progress: ProgressInner::new(progress_tx),
                progress_counter: AtomicU64::new(0),
            }),
        }
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit `task` to the named serial executor for `kind`, preserving
    /// per-kind ordering relative to other submissions of the same kind.
    pub fn submit(&self, kind: OperationKind, task: impl FnOnce() + Send + 'static) {
        self.inner.operations[kind.index()].submit(Box::new(task));
    }

    /// Register a new in-flight client request, returning the token its
    /// background work should observe for cooperative cancellation.
    pub fn register_request(&self, id: RequestId) -> CancellationToken {
        self.inner.requests.register(id)
    }

    /// Cancel the request registered under `id`, if still in flight.
    pub fn cancel_request(&self, id: &RequestId) {
        self.inner.requests.cancel(id);
    }

    /// Drop bookkeeping for a request once its response has been sent.
    pub fn finish_request(&self, id: &RequestId) {
        self.inner.requests.finish(id);
    }

    /// Run `task` on the compute (blocking, CPU-bound) pool.
    pub fn spawn_compute_with_token<T, F>(&self, token: CancellationToken, task: F) -> Task<T>
    where
        T: Send + 'static,
        F: FnOnce(CancellationToken) -> T + Send + 'static,
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.inner.compute_pool.spawn(move || {
            let result = task(token);
            let _ = tx.send(result);
        });
        Task::Blocking(rx)
    }

    /// Run `task` on the async (`tokio`) pool.
    pub fn spawn_io_with_token<T, F, Fut>(&self, token: CancellationToken, task: F) -> Task<T>
    where
        T: Send + 'static,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = T> + Send + 'static,
    {
        let handle = tokio::spawn(task(token));
        Task::Async(handle)
    }

    /// Emit progress notifications; see [`Progress`].
    pub fn progress(&self) -> Progress<'_> {
        Progress::new(&self.inner.progress, &self.inner.progress_counter)
    }

    pub fn subscribe_progress(&self) -> broadcast::Receiver<ProgressEvent> {
        self.inner.progress.subscribe()
    }

    /// Drain and join every per-kind executor, waiting up to
    /// [`SHUTDOWN_TIMEOUT_SECONDS`] before giving up and detaching.
    pub fn close(&self) {
        for executor in &self.inner.operations {
            executor.close();
        }
    }
}

/// A handle to a unit of work spawned on the general pool.
///
/// `join` resolves to the task's own return value directly: a panic inside
/// the task is a bug in the task, not something callers need to match on
/// separately from a cancellation-driven `Err`.
pub enum Task<T> {
    Blocking(tokio::sync::oneshot::Receiver<T>),
    Async(tokio::task::JoinHandle<T>),
}

impl<T: Send + 'static> Task<T> {
    pub async fn join(self) -> T {
        match self {
            Task::Blocking(rx) => rx.await.expect("compute task dropped its result sender"),
            Task::Async(handle) => handle.await.expect("io task panicked"),
        }
    }
}

fn next_progress_id(counter: &AtomicU64) -> ProgressId {
    ProgressId(counter.fetch_add(1, Ordering::Relaxed))
}
