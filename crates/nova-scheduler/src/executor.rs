//! Per-kind serial executors backing [`crate::Scheduler::submit`].

use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::Mutex;

pub const SHUTDOWN_TIMEOUT_SECONDS: u64 = 30;

type Job = Box<dyn FnOnce() + Send>;

/// Request/response LSP operations that must preserve per-client ordering
/// within themselves, but can run independently of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Definition,
    Hover,
    Completion,
    References,
}

impl OperationKind {
    pub(crate) const COUNT: usize = 4;
    const ALL: [OperationKind; Self::COUNT] = [
        OperationKind::Definition,
        OperationKind::Hover,
        OperationKind::Completion,
        OperationKind::References,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            OperationKind::Definition => 0,
            OperationKind::Hover => 1,
            OperationKind::Completion => 2,
            OperationKind::References => 3,
        }
    }

    fn thread_name(self) -> &'static str {
        match self {
            OperationKind::Definition => "kls-definition",
            OperationKind::Hover => "kls-hover",
            OperationKind::Completion => "kls-completion",
            OperationKind::References => "kls-references",
        }
    }
}

/// A single named worker thread draining an unbounded job queue in FIFO
/// order. One of these backs each [`OperationKind`].
pub(crate) struct OperationExecutor {
    sender: Mutex<Option<Sender<Job>>>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl OperationExecutor {
    fn spawn(kind: OperationKind) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let handle = std::thread::Builder::new()
            .name(kind.thread_name().to_string())
            .spawn(move || {
                for job in receiver {
                    job();
                }
            })
            .expect("failed to spawn operation executor thread");

        Self {
            sender: Mutex::new(Some(sender)),
            handle: Some(handle),
        }
    }

    pub(crate) fn submit(&self, job: Job) {
        if let Some(sender) = self.sender.lock().as_ref() {
            // A send error means the worker thread has already exited
            // (e.g. mid-shutdown); dropping the job is the right response,
            // there's nowhere left to run it.
            let _ = sender.send(job);
        }
    }

    /// Close the input queue and join the worker, waiting up to
    /// [`SHUTDOWN_TIMEOUT_SECONDS`] for already-queued jobs to drain before
    /// giving up and detaching the thread.
    pub(crate) fn close(&self) {
        // Dropping the sender makes the worker's `for job in receiver` loop
        // exit once the queue is empty.
        self.sender.lock().take();

        if let Some(handle) = &self.handle {
            if handle.is_finished() {
                return;
            }
            // std::thread::JoinHandle has no timed join; poll is_finished
            // instead of blocking the caller indefinitely on a stuck worker.
            let deadline = std::time::Instant::now() + Duration::from_secs(SHUTDOWN_TIMEOUT_SECONDS);
            while std::time::Instant::now() < deadline {
                if handle.is_finished() {
                    return;
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            tracing::warn!(thread = %handle.thread().name().unwrap_or("?"), "executor did not shut down within timeout, detaching");
        }
    }
}

impl OperationKind {
    pub(crate) fn spawn_all() -> [OperationExecutor; OperationKind::COUNT] {
        Self::ALL.map(OperationExecutor::spawn)
    }
}
