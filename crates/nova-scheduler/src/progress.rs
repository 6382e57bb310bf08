//! LSP `$/progress`-shaped notifications, decoupled from any particular
//! transport: `nova-lsp` subscribes and forwards these as
//! `window/workDoneProgress` notifications.

use std::sync::atomic::{AtomicU64, AtomicBool, Ordering};

use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgressId(pub(crate) u64);

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Begin { id: ProgressId, title: String },
    Report {
        id: ProgressId,
        message: Option<String>,
        percentage: Option<u32>,
    },
    End { id: ProgressId, message: Option<String> },
}

pub(crate) struct ProgressInner {
    sender: broadcast::Sender<ProgressEvent>,
}

impl ProgressInner {
    pub(crate) fn new(sender: broadcast::Sender<ProgressEvent>) -> Self {
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    fn emit(&self, event: ProgressEvent) {
        // No subscribers is the common case outside of tests (the real LSP
        // client subscribes lazily); a send error there is not a bug.
        let _ = self.sender.send(event);
    }
}

/// Handle to a single in-progress long-running operation
/// (`window/workDoneProgress/create`-shaped). Reports an `End` event on
/// drop if [`finish`](Self::finish) was never called.
pub struct Progress<'a> {
    inner: &'a ProgressInner,
    id: ProgressId,
}

impl<'a> Progress<'a> {
    pub(crate) fn new(inner: &'a ProgressInner, counter: &AtomicU64) -> Self {
        Self {
            inner,
            id: crate::next_progress_id(counter),
        }
    }

    /// Begin a new titled progress stream, returning a handle that reports
    /// `Report`/`End` events tagged with the same id.
    pub fn start(self, title: impl Into<String>) -> ProgressHandle<'a> {
        self.inner.emit(ProgressEvent::Begin {
            id: self.id,
            title: title.into(),
        });
        ProgressHandle {
            inner: self.inner,
            id: self.id,
            finished: AtomicBool::new(false),
        }
    }
}

pub struct ProgressHandle<'a> {
    inner: &'a ProgressInner,
    id: ProgressId,
    finished: AtomicBool,
}

impl ProgressHandle<'_> {
    pub fn report(&self, message: Option<String>, percentage: Option<u32>) {
        self.inner.emit(ProgressEvent::Report {
            id: self.id,
            message,
            percentage,
        });
    }

    pub fn finish(&self, message: Option<String>) {
        self.finished.store(true, Ordering::SeqCst);
        self.inner.emit(ProgressEvent::End {
            id: self.id,
            message,
        });
    }
}

impl Drop for ProgressHandle<'_> {
    fn drop(&mut self) {
        if !self.finished.swap(true, Ordering::SeqCst) {
            self.inner.emit(ProgressEvent::End {
                id: self.id,
                message: None,
            });
        }
    }
}
