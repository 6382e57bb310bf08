//! Per-request cancellation bookkeeping.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use nova_core::RequestId;

pub(crate) struct RequestTable {
    tokens: Mutex<HashMap<RequestId, CancellationToken>>,
}

impl RequestTable {
    pub(crate) fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn register(&self, id: RequestId) -> CancellationToken {
        let token = CancellationToken::new();
        self.tokens.lock().insert(id, token.clone());
        token
    }

    pub(crate) fn cancel(&self, id: &RequestId) {
        if let Some(token) = self.tokens.lock().get(id) {
            token.cancel();
        }
    }

    pub(crate) fn finish(&self, id: &RequestId) {
        self.tokens.lock().remove(id);
    }
}

/// A task observed its cancellation token firing and gave up cooperatively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("operation was cancelled")
    }
}

impl std::error::Error for Cancelled {}
