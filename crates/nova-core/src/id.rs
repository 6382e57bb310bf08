//! Strongly-typed IDs used across Nova.
//!
//! Kept as a separate module for backwards compatibility; the canonical
//! definitions live in `nova-ids`.

pub use nova_ids::*;

/// Identifies an in-flight LSP request, for `$/cancelRequest` plumbing.
///
/// LSP request ids are `integer | string` on the wire; callers that need the
/// string form (the `lsp-server`/`lsp-types` façade) convert at that
/// boundary. Internally Nova only needs equality and hashing to track which
/// request a cancellation token belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(i64);

impl RequestId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn to_raw(&self) -> i64 {
        self.0
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
