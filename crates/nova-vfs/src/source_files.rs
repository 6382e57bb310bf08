//! `SourceFiles`: tracks which URIs are currently open in the editor and
//! their editor-reported versions.

use std::sync::RwLock;

use hashbrown::HashMap;
use nova_core::FileUri;

/// Open-in-editor tracking, used to gate the `didChange` ordering guarantee
/// (`spec.md` §5): a notification for a version that isn't strictly newer
/// than the last-recorded one is stale and must be ignored by the caller.
#[derive(Default)]
pub struct SourceFiles {
    open: RwLock<HashMap<FileUri, i32>>,
}

impl SourceFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `uri` as open at `version` (LSP `didOpen`). Always accepted:
    /// re-opening an already-open URI simply resets its tracked version.
    pub fn open(&self, uri: FileUri, version: i32) {
        self.open.write().unwrap().insert(uri, version);
    }

    /// Record `uri` as closed (LSP `didClose`).
    pub fn close(&self, uri: &FileUri) {
        self.open.write().unwrap().remove(uri);
    }

    pub fn is_open(&self, uri: &FileUri) -> bool {
        self.open.read().unwrap().contains_key(uri.as_str())
    }

    pub fn version(&self, uri: &FileUri) -> Option<i32> {
        self.open.read().unwrap().get(uri.as_str()).copied()
    }

    /// Advance `uri`'s tracked version to `version` (LSP `didChange`).
    ///
    /// Returns `false` without mutating state if `version` is not strictly
    /// newer than the currently-tracked version (or the file isn't open) —
    /// callers must treat that as an out-of-order notification and drop it.
    pub fn record_change(&self, uri: &FileUri, version: i32) -> bool {
        let mut open = self.open.write().unwrap();
        match open.get_mut(uri.as_str()) {
            Some(current) if version > *current => {
                *current = version;
                true
            }
            _ => false,
        }
    }

    pub fn open_uris(&self) -> Vec<FileUri> {
        self.open.read().unwrap().keys().cloned().collect()
    }
}
