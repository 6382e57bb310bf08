//! Thin enabled/disabled gate in front of [`SymbolIndex`]. When indexing is
//! disabled (`kotlin.languageServer.indexing.enabled: false`), every method
//! here is a no-op rather than touching `nova-storage` at all, so callers
//! don't need to sprinkle `if enabled` checks through `nova-lsp`.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nova_core::ModuleId;
use nova_modules::Symbol;
use nova_storage::DatabaseError;

use crate::scanner::{JarScanner, WorkspaceScanner};
use crate::symbol_index::SymbolIndex;

pub struct IndexingService {
    index: Arc<SymbolIndex>,
    enabled: AtomicBool,
}

impl IndexingService {
    pub fn new(index: Arc<SymbolIndex>, enabled: bool) -> Self {
        Self {
            index,
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// `didChangeConfiguration` toggling `indexing.enabled`. Turning indexing
    /// off cancels any in-flight refresh; it does not clear already-indexed
    /// symbols.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.index.cancel_current_refresh();
        }
    }

    pub fn symbol_index(&self) -> &Arc<SymbolIndex> {
        &self.index
    }

    #[allow(clippy::too_many_arguments)]
    pub fn refresh(
        &self,
        module: ModuleId,
        exclusions: HashSet<String>,
        build_file_version: i64,
        skip_if_valid: bool,
        batch_size: Option<usize>,
        scanner: Arc<dyn WorkspaceScanner>,
    ) {
        if !self.is_enabled() {
            return;
        }
        self.index.refresh(module, exclusions, build_file_version, skip_if_valid, batch_size, scanner);
    }

    pub fn index_jars(
        &self,
        jars: &[PathBuf],
        module: &ModuleId,
        package_to_jars: &std::collections::HashMap<String, Vec<PathBuf>>,
        scanner: &dyn JarScanner,
        cancellation: &AtomicBool,
    ) -> Result<(), DatabaseError> {
        if !self.is_enabled() {
            return Ok(());
        }
        self.index.index_jars(jars, module, package_to_jars, scanner, cancellation)
    }

    pub fn remove_symbols_from_jars(&self, jars: &[PathBuf]) -> Result<usize, DatabaseError> {
        if !self.is_enabled() {
            return Ok(0);
        }
        self.index.remove_symbols_from_jars(jars)
    }

    /// Applies a file's declaration delta. Callers (`nova-lsp`'s `Server`)
    /// must only compute `nova_vfs::IndexDelta::resolve()` when
    /// [`Self::is_enabled`] is true, since resolving it drives the
    /// declaration extractor; this is the point where a disabled index
    /// refuses an already-computed delta.
    pub fn apply_delta(&self, removed: &[Symbol], added: &[Symbol]) -> Result<(), DatabaseError> {
        if !self.is_enabled() {
            return Ok(());
        }
        self.index.apply_delta(removed, added)
    }

    pub fn query(&self, prefix: &str, receiver_type: Option<&str>, limit: usize, suffix: &str, module: Option<&ModuleId>) -> Vec<Symbol> {
        if !self.is_enabled() {
            return Vec::new();
        }
        self.index.query(prefix, receiver_type, limit, suffix, module)
    }

    pub fn is_indexing(&self) -> bool {
        self.is_enabled() && self.index.is_indexing()
    }

    pub fn is_index_valid(&self, build_file_version: i64) -> bool {
        self.is_enabled() && self.index.is_index_valid(build_file_version)
    }
}
