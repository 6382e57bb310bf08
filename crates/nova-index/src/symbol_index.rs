//! `SymbolIndex`: the batched/incremental refresh and bounded-wait query
//! surface in front of `nova-storage`'s relational symbol tables.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use rusqlite::params;
use tracing::{debug, warn};

use nova_core::ModuleId;
use nova_modules::Symbol;
use nova_storage::{DatabaseError, DatabaseService, IndexMetadata, IndexedJar, LikeQuery};

use crate::scanner::{JarScanner, WorkspaceScanner};

/// An index answer must never block a UI-path query longer than this.
pub const INDEX_QUERY_TIMEOUT_MS: u64 = 100;
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const PROGRESS_UPDATE_INTERVAL_MS: u64 = 100;

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Reader-writer lock guarding symbol-table writes, plus the cancellation
/// bookkeeping for a single in-flight `refresh`.
pub struct SymbolIndex {
    db: Arc<DatabaseService>,
    index_lock: Arc<RwLock<()>>,
    is_indexing: Arc<AtomicBool>,
    current_cancellation: Mutex<Option<Arc<AtomicBool>>>,
    current_refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl SymbolIndex {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self {
            db,
            index_lock: Arc::new(RwLock::new(())),
            is_indexing: Arc::new(AtomicBool::new(false)),
            current_cancellation: Mutex::new(None),
            current_refresh_task: Mutex::new(None),
        }
    }

    pub fn is_indexing(&self) -> bool {
        self.is_indexing.load(Ordering::SeqCst)
    }

    /// Idempotent; safe to call when no refresh is running.
    pub fn cancel_current_refresh(&self) {
        if let Some(token) = self.current_cancellation.lock().unwrap().as_ref() {
            token.store(true, Ordering::SeqCst);
        }
    }

    /// Blocks until any in-flight refresh this `SymbolIndex` spawned has
    /// finished. Exposed for deterministic tests; production callers don't
    /// need to wait on the background worker.
    pub fn join_current_refresh(&self) {
        if let Some(handle) = self.current_refresh_task.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    pub fn is_index_valid(&self, build_file_version: i64) -> bool {
        matches!(
            self.db.index_metadata(),
            Ok(Some(meta)) if meta.is_valid_for(build_file_version)
        )
    }

    /// Cancels any prior refresh, then rebuilds `module`'s symbol table from
    /// scratch on a background thread.
    pub fn refresh(
        &self,
        module: ModuleId,
        exclusions: HashSet<String>,
        build_file_version: i64,
        skip_if_valid: bool,
        batch_size: Option<usize>,
        scanner: Arc<dyn WorkspaceScanner>,
    ) {
        if skip_if_valid && build_file_version > 0 && self.is_index_valid(build_file_version) {
            return;
        }

        self.cancel_current_refresh();
        self.join_current_refresh();

        let cancellation = Arc::new(AtomicBool::new(false));
        *self.current_cancellation.lock().unwrap() = Some(cancellation.clone());
        self.is_indexing.store(true, Ordering::SeqCst);

        let db = self.db.clone();
        let index_lock = self.index_lock.clone();
        let is_indexing = self.is_indexing.clone();
        let batch_size = batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1);

        let handle = thread::spawn(move || {
            run_refresh(
                &db,
                &index_lock,
                &cancellation,
                &module,
                &exclusions,
                build_file_version,
                batch_size,
                scanner.as_ref(),
            );
            is_indexing.store(false, Ordering::SeqCst);
        });
        *self.current_refresh_task.lock().unwrap() = Some(handle);
    }

    /// Incrementally index `jars`' declarations for `module`, attributing
    /// each declaration to its source JAR (`spec.md` §4.G `indexJars`).
    pub fn index_jars(
        &self,
        jars: &[PathBuf],
        module: &ModuleId,
        package_to_jars: &HashMap<String, Vec<PathBuf>>,
        scanner: &dyn JarScanner,
        cancellation: &AtomicBool,
    ) -> Result<(), DatabaseError> {
        let jar_set: HashSet<PathBuf> = jars.iter().cloned().collect();
        let mut per_jar_counts: HashMap<PathBuf, i64> = HashMap::new();

        for (package, candidates) in package_to_jars {
            if cancellation.load(Ordering::SeqCst) {
                break;
            }
            let relevant: Vec<PathBuf> = candidates
                .iter()
                .filter(|c| jar_set.contains(c.as_path()))
                .cloned()
                .collect();
            if relevant.is_empty() {
                continue;
            }

            let declarations = scanner.declarations_in_package(module, package);
            if declarations.is_empty() {
                continue;
            }

            let _write = self.index_lock.write();
            for mut symbol in declarations {
                let attributed: Option<PathBuf> = if relevant.len() == 1 {
                    Some(relevant[0].clone())
                } else {
                    relevant
                        .iter()
                        .find(|candidate| scanner.contains_class(candidate.as_path(), &symbol.fq_name))
                        .cloned()
                        .or_else(|| relevant.first().cloned())
                };
                let Some(jar) = attributed else { continue };
                symbol.source_jar = Some(jar.clone());
                self.db.insert_symbol(&symbol)?;
                *per_jar_counts.entry(jar).or_insert(0) += 1;
            }
        }

        let indexed_at = now_millis();
        for (jar_path, symbol_count) in per_jar_counts {
            self.db.upsert_indexed_jar(&IndexedJar {
                jar_path,
                indexed_at,
                symbol_count,
            })?;
        }
        Ok(())
    }

    /// Bulk delete every symbol attributed to any of `jars`, and their
    /// `IndexedJars` bookkeeping rows.
    pub fn remove_symbols_from_jars(&self, jars: &[PathBuf]) -> Result<usize, DatabaseError> {
        let _write = self.index_lock.write();
        let removed = self.db.delete_symbols_by_source_jars(jars)?;
        self.db.remove_indexed_jars(jars)?;
        Ok(removed)
    }

    /// Apply a single file's declaration delta (from `SourcePath::compile_files`'s
    /// lazy index-delta closures): remove the file's old declarations, insert
    /// its new ones, in one transaction.
    pub fn apply_delta(&self, removed: &[Symbol], added: &[Symbol]) -> Result<(), DatabaseError> {
        let _write = self.index_lock.write();
        self.db.with_transaction(|tx| {
            for symbol in removed {
                tx.execute(
                    "DELETE FROM Symbols WHERE fqname = ?1
                       AND ((?2 IS NULL AND moduleid IS NULL) OR moduleid = ?2)",
                    params![symbol.fq_name, symbol.module_id.as_ref().map(ModuleId::as_str)],
                )?;
            }
            for symbol in added {
                nova_storage::insert_symbol(tx, symbol)?;
            }
            Ok(())
        })
    }

    /// Bounded-wait query: returns an empty result rather than blocking past
    /// [`INDEX_QUERY_TIMEOUT_MS`].
    pub fn query(&self, prefix: &str, receiver_type: Option<&str>, limit: usize, suffix: &str, module: Option<&ModuleId>) -> Vec<Symbol> {
        match self
            .index_lock
            .try_read_for(Duration::from_millis(INDEX_QUERY_TIMEOUT_MS))
        {
            Some(_guard) => self
                .db
                .query_like(&LikeQuery {
                    prefix,
                    suffix,
                    receiver_type,
                    limit,
                    module,
                })
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_refresh(
    db: &DatabaseService,
    index_lock: &RwLock<()>,
    cancellation: &AtomicBool,
    module: &ModuleId,
    exclusions: &HashSet<String>,
    build_file_version: i64,
    batch_size: usize,
    scanner: &dyn WorkspaceScanner,
) {
    let packages = scanner.enumerate_packages(module);
    if cancellation.load(Ordering::SeqCst) {
        return;
    }

    {
        let _write = index_lock.write();
        if cancellation.load(Ordering::SeqCst) {
            return;
        }
        if let Err(err) = db.clear_symbols() {
            warn!(?err, "symbol index refresh: failed to clear tables");
            return;
        }
    }

    let mut last_progress = Instant::now();
    for batch in packages.chunks(batch_size) {
        if cancellation.load(Ordering::SeqCst) {
            return;
        }

        let mut symbols = Vec::new();
        for package in batch {
            for symbol in scanner.declarations_in_package(module, package) {
                if exclusions.contains(&symbol.fq_name) {
                    continue;
                }
                symbols.push(symbol);
            }
        }

        {
            let _write = index_lock.write();
            if cancellation.load(Ordering::SeqCst) {
                return;
            }
            if let Err(err) = db.insert_symbols(&symbols) {
                warn!(?err, "symbol index refresh: failed to insert batch");
                return;
            }
        }

        if last_progress.elapsed() >= Duration::from_millis(PROGRESS_UPDATE_INTERVAL_MS) {
            last_progress = Instant::now();
            debug!(packages_in_batch = batch.len(), "symbol index refresh progress");
        }
    }

    if !cancellation.load(Ordering::SeqCst) {
        let symbol_count = db.count_symbols().unwrap_or(0);
        if let Err(err) = db.set_index_metadata(IndexMetadata {
            build_file_version,
            indexed_at: now_millis(),
            symbol_count,
        }) {
            warn!(?err, "symbol index refresh: failed to write metadata");
        }
    }
}
