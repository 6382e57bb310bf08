//! The relational symbol store backing `SymbolIndex` (`nova-index`).
//!
//! A single `rusqlite` (bundled SQLite) database holding `Symbols`,
//! `Locations`, `Ranges`, `Positions`, `SymbolIndexMetadata` and
//! `IndexedJars`. Schema changes bump [`schema::DB_VERSION`]; the only
//! supported migration is delete-and-recreate from `DatabaseMetadata.version`
//! mismatch — there is no in-place ALTER path.
//!
//! All access goes through [`DatabaseService::with_connection`] /
//! [`DatabaseService::with_transaction`] so writers serialize on the single
//! shared `Connection` rather than each crate inventing its own locking.

mod error;
mod schema;
mod symbols;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};

use nova_core::ModuleId;
use nova_modules::Symbol;

pub use error::DatabaseError;
pub use schema::DB_VERSION;
pub use symbols::{
    count_symbols, delete_symbols_by_source_jars, insert_symbol, query_by_short_name, query_like,
    LikeQuery,
};

const DATABASE_FILE_NAME: &str = "kls_database.db";

/// `SymbolIndexMetadata`'s singleton row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexMetadata {
    pub build_file_version: i64,
    pub indexed_at: i64,
    pub symbol_count: i64,
}

impl IndexMetadata {
    /// "Index is valid for a probe version `v` iff row exists ∧
    /// `buildFileVersion ≥ v` ∧ `symbolCount > 0`."
    pub fn is_valid_for(&self, probe_version: i64) -> bool {
        self.build_file_version >= probe_version && self.symbol_count > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedJar {
    pub jar_path: PathBuf,
    pub indexed_at: i64,
    pub symbol_count: i64,
}

/// Opens (or creates) the `kls_database.db` at `storage_path`, or an
/// in-memory database when `storage_path` is `None` or not a directory.
pub struct DatabaseService {
    conn: Arc<Mutex<Connection>>,
    persistent: bool,
}

impl DatabaseService {
    pub fn open(storage_path: Option<&Path>) -> Result<Self, DatabaseError> {
        match storage_path {
            Some(dir) if dir.is_dir() => {
                let db_path = dir.join(DATABASE_FILE_NAME);
                let conn = Self::open_or_recreate(&db_path)?;
                Ok(Self {
                    conn: Arc::new(Mutex::new(conn)),
                    persistent: true,
                })
            }
            _ => {
                info!("no usable storage_path, opening in-memory symbol database");
                let conn = Connection::open_in_memory().map_err(|source| DatabaseError::Open {
                    path: PathBuf::from(":memory:"),
                    source,
                })?;
                conn.execute_batch(schema::SCHEMA_DDL)?;
                Self::write_version(&conn)?;
                Ok(Self {
                    conn: Arc::new(Mutex::new(conn)),
                    persistent: false,
                })
            }
        }
    }

    fn open_or_recreate(db_path: &Path) -> Result<Connection, DatabaseError> {
        if db_path.exists() {
            let conn = Connection::open(db_path).map_err(|source| DatabaseError::Open {
                path: db_path.to_path_buf(),
                source,
            })?;
            match Self::read_version(&conn)? {
                Some(version) if version == schema::DB_VERSION => return Ok(conn),
                Some(version) => warn!(
                    found = version,
                    expected = schema::DB_VERSION,
                    "database schema version mismatch, recreating"
                ),
                None => warn!("database missing DatabaseMetadata row, recreating"),
            }
            drop(conn);
            std::fs::remove_file(db_path).map_err(|source| DatabaseError::Remove {
                path: db_path.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(db_path).map_err(|source| DatabaseError::Open {
            path: db_path.to_path_buf(),
            source,
        })?;
        conn.execute_batch(schema::SCHEMA_DDL)?;
        Self::write_version(&conn)?;
        Ok(conn)
    }

    fn read_version(conn: &Connection) -> Result<Option<i32>, DatabaseError> {
        let result = conn
            .query_row("SELECT version FROM DatabaseMetadata WHERE id = 0", [], |row| row.get(0))
            .optional();
        match result {
            Ok(version) => Ok(version),
            // Table doesn't exist yet, e.g. a pre-schema empty file.
            Err(rusqlite::Error::SqliteFailure(_, _)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write_version(conn: &Connection) -> Result<(), DatabaseError> {
        conn.execute(
            "INSERT INTO DatabaseMetadata (id, version) VALUES (0, ?1)
             ON CONFLICT(id) DO UPDATE SET version = excluded.version",
            params![schema::DB_VERSION],
        )?;
        Ok(())
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, DatabaseError>,
    ) -> Result<T, DatabaseError> {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn with_transaction<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T, DatabaseError>,
    ) -> Result<T, DatabaseError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    pub fn insert_symbol(&self, symbol: &Symbol) -> Result<i64, DatabaseError> {
        self.with_connection(|conn| insert_symbol(conn, symbol))
    }

    pub fn query_by_short_name(&self, short_name: &str, module: Option<&ModuleId>) -> Result<Vec<Symbol>, DatabaseError> {
        self.with_connection(|conn| query_by_short_name(conn, short_name, module))
    }

    pub fn delete_symbols_by_source_jars(&self, jars: &[PathBuf]) -> Result<usize, DatabaseError> {
        self.with_connection(|conn| delete_symbols_by_source_jars(conn, jars))
    }

    pub fn count_symbols(&self) -> Result<i64, DatabaseError> {
        self.with_connection(count_symbols)
    }

    pub fn query_like(&self, query: &symbols::LikeQuery<'_>) -> Result<Vec<Symbol>, DatabaseError> {
        self.with_connection(|conn| query_like(conn, query))
    }

    /// Deletes every row from `Symbols` (and its `Locations`/`Ranges`/
    /// `Positions` chain), used by `SymbolIndex::refresh` before a full
    /// rebuild.
    pub fn clear_symbols(&self) -> Result<(), DatabaseError> {
        self.with_transaction(|tx| {
            tx.execute("DELETE FROM Symbols", [])?;
            tx.execute("DELETE FROM Locations", [])?;
            tx.execute("DELETE FROM Ranges", [])?;
            tx.execute("DELETE FROM Positions", [])?;
            Ok(())
        })
    }

    pub fn insert_symbols(&self, symbols: &[Symbol]) -> Result<(), DatabaseError> {
        self.with_transaction(|tx| {
            for symbol in symbols {
                insert_symbol(tx, symbol)?;
            }
            Ok(())
        })
    }

    pub fn index_metadata(&self) -> Result<Option<IndexMetadata>, DatabaseError> {
        self.with_connection(|conn| {
            let row = conn
                .query_row(
                    "SELECT buildfileversion, indexedat, symbolcount FROM SymbolIndexMetadata WHERE id = 0",
                    [],
                    |row| {
                        Ok(IndexMetadata {
                            build_file_version: row.get(0)?,
                            indexed_at: row.get(1)?,
                            symbol_count: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn set_index_metadata(&self, metadata: IndexMetadata) -> Result<(), DatabaseError> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO SymbolIndexMetadata (id, buildfileversion, indexedat, symbolcount)
                 VALUES (0, ?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                    buildfileversion = excluded.buildfileversion,
                    indexedat = excluded.indexedat,
                    symbolcount = excluded.symbolcount",
                params![metadata.build_file_version, metadata.indexed_at, metadata.symbol_count],
            )?;
            Ok(())
        })
    }

    pub fn upsert_indexed_jar(&self, jar: &IndexedJar) -> Result<(), DatabaseError> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO IndexedJars (jarpath, indexedat, symbolcount) VALUES (?1, ?2, ?3)
                 ON CONFLICT(jarpath) DO UPDATE SET
                    indexedat = excluded.indexedat,
                    symbolcount = excluded.symbolcount",
                params![jar.jar_path.to_string_lossy().into_owned(), jar.indexed_at, jar.symbol_count],
            )?;
            Ok(())
        })
    }

    pub fn indexed_jars(&self) -> Result<Vec<IndexedJar>, DatabaseError> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT jarpath, indexedat, symbolcount FROM IndexedJars")?;
            let rows = stmt.query_map([], |row| {
                let jar_path: String = row.get(0)?;
                Ok(IndexedJar {
                    jar_path: PathBuf::from(jar_path),
                    indexed_at: row.get(1)?,
                    symbol_count: row.get(2)?,
                })
            })?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    pub fn remove_indexed_jars(&self, jars: &[PathBuf]) -> Result<(), DatabaseError> {
        self.with_connection(|conn| {
            for jar in jars {
                conn.execute(
                    "DELETE FROM IndexedJars WHERE jarpath = ?1",
                    params![jar.to_string_lossy().into_owned()],
                )?;
            }
            Ok(())
        })
    }
}
