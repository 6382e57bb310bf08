//! Row-level mapping between [`nova_modules::Symbol`] and the `Symbols` /
//! `Locations` / `Ranges` / `Positions` tables.

use std::path::PathBuf;

use rusqlite::{params, Connection, OptionalExtension};

use nova_core::{FileUri, ModuleId, TextRange, TextSize};
use nova_modules::{Symbol, SymbolKind, SymbolLocation, Visibility};

use crate::error::DatabaseError;

/// `spec.md` §3 `Symbol` length invariants, mirrored by the `CHECK`
/// constraints in [`crate::schema::SCHEMA_DDL`]: checked here too so a
/// caller gets a descriptive [`DatabaseError`] instead of a raw
/// `SQLITE_CONSTRAINT` failure.
pub const MAX_FQ_NAME_LEN: usize = 255;
pub const MAX_SHORT_NAME_LEN: usize = 80;
pub const MAX_URI_LEN: usize = 511;

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), DatabaseError> {
    if value.len() > max {
        return Err(DatabaseError::FieldTooLong {
            field,
            max,
            actual: value.len(),
        });
    }
    Ok(())
}

fn kind_to_str(kind: SymbolKind) -> &'static str {
    match kind {
        SymbolKind::Class => "class",
        SymbolKind::Interface => "interface",
        SymbolKind::Object => "object",
        SymbolKind::Function => "function",
        SymbolKind::Variable => "variable",
        SymbolKind::Field => "field",
        SymbolKind::EnumConstant => "enum_constant",
        SymbolKind::TypeAlias => "type_alias",
    }
}

fn kind_from_str(s: &str) -> SymbolKind {
    match s {
        "class" => SymbolKind::Class,
        "interface" => SymbolKind::Interface,
        "object" => SymbolKind::Object,
        "function" => SymbolKind::Function,
        "variable" => SymbolKind::Variable,
        "field" => SymbolKind::Field,
        "enum_constant" => SymbolKind::EnumConstant,
        "type_alias" => SymbolKind::TypeAlias,
        other => unreachable!("unknown persisted SymbolKind {other:?}"),
    }
}

fn visibility_to_str(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Public => "public",
        Visibility::Protected => "protected",
        Visibility::Internal => "internal",
        Visibility::Private => "private",
    }
}

fn visibility_from_str(s: &str) -> Visibility {
    match s {
        "public" => Visibility::Public,
        "protected" => Visibility::Protected,
        "internal" => Visibility::Internal,
        "private" => Visibility::Private,
        other => unreachable!("unknown persisted Visibility {other:?}"),
    }
}

/// Insert `location`'s `Positions`/`Ranges`/`Locations` row chain, returning
/// the new `Locations.id`.
fn insert_location(conn: &Connection, location: &SymbolLocation) -> Result<i64, DatabaseError> {
    check_len("uri", location.uri.as_str(), MAX_URI_LEN)?;

    let start = location.range.start();
    let end = location.range.end();

    conn.execute(
        "INSERT INTO Positions (line, character) VALUES (0, ?1)",
        params![u32::from(start)],
    )?;
    let start_id = conn.last_insert_rowid();

    conn.execute(
        "INSERT INTO Positions (line, character) VALUES (0, ?1)",
        params![u32::from(end)],
    )?;
    let end_id = conn.last_insert_rowid();

    conn.execute(
        "INSERT INTO Ranges (start, end) VALUES (?1, ?2)",
        params![start_id, end_id],
    )?;
    let range_id = conn.last_insert_rowid();

    conn.execute(
        "INSERT INTO Locations (uri, range) VALUES (?1, ?2)",
        params![location.uri.as_str(), range_id],
    )?;
    Ok(conn.last_insert_rowid())
}

fn read_location(conn: &Connection, location_id: i64) -> Result<Option<SymbolLocation>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT l.uri, ps.character, pe.character
             FROM Locations l
             JOIN Ranges r ON r.id = l.range
             JOIN Positions ps ON ps.id = r.start
             JOIN Positions pe ON pe.id = r.end
             WHERE l.id = ?1",
            params![location_id],
            |row| {
                let uri: String = row.get(0)?;
                let start: u32 = row.get(1)?;
                let end: u32 = row.get(2)?;
                Ok((uri, start, end))
            },
        )
        .optional()?;

    Ok(row.map(|(uri, start, end)| SymbolLocation {
        uri: FileUri::from(uri),
        range: TextRange::new(TextSize::from(start), TextSize::from(end)),
    }))
}

/// Insert `symbol`, creating its location row chain (if any). Returns the
/// new `Symbols.id`.
pub fn insert_symbol(conn: &Connection, symbol: &Symbol) -> Result<i64, DatabaseError> {
    check_len("fqName", &symbol.fq_name, MAX_FQ_NAME_LEN)?;
    check_len("shortName", &symbol.short_name, MAX_SHORT_NAME_LEN)?;

    let location_id = symbol
        .location
        .as_ref()
        .map(|location| insert_location(conn, location))
        .transpose()?;

    conn.execute(
        "INSERT INTO Symbols
            (fqname, shortname, kind, visibility, extensionreceivertype, location, sourcejar, moduleid)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            symbol.fq_name,
            symbol.short_name,
            kind_to_str(symbol.kind),
            visibility_to_str(symbol.visibility),
            symbol.extension_receiver_type,
            location_id,
            symbol.source_jar.as_ref().map(|p| p.to_string_lossy().into_owned()),
            symbol.module_id.as_ref().map(ModuleId::as_str),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn row_to_symbol(conn: &Connection, row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, Symbol, Option<i64>)> {
    let id: i64 = row.get(0)?;
    let fq_name: String = row.get(1)?;
    let short_name: String = row.get(2)?;
    let kind: String = row.get(3)?;
    let visibility: String = row.get(4)?;
    let extension_receiver_type: Option<String> = row.get(5)?;
    let location_id: Option<i64> = row.get(6)?;
    let source_jar: Option<String> = row.get(7)?;
    let module_id: Option<String> = row.get(8)?;
    let _ = conn;

    Ok((
        id,
        Symbol {
            fq_name,
            short_name,
            kind: kind_from_str(&kind),
            visibility: visibility_from_str(&visibility),
            extension_receiver_type,
            location: None,
            source_jar: source_jar.map(PathBuf::from),
            module_id: module_id.map(ModuleId::new),
        },
        location_id,
    ))
}

/// `query(shortName, moduleId=m)`: returns symbols visible to module `m` —
/// those declared in `m` plus dependency symbols (`moduleId IS NULL`). Pass
/// `None` to see only dependency symbols.
pub fn query_by_short_name(
    conn: &Connection,
    short_name: &str,
    module: Option<&ModuleId>,
) -> Result<Vec<Symbol>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, fqname, shortname, kind, visibility, extensionreceivertype, location, sourcejar, moduleid
         FROM Symbols
         WHERE shortname = ?1 AND (moduleid = ?2 OR moduleid IS NULL)",
    )?;
    let module_str = module.map(ModuleId::as_str);
    let rows = stmt.query_map(params![short_name, module_str], |row| row_to_symbol(conn, row))?;

    let mut out = Vec::new();
    for row in rows {
        let (_, mut symbol, location_id) = row?;
        if let Some(location_id) = location_id {
            symbol.location = read_location(conn, location_id)?;
        }
        out.push(symbol);
    }
    Ok(out)
}

/// Parameters for [`query_like`], mirroring `SymbolIndex.query`'s signature.
pub struct LikeQuery<'a> {
    pub prefix: &'a str,
    pub suffix: &'a str,
    pub receiver_type: Option<&'a str>,
    pub limit: usize,
    pub module: Option<&'a ModuleId>,
}

/// `query(prefix, receiverType?, limit, suffix, moduleId?)`: `LIKE`-matches
/// `shortname` against `prefix% ... suffix`, optionally filters by extension
/// receiver type, and shares dependency symbols (`moduleid IS NULL`) across
/// every module.
pub fn query_like(conn: &Connection, query: &LikeQuery<'_>) -> Result<Vec<Symbol>, DatabaseError> {
    let pattern = format!("{}%{}", query.prefix, query.suffix);
    let module_str = query.module.map(ModuleId::as_str);

    let mut stmt = conn.prepare(
        "SELECT id, fqname, shortname, kind, visibility, extensionreceivertype, location, sourcejar, moduleid
         FROM Symbols
         WHERE shortname LIKE ?1
           AND (?2 IS NULL OR extensionreceivertype = ?2)
           AND (?3 IS NULL OR moduleid = ?3 OR moduleid IS NULL)
         LIMIT ?4",
    )?;
    let rows = stmt.query_map(
        params![pattern, query.receiver_type, module_str, query.limit as i64],
        |row| row_to_symbol(conn, row),
    )?;

    let mut out = Vec::new();
    for row in rows {
        let (_, mut symbol, location_id) = row?;
        if let Some(location_id) = location_id {
            symbol.location = read_location(conn, location_id)?;
        }
        out.push(symbol);
    }
    Ok(out)
}

/// Bulk-delete every symbol attributed to any of `jars` (`removeSymbolsFromJars`).
/// Returns the number of rows removed.
pub fn delete_symbols_by_source_jars(conn: &Connection, jars: &[PathBuf]) -> Result<usize, DatabaseError> {
    let mut removed = 0;
    for jar in jars {
        removed += conn.execute(
            "DELETE FROM Symbols WHERE sourcejar = ?1",
            params![jar.to_string_lossy().into_owned()],
        )?;
    }
    Ok(removed)
}

pub fn count_symbols(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM Symbols", [], |row| row.get(0))?)
}
