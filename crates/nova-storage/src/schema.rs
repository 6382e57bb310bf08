//! Embedded schema DDL and the migration version it corresponds to.

/// Bumped whenever [`SCHEMA_DDL`] changes shape. The only supported
/// migration is "delete and recreate" (`spec.md` §6): there is no ALTER-based
/// upgrade path between versions.
pub const DB_VERSION: i32 = 7;

pub const SCHEMA_DDL: &str = r#"
CREATE TABLE DatabaseMetadata (
    id      INTEGER PRIMARY KEY CHECK (id = 0),
    version INTEGER NOT NULL
);

CREATE TABLE Positions (
    id        INTEGER PRIMARY KEY,
    line      INTEGER NOT NULL,
    character INTEGER NOT NULL
);

CREATE TABLE Ranges (
    id    INTEGER PRIMARY KEY,
    start INTEGER NOT NULL REFERENCES Positions(id),
    end   INTEGER NOT NULL REFERENCES Positions(id)
);

CREATE TABLE Locations (
    id    INTEGER PRIMARY KEY,
    uri   TEXT NOT NULL CHECK (length(uri) <= 511),
    range INTEGER NOT NULL REFERENCES Ranges(id)
);

CREATE TABLE Symbols (
    id                    INTEGER PRIMARY KEY,
    fqname                TEXT NOT NULL CHECK (length(fqname) <= 255),
    shortname             TEXT NOT NULL CHECK (length(shortname) <= 80),
    kind                  TEXT NOT NULL,
    visibility            TEXT NOT NULL,
    extensionreceivertype TEXT,
    location              INTEGER REFERENCES Locations(id),
    sourcejar             TEXT,
    moduleid              TEXT
);

CREATE INDEX idx_symbols_fqname ON Symbols(fqname);
CREATE INDEX idx_symbols_shortname ON Symbols(shortname);
CREATE INDEX idx_symbols_sourcejar ON Symbols(sourcejar);

CREATE TABLE SymbolIndexMetadata (
    id              INTEGER PRIMARY KEY CHECK (id = 0),
    buildfileversion INTEGER NOT NULL,
    indexedat        INTEGER NOT NULL,
    symbolcount      INTEGER NOT NULL
);

CREATE TABLE IndexedJars (
    id          INTEGER PRIMARY KEY,
    jarpath     TEXT NOT NULL UNIQUE,
    indexedat   INTEGER NOT NULL,
    symbolcount INTEGER NOT NULL
);
"#;
