//! Module, classpath, and symbol value types shared across `nova-project`,
//! `nova-classpath`, `nova-vfs`, and `nova-index`.
//!
//! These are plain data, not behavior: `ModuleRegistry` (in `nova-project`)
//! owns the path → module mapping, `CompilerClassPath` (in `nova-classpath`)
//! owns classpath resolution, and `SymbolIndex` (in `nova-index`) owns the
//! persisted symbol table. Splitting the value types into their own leaf
//! crate lets all of them depend on the shapes without depending on each
//! other.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use nova_core::{AbsPathBuf, FileUri, TextRange};

/// A module's name, unique within a single project.
#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ModuleName(String);

impl ModuleName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A single classpath entry: a compiled JAR paired with a best-effort
/// matching source JAR.
///
/// `spec.md` §3: "Source JAR / compiled JAR — paired archive entries;
/// compiled is required, source is best-effort." Equality and hashing are by
/// `compiled_jar` alone, per `spec.md`'s `ClassPathEntry` invariant.
#[derive(Debug, Clone)]
pub struct ClassPathEntry {
    pub compiled_jar: PathBuf,
    pub source_jar: Option<PathBuf>,
}

impl ClassPathEntry {
    pub fn new(compiled_jar: PathBuf) -> Self {
        Self {
            compiled_jar,
            source_jar: None,
        }
    }

    pub fn with_source(mut self, source_jar: PathBuf) -> Self {
        self.source_jar = Some(source_jar);
        self
    }
}

impl PartialEq for ClassPathEntry {
    fn eq(&self, other: &Self) -> bool {
        self.compiled_jar == other.compiled_jar
    }
}

impl Eq for ClassPathEntry {}

impl std::hash::Hash for ClassPathEntry {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.compiled_jar.hash(state);
    }
}

/// A single module's static description.
///
/// Built by the (external) `ClassPathResolver` collaborator and handed to
/// `ModuleRegistry`/`CompilerClassPath`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ModuleInfo {
    pub name: ModuleName,
    pub root_path: AbsPathBuf,
    pub source_dirs: BTreeSet<AbsPathBuf>,
    pub class_path: BTreeSet<PathBuf>,
}

impl ModuleInfo {
    pub fn new(name: ModuleName, root_path: AbsPathBuf) -> Self {
        Self {
            name,
            root_path,
            source_dirs: BTreeSet::new(),
            class_path: BTreeSet::new(),
        }
    }

    /// True if `path` (already normalized/absolute) is contained in one of
    /// this module's source directories.
    pub fn contains_path(&self, path: &AbsPathBuf) -> bool {
        self.source_dirs
            .iter()
            .any(|dir| path.as_path().starts_with(dir.as_path()))
    }
}

/// The set of added/removed classpath entries between two resolutions.
///
/// `spec.md` §3: `hasChanges := added ∪ removed ≠ ∅`.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ClassPathDiff {
    pub added: BTreeSet<PathBuf>,
    pub removed: BTreeSet<PathBuf>,
}

impl ClassPathDiff {
    pub fn compute(old: &BTreeSet<PathBuf>, new: &BTreeSet<PathBuf>) -> Self {
        Self {
            added: new.difference(old).cloned().collect(),
            removed: old.difference(new).cloned().collect(),
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

/// The kind of declaration a [`Symbol`] represents.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum SymbolKind {
    Class,
    Interface,
    Object,
    Function,
    Variable,
    Field,
    EnumConstant,
    TypeAlias,
}

/// Visibility of a declaration, coarsened to the level the index needs to
/// filter on. Package-private/internal symbols are `Internal`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Visibility {
    Public,
    Protected,
    Internal,
    Private,
}

pub const SYMBOL_FQ_NAME_MAX_LEN: usize = 255;
pub const SYMBOL_SHORT_NAME_MAX_LEN: usize = 80;
pub const SYMBOL_URI_MAX_LEN: usize = 511;

/// Where a [`Symbol`]'s declaration lives in source.
///
/// Stored by URI rather than [`nova_core::FileId`] because symbols are
/// persisted across restarts, while `FileId` is only stable for the lifetime
/// of the process.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct SymbolLocation {
    pub uri: FileUri,
    pub range: TextRange,
}

/// A single indexed declaration.
///
/// `moduleId = None` marks a dependency symbol: visible from every module.
/// Otherwise the symbol is visible only within its own module plus
/// dependency symbols (see `SymbolIndex::query`'s `moduleId = m OR moduleId
/// IS NULL` sharing rule).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Symbol {
    pub fq_name: String,
    pub short_name: String,
    pub kind: SymbolKind,
    pub visibility: Visibility,
    pub extension_receiver_type: Option<String>,
    pub location: Option<SymbolLocation>,
    pub source_jar: Option<PathBuf>,
    pub module_id: Option<nova_core::ModuleId>,
}

impl Symbol {
    /// `true` once truncated to fit the persisted column widths
    /// (`fq_name` ≤ 255, `short_name` ≤ 80, `location.uri` ≤ 511).
    pub fn fits_storage_limits(&self) -> bool {
        self.fq_name.chars().count() <= SYMBOL_FQ_NAME_MAX_LEN
            && self.short_name.chars().count() <= SYMBOL_SHORT_NAME_MAX_LEN
            && self
                .location
                .as_ref()
                .map(|loc| loc.uri.as_str().chars().count() <= SYMBOL_URI_MAX_LEN)
                .unwrap_or(true)
    }

    pub fn is_dependency_symbol(&self) -> bool {
        self.module_id.is_none()
    }
}
