//! Seams to the (out-of-scope) compiler frontend's package/classfile
//! enumeration, mirroring the `Compiler`/`ClassPathResolver` trait-object
//! pattern in `nova-compiler-api`.

use std::path::Path;

use nova_core::ModuleId;
use nova_modules::Symbol;

/// Enumerates a module's own source packages for a full [`crate::SymbolIndex::refresh`].
pub trait WorkspaceScanner: Send + Sync {
    /// Depth-first package names reachable from `module`'s source roots,
    /// skipping `META-INF`.
    fn enumerate_packages(&self, module: &ModuleId) -> Vec<String>;

    /// Every declaration in `package` belonging to `module`'s own sources.
    fn declarations_in_package(&self, module: &ModuleId, package: &str) -> Vec<Symbol>;
}

/// Enumerates declarations from a module's full classpath scope (workspace
/// plus dependency JARs), used by [`crate::SymbolIndex::index_jars`].
pub trait JarScanner: Send + Sync {
    /// Every declaration in `package` visible from `module`'s classpath.
    fn declarations_in_package(&self, module: &ModuleId, package: &str) -> Vec<Symbol>;

    /// Best-effort probe: does `jar`'s classfile table contain `fqn`?
    fn contains_class(&self, jar: &Path, fqn: &str) -> bool;
}

/// A scanner that finds nothing. Lets `SymbolIndex` run (and tests exercise
/// its locking/cancellation/metadata behavior) without a real frontend.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScanner;

impl WorkspaceScanner for NoopScanner {
    fn enumerate_packages(&self, _module: &ModuleId) -> Vec<String> {
        Vec::new()
    }

    fn declarations_in_package(&self, _module: &ModuleId, _package: &str) -> Vec<Symbol> {
        Vec::new()
    }
}

impl JarScanner for NoopScanner {
    fn declarations_in_package(&self, _module: &ModuleId, _package: &str) -> Vec<Symbol> {
        Vec::new()
    }

    fn contains_class(&self, _jar: &Path, _fqn: &str) -> bool {
        false
    }
}
