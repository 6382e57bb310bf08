//! Strongly-typed identifiers shared across Nova crates.
//!
//! Kept dependency-free and tiny so every other crate can depend on it without
//! pulling in unrelated code.

use std::fmt;
use std::num::NonZeroU32;

/// Identifies a single source file known to the workspace.
///
/// Allocated by whichever component first observes the file (normally
/// `nova-vfs`); stable for the lifetime of the process.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct FileId(NonZeroU32);

impl FileId {
    /// Construct a `FileId` from a raw, 1-based counter value.
    ///
    /// Panics if `raw` is zero; callers should use a monotonically
    /// incrementing counter that starts at 1.
    pub fn from_raw(raw: u32) -> Self {
        Self(NonZeroU32::new(raw).expect("FileId counter must start at 1"))
    }

    pub fn to_raw(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

/// A module's stable identity within the current project.
///
/// This is a thin newtype over the module's name: `spec.md`'s glossary
/// defines "module id" as a stable string, and names are unique within a
/// single `ModuleRegistry`.
#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ModuleId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
