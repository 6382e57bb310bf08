//! The in-memory source tree: open and temporary files, their editor
//! versions, and the compile orchestration that drives them through
//! `nova-classpath`.
//!
//! [`SourceFiles`] tracks which URIs the editor currently has open (and at
//! what version, to reject out-of-order `didChange` notifications);
//! [`SourcePath`] is the `URI -> SourceFile` map itself plus `put`/`delete`,
//! content-provider fallback for URIs nobody has opened yet, and the
//! module-partitioned compile entry points.

mod content;
mod source_file;
mod source_files;
mod source_path;

pub use content::{
    ArchiveContentProvider, CompositeContentProvider, ContentProvider, DiskContentProvider,
};
pub use source_file::{FileKind, Language, ParsedTree, SourceFile};
pub use source_files::SourceFiles;
pub use source_path::{
    CompileFilesOutcome, DeclarationExtractor, IndexDelta, ModuleLookup, NoModules,
    NoopDeclarationExtractor, SourcePath,
};
