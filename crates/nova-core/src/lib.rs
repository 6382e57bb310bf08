//! Core shared types for Nova.
//!
//! This crate is intentionally small and dependency-light: it holds the
//! primitives every other crate needs (positions/ranges, file identifiers,
//! names, path/URI conversions) without pulling in any particular storage,
//! compiler, or LSP transport dependency.

mod diagnostic;
mod fs;
mod id;
mod name;
mod panic_util;
mod path;
mod sanitize;
mod text;

pub use diagnostic::{Diagnostic, Location, RelatedDiagnostic, Severity};
pub use fs::{collect_files_with_extension, collect_java_files, max_modified_time};
pub use id::{FileId, ModuleId, RequestId};
pub use name::{InternedName, Name, NameInterner, SymbolName};
pub use panic_util::{panic_payload_to_str, panic_payload_to_string, NON_STRING_PANIC_PAYLOAD};
pub use path::{
    file_uri_to_path, path_to_file_uri, AbsPathBuf, AbsPathError, FileUri, PathToUriError,
    UriToPathError,
};
pub use sanitize::sanitize_json_error_message;
pub use text::{LineCol, LineIndex, Position, Range, TextEdit, TextRange, TextSize};

#[cfg(feature = "lsp")]
pub use path::{lsp_uri_to_path, path_to_lsp_uri};
