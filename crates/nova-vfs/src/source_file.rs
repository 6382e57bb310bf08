//! The `SourceFile` entity: an open or temporary file tracked by [`crate::SourcePath`].

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use nova_compiler_api::BindingContext;
use nova_core::{AbsPathBuf, FileUri};
use nova_ids::{FileId, ModuleId};

pub use nova_compiler_api::ParsedTree;

/// Whether a file is compiled as part of the build-configuration compilation
/// unit (always compiled with `all()`, regardless of module partitioning) or
/// as an ordinary source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    BuildScript,
    Default,
}

/// Opaque per-file language tag (`"java"`, `"kotlin"`, ...). Nova itself never
/// branches on the value; it's forwarded to the compiler frontend and to LSP
/// `languageId` reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Language(Arc<str>);

impl Language {
    pub fn new(tag: impl Into<Arc<str>>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The compile/bind data guarded by the file's `parseDataWriteLock`: kept
/// separate from `content`/`version` so a long compilation never blocks a
/// reader taking a read-only snapshot of the file's text.
struct ParseData {
    parsed: Option<ParsedTree>,
    parsed_at_version: i32,
    compiled_tree: Option<ParsedTree>,
    compiled_at_version: i32,
    binding_context: Option<Arc<dyn BindingContext>>,
    last_saved_tree: Option<ParsedTree>,
    module: Option<ModuleId>,
}

impl Default for ParseData {
    fn default() -> Self {
        Self {
            parsed: None,
            parsed_at_version: -1,
            compiled_tree: None,
            compiled_at_version: -1,
            binding_context: None,
            last_saved_tree: None,
            module: None,
        }
    }
}

/// A single file known to [`crate::SourcePath`]: its editor content plus
/// whatever parse/compile state has been computed for it so far.
///
/// Identity is the [`FileUri`]; `file_id` is an internal, process-lifetime-only
/// handle used by the compiler/binding APIs, which key on [`FileId`] rather
/// than URIs.
pub struct SourceFile {
    pub file_id: FileId,
    pub uri: FileUri,
    pub path: Option<AbsPathBuf>,
    pub kind: FileKind,
    pub language: Language,
    pub is_temporary: bool,
    content: Mutex<Arc<str>>,
    version: AtomicI32,
    data: Mutex<ParseData>,
}

impl SourceFile {
    pub fn new(
        file_id: FileId,
        uri: FileUri,
        path: Option<AbsPathBuf>,
        content: Arc<str>,
        version: i32,
        kind: FileKind,
        language: Language,
        is_temporary: bool,
    ) -> Self {
        Self {
            file_id,
            uri,
            path,
            kind,
            language,
            is_temporary,
            content: Mutex::new(content),
            version: AtomicI32::new(version),
            data: Mutex::new(ParseData::default()),
        }
    }

    /// The editor's latest view of the file. Invariant: never contains `\r`
    /// (callers normalize CRLF/CR before calling [`Self::set_content`]).
    pub fn content(&self) -> Arc<str> {
        self.content.lock().clone()
    }

    pub fn version(&self) -> i32 {
        self.version.load(Ordering::SeqCst)
    }

    /// Replace the file's content and bump its version. Does not touch
    /// parse/compile state: callers that need a fresh parse observe the stale
    /// `parsed_at_version` on their next call to [`Self::parsed`].
    pub fn set_content(&self, content: Arc<str>, version: i32) {
        debug_assert!(!content.contains('\r'), "SourceFile content must not contain '\\r'");
        *self.content.lock() = content;
        self.version.store(version, Ordering::SeqCst);
    }

    /// The most recently computed parse tree, or `None` if it's stale (the
    /// content has changed since it was produced) or was never computed.
    pub fn parsed(&self) -> Option<ParsedTree> {
        let data = self.data.lock();
        if data.parsed_at_version == self.version() {
            data.parsed.clone()
        } else {
            None
        }
    }

    pub fn set_parsed(&self, tree: ParsedTree, version: i32) {
        let mut data = self.data.lock();
        data.parsed = Some(tree);
        data.parsed_at_version = version;
    }

    /// The most recent compiled tree and binding context, regardless of
    /// whether the content has since changed (freshness is the caller's
    /// `Recompile` policy to manage, per the cache-at-query-time contract).
    pub fn compiled(&self) -> Option<(ParsedTree, Arc<dyn BindingContext>)> {
        let data = self.data.lock();
        match (&data.compiled_tree, &data.binding_context) {
            (Some(tree), Some(ctx)) => Some((tree.clone(), ctx.clone())),
            _ => None,
        }
    }

    pub fn latest_compiled_version(&self) -> Option<i32> {
        let data = self.data.lock();
        data.compiled_tree.as_ref().map(|_| data.compiled_at_version)
    }

    /// Atomically publish a new compiled tree/binding context, but only if
    /// the file's parse hasn't moved on to a newer version since `tree` was
    /// produced (guards against a stale compile racing a newer edit, per
    /// `spec.md` §4.F's "for each file `f` where `f.parsed == producedTree`"
    /// rule).
    pub fn publish_compiled(
        &self,
        produced_at_version: i32,
        tree: ParsedTree,
        binding_context: Arc<dyn BindingContext>,
        module: Option<ModuleId>,
    ) -> bool {
        let mut data = self.data.lock();
        if data.parsed_at_version != produced_at_version {
            return false;
        }
        data.compiled_tree = Some(tree);
        data.compiled_at_version = produced_at_version;
        data.binding_context = Some(binding_context);
        data.module = module;
        true
    }

    pub fn module(&self) -> Option<ModuleId> {
        self.data.lock().module.clone()
    }

    pub fn set_module(&self, module: Option<ModuleId>) {
        self.data.lock().module = module;
    }

    /// Snapshot of the tree compiled before the current in-flight compile, so
    /// callers can diff declarations without holding the lock across a
    /// recompile.
    pub fn compiled_snapshot(&self) -> Option<ParsedTree> {
        self.data.lock().compiled_tree.clone()
    }

    pub fn last_saved_tree(&self) -> Option<ParsedTree> {
        self.data.lock().last_saved_tree.clone()
    }

    /// Record the currently-compiled tree as the last-saved tree, called once
    /// [`crate::SourcePath::save`] has written the content to disk.
    pub fn mark_saved(&self) {
        let mut data = self.data.lock();
        data.last_saved_tree = data.compiled_tree.clone();
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("file_id", &self.file_id)
            .field("uri", &self.uri)
            .field("kind", &self.kind)
            .field("is_temporary", &self.is_temporary)
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}
