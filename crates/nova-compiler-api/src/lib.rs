//! Trait boundary between the LSP backend and the actual Java/Kotlin
//! compiler frontend and build-tool classpath extraction.
//!
//! Both the real parser/type-checker (behind [`Compiler`]) and the real
//! Maven/Gradle metadata extraction (behind [`ClassPathResolver`]) are
//! treated as opaque collaborators: this crate only defines the shape of
//! their inputs and outputs so the rest of the workspace (indexing,
//! diagnostics, go-to-definition, classpath caching) can be built and
//! tested against a fake implementation ([`test_support`]) without linking
//! a real compiler.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nova_core::{AbsPathBuf, Diagnostic, TextRange};
use nova_ids::{FileId, ModuleId};

/// A single compilation unit handed to [`Compiler::compile`]: a source file
/// plus the text the caller wants compiled (which may differ from what's on
/// disk for unsaved editor buffers).
#[derive(Debug, Clone)]
pub struct CompileUnit {
    pub file: FileId,
    pub path: AbsPathBuf,
    pub text: Arc<str>,
}

/// The result of [`Compiler::parse`]: a syntax tree handle plus any
/// parse-time diagnostics. The tree itself is opaque to this crate — callers
/// that need to inspect it go through [`Compiler::create_syntax_tree`] or a
/// [`BindingContext`].
#[derive(Debug, Clone)]
pub struct ParsedTree {
    pub file: FileId,
    pub diagnostics: Vec<Diagnostic>,
}

/// Opaque handle to a parsed syntax tree, returned by
/// [`Compiler::create_syntax_tree`]. Nova's own code never inspects the
/// contents directly; it round-trips the handle back to the compiler for
/// structural queries (e.g. "what node is at this offset").
#[derive(Debug, Clone)]
pub struct SyntaxTreeHandle {
    pub file: FileId,
    pub generation: u64,
}

/// Resolves a source position to its definition site.
///
/// Returned by [`Compiler::compile`] as part of [`CompileOutcome`]. Kept
/// trait-object-safe so the real implementation can wrap whatever internal
/// binding/resolution machinery the compiler frontend uses.
pub trait BindingContext: Send + Sync {
    /// Resolve the symbol at `file`/`offset`, returning the file and range of
    /// its declaration, or `None` if nothing resolves (unknown symbol, or the
    /// offset isn't on an identifier).
    fn resolve_definition(&self, file: FileId, offset: TextSize) -> Option<DefinitionSite>;
}

pub use nova_core::TextSize;

/// Where a symbol's definition lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionSite {
    pub file: FileId,
    pub range: TextRange,
    /// True if this definition lives in a decompiled/external (library or
    /// JDK) source, as opposed to a workspace source file.
    pub is_external: bool,
}

/// The result of compiling a module's sources: diagnostics plus a
/// [`BindingContext`] for resolving references within this compilation.
#[derive(Clone)]
pub struct CompileOutcome {
    pub module: ModuleId,
    pub diagnostics: BTreeMap<FileId, Vec<Diagnostic>>,
    pub binding_context: Arc<dyn BindingContext>,
}

impl std::fmt::Debug for CompileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompileOutcome")
            .field("module", &self.module)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompilerError {
    #[error("compiler panicked while compiling {module}: {message}")]
    Panicked { module: ModuleId, message: String },
    #[error("compilation of {module} was cancelled")]
    Cancelled { module: ModuleId },
    #[error("internal compiler error compiling {module}: {message}")]
    Internal { module: ModuleId, message: String },
}

/// Cooperative cancellation token.
///
/// Mirrors the generation-counter pattern used by [`nova_modules`]-adjacent
/// background orchestration: cancelling bumps the generation, and long-running
/// work polls [`is_cancelled`](Self::is_cancelled) at checkpoints rather than
/// being interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    generation: Arc<AtomicU64>,
    observed_at: u64,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            observed_at: 0,
        }
    }

    /// Returns a linked token that observes the current generation. Calling
    /// [`cancel`](Self::cancel) on *any* clone cancels every token linked to
    /// the same generation counter.
    pub fn child(&self) -> Self {
        Self {
            generation: self.generation.clone(),
            observed_at: self.generation.load(Ordering::SeqCst),
        }
    }

    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.observed_at
    }
}

/// The compiler frontend: parsing, type-checking, and the Kapt-style
/// generated-code lifecycle used by annotation processors.
///
/// Implementations must be safe to call concurrently for *different*
/// modules; Nova serializes access per-module itself (see
/// `CompilerClassPath`'s per-module LRU).
pub trait Compiler: Send + Sync {
    /// Parse a single file's text, independent of any module's classpath.
    /// Used for fast syntax-only diagnostics and outline/symbol extraction.
    fn parse(&self, file: FileId, text: &str) -> ParsedTree;

    /// Build a structural syntax tree handle for `file`, usable for
    /// structural navigation (document symbols, folding).
    fn create_syntax_tree(&self, file: FileId, text: &str) -> SyntaxTreeHandle;

    /// Fully compile (parse + bind + type-check) `files`, which must all
    /// belong to `module`.
    fn compile(
        &self,
        module: &ModuleId,
        files: &[CompileUnit],
        cancellation: &CancellationToken,
    ) -> Result<CompileOutcome, CompilerError>;

    /// Run annotation-processing code generation for `module`, materializing
    /// generated sources so they can be indexed like any other source file.
    fn generate_code(&self, module: &ModuleId) -> Result<Vec<AbsPathBuf>, CompilerError>;

    /// Remove sources previously produced by [`generate_code`](Self::generate_code)
    /// for `module`, e.g. because its build file changed.
    fn remove_generated_code(&self, module: &ModuleId) -> Result<(), CompilerError>;

    /// Release any per-module resources the compiler is holding (caches,
    /// open file handles). Called when a module is evicted from the
    /// per-module compiler LRU.
    fn close(&self, module: &ModuleId);
}

/// Produces fresh [`Compiler`] instances.
///
/// `CompilerClassPath` keeps one compiler instance per hot module (see its
/// per-module LRU) rather than sharing a single instance across modules, so
/// that two modules declaring a same-named, same-signature symbol never
/// resolve against each other's bindings. This trait is the seam that lets
/// it mint those instances without knowing how a real compiler frontend is
/// constructed.
pub trait CompilerFactory: Send + Sync {
    fn create_compiler(&self) -> Arc<dyn Compiler>;
}

/// A single resolved classpath entry: a compiled JAR paired with a
/// best-effort matching source JAR.
pub use nova_modules::ClassPathEntry;

/// The classpath metadata produced by resolving a module's build
/// configuration (Maven/Gradle/Bazel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedClassPath {
    pub module: ModuleId,
    pub compiled_jars: Vec<PathBuf>,
    pub source_jars: Vec<PathBuf>,
    pub module_class_paths: BTreeMap<ModuleId, Vec<PathBuf>>,
    /// Monotonic version derived from the build file's last-modified time
    /// (or an equivalent content hash). A change indicates the resolution is
    /// stale and should be recomputed.
    pub build_file_version: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("build tool invocation failed for {module}: {message}")]
    BuildToolFailed { module: ModuleId, message: String },
    #[error("classpath resolution for {module} was cancelled")]
    Cancelled { module: ModuleId },
    #[error("io error resolving classpath for {module}: {source}")]
    Io {
        module: ModuleId,
        #[source]
        source: std::io::Error,
    },
}

/// Build-tool classpath extraction (Maven/Gradle/Bazel).
pub trait ClassPathResolver: Send + Sync {
    /// Resolve `module`'s classpath, optionally including source JARs.
    ///
    /// `include_sources = false` lets callers skip a (typically slower)
    /// source-jar download/resolution pass when only compiled classes are
    /// needed (e.g. a background re-resolve after a dependency version bump).
    fn resolve(
        &self,
        module: &ModuleId,
        include_sources: bool,
        cancellation: &CancellationToken,
    ) -> Result<ResolvedClassPath, ResolveError>;
}

pub mod test_support;
