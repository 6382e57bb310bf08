//! `SourcePath`: the concurrent `URI -> SourceFile` map and the file-level
//! compile orchestration built on top of it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use std::sync::RwLock;

use hashbrown::HashMap;
use lru::LruCache;
use tracing::warn;

use nova_classpath::CompilerClassPath;
use nova_compiler_api::{BindingContext, CancellationToken, CompileUnit, DefinitionSite, TextSize};
use nova_core::{AbsPathBuf, Diagnostic, FileUri};
use nova_ids::{FileId, ModuleId};
use nova_modules::Symbol;

use crate::content::ContentProvider;
use crate::source_file::{FileKind, Language, ParsedTree, SourceFile};

/// Seam to `ModuleRegistry` (`nova-project`): `SourcePath` needs to know
/// which module a file on disk belongs to when it's `put()`, but doesn't
/// need anything else the registry offers.
pub trait ModuleLookup: Send + Sync {
    fn find_module_for_file(&self, path: &AbsPathBuf) -> Option<ModuleId>;
}

/// A `ModuleLookup` for single-module (or pre-project-model) setups: every
/// file belongs to the one compilation unit, `all()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoModules;

impl ModuleLookup for NoModules {
    fn find_module_for_file(&self, _path: &AbsPathBuf) -> Option<ModuleId> {
        None
    }
}

/// Extracts the declarations `IndexingService` should record for a compiled
/// file. A real compiler frontend walks the bound tree; this is a seam so
/// `nova-vfs` doesn't need to depend on one (matching the
/// [`nova_compiler_api::CompilerFactory`] / [`nova_compiler_api::Compiler`]
/// pattern used for the opaque compiler collaborator).
pub trait DeclarationExtractor: Send + Sync {
    fn extract(&self, tree: &ParsedTree, module: Option<&ModuleId>) -> Vec<Symbol>;
}

/// Extracts nothing. Used when indexing is disabled, or until a real
/// extractor is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDeclarationExtractor;

impl DeclarationExtractor for NoopDeclarationExtractor {
    fn extract(&self, _tree: &ParsedTree, _module: Option<&ModuleId>) -> Vec<Symbol> {
        Vec::new()
    }
}

/// A lazy, not-yet-computed symbol-table delta for one compiled file.
///
/// `IndexingService` calls [`Self::resolve`] only when indexing is enabled,
/// so a disabled index pays no declaration-extraction cost at all.
pub struct IndexDelta {
    file: FileId,
    old_tree: Option<ParsedTree>,
    new_tree: Option<ParsedTree>,
    module: Option<ModuleId>,
    extractor: Arc<dyn DeclarationExtractor>,
}

impl IndexDelta {
    pub fn file(&self) -> FileId {
        self.file
    }

    /// Returns `(removed, added)` declarations.
    pub fn resolve(self) -> (Vec<Symbol>, Vec<Symbol>) {
        let removed = self
            .old_tree
            .as_ref()
            .map(|tree| self.extractor.extract(tree, self.module.as_ref()))
            .unwrap_or_default();
        let added = self
            .new_tree
            .as_ref()
            .map(|tree| self.extractor.extract(tree, self.module.as_ref()))
            .unwrap_or_default();
        (removed, added)
    }
}

/// Dispatches `resolve_definition` to whichever partition's binding context
/// owns the queried file, composing the per-partition [`CompileOutcome`]s
/// produced by [`SourcePath::compile_files`] into a single context.
struct CompositeBindingContext {
    partitions: Vec<(Vec<FileId>, Arc<dyn BindingContext>)>,
}

impl BindingContext for CompositeBindingContext {
    fn resolve_definition(&self, file: FileId, offset: TextSize) -> Option<DefinitionSite> {
        self.partitions
            .iter()
            .find(|(files, _)| files.contains(&file))
            .and_then(|(_, ctx)| ctx.resolve_definition(file, offset))
    }
}

pub struct CompileFilesOutcome {
    pub diagnostics: BTreeMap<FileId, Vec<Diagnostic>>,
    pub binding_context: Arc<dyn BindingContext>,
    pub index_deltas: Vec<IndexDelta>,
}

const CONTENT_CACHE_CAPACITY: usize = 256;

/// The concurrent `URI -> SourceFile` map (`spec.md` §4.F), plus the
/// orchestration that drives parsing and compiling through
/// [`CompilerClassPath`].
///
/// `files` is a single `RwLock` guarding the map structure itself (insert,
/// remove, iterate); per-file parse/compile state lives behind the finer
/// `parseDataWriteLock` inside each [`SourceFile`], so a long compile never
/// blocks a reader taking a read-only snapshot of the map or of another
/// file's content.
pub struct SourcePath {
    files: RwLock<HashMap<FileUri, Arc<SourceFile>>>,
    next_file_id: AtomicU32,
    classpath: Arc<CompilerClassPath>,
    modules: Arc<dyn ModuleLookup>,
    content_provider: Arc<dyn ContentProvider>,
    content_cache: Mutex<LruCache<FileUri, Arc<str>>>,
    extractor: Arc<dyn DeclarationExtractor>,
}

fn is_build_script(path: &AbsPathBuf) -> bool {
    matches!(
        path.as_path().file_name().and_then(|n| n.to_str()),
        Some("build.gradle") | Some("build.gradle.kts") | Some("pom.xml") | Some("BUILD") | Some("BUILD.bazel")
    )
}

impl SourcePath {
    pub fn new(
        classpath: Arc<CompilerClassPath>,
        modules: Arc<dyn ModuleLookup>,
        content_provider: Arc<dyn ContentProvider>,
    ) -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            next_file_id: AtomicU32::new(1),
            classpath,
            modules,
            content_provider,
            content_cache: Mutex::new(LruCache::new(
                std::num::NonZeroUsize::new(CONTENT_CACHE_CAPACITY).unwrap(),
            )),
            extractor: Arc::new(NoopDeclarationExtractor),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn DeclarationExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    fn alloc_file_id(&self) -> FileId {
        FileId::from_raw(self.next_file_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Create or update the file at `uri`. Temporary files are never module
    /// members (`moduleId = null`); otherwise the owning module is looked up
    /// from the file's path.
    ///
    /// # Panics
    /// If `content` contains `'\r'` (editors must normalize line endings
    /// before calling this).
    pub fn put(&self, uri: FileUri, content: impl Into<Arc<str>>, language: Language, temporary: bool) -> Arc<SourceFile> {
        let content = content.into();
        assert!(!content.contains('\r'), "SourceFile content must not contain '\\r'");

        let path = uri.to_path().ok();
        let module = if temporary {
            None
        } else {
            path.as_ref().and_then(|p| self.modules.find_module_for_file(p))
        };
        let kind = path
            .as_ref()
            .map(|p| if is_build_script(p) { FileKind::BuildScript } else { FileKind::Default })
            .unwrap_or(FileKind::Default);

        let mut files = self.files.write().unwrap();
        if let Some(existing) = files.get(&uri) {
            let next_version = existing.version() + 1;
            existing.set_content(content, next_version);
            existing.set_module(module);
            return existing.clone();
        }

        let file_id = self.alloc_file_id();
        let file = Arc::new(SourceFile::new(
            file_id,
            uri.clone(),
            path,
            content,
            0,
            kind,
            language,
            temporary,
        ));
        file.set_module(module);
        files.insert(uri, file.clone());
        file
    }

    /// Remove `uri` from the map, emitting a removal-only [`IndexDelta`] for
    /// its last compiled declarations and releasing any generated code the
    /// compiler produced for it (`spec.md` §3/§4.F delete lifecycle). `None`
    /// if `uri` was never known.
    pub fn delete(&self, uri: &FileUri) -> Option<IndexDelta> {
        let file = self.files.write().unwrap().remove(uri.as_str())?;

        if let Some(module) = file.module() {
            // Generated code is tracked per-module, not per-file, on the
            // opaque `Compiler` boundary; only bother releasing it if this
            // file had actually gone through a save (and thus a possible
            // codegen pass) at some point.
            if file.last_saved_tree().is_some() {
                let compiler = self.classpath.compiler_for_module(Some(&module));
                if let Err(err) = compiler.remove_generated_code(&module) {
                    warn!(?err, %module, "delete: failed to remove generated code");
                }
            }
        }

        Some(IndexDelta {
            file: file.file_id,
            old_tree: file.compiled_snapshot(),
            new_tree: None,
            module: file.module(),
            extractor: self.extractor.clone(),
        })
    }

    /// Look up `uri`, creating a **temporary** file from the content provider
    /// if it's unknown. The map lock is released while the content provider
    /// runs, and re-checked after reacquiring it, so a slow I/O fetch never
    /// blocks other readers/writers and two racing lookups don't both
    /// materialize the same temporary file (`spec.md` §5 deadlock-avoidance
    /// rule).
    pub fn source_file(&self, uri: &FileUri) -> Option<Arc<SourceFile>> {
        if let Some(file) = self.files.read().unwrap().get(uri.as_str()) {
            return Some(file.clone());
        }

        let content = self.fetch_content(uri)?;

        let mut files = self.files.write().unwrap();
        if let Some(file) = files.get(uri.as_str()) {
            return Some(file.clone());
        }
        let file_id = self.alloc_file_id();
        let file = Arc::new(SourceFile::new(
            file_id,
            uri.clone(),
            uri.to_path().ok(),
            content,
            0,
            FileKind::Default,
            Language::new("unknown"),
            true,
        ));
        files.insert(uri.clone(), file.clone());
        Some(file)
    }

    fn fetch_content(&self, uri: &FileUri) -> Option<Arc<str>> {
        if let Some(cached) = self.content_cache.lock().get(uri) {
            return Some(cached.clone());
        }
        let content = self.content_provider.fetch(uri)?;
        self.content_cache.lock().put(uri.clone(), content.clone());
        Some(content)
    }

    pub fn content(&self, uri: &FileUri) -> Option<Arc<str>> {
        self.source_file(uri).map(|file| file.content())
    }

    pub fn parsed_file(&self, uri: &FileUri) -> Option<ParsedTree> {
        let file = self.source_file(uri)?;
        let compiler = self.classpath.compiler_for_module(file.module().as_ref());
        Some(self.ensure_parsed(&file, &compiler).0)
    }

    pub fn current_version(&self, uri: &FileUri) -> Option<i32> {
        self.parsed_file(uri)?;
        self.source_file(uri).map(|f| f.version())
    }

    pub fn latest_compiled_version(&self, uri: &FileUri) -> Option<i32> {
        self.files
            .read()
            .unwrap()
            .get(uri.as_str())
            .and_then(|f| f.latest_compiled_version())
    }

    fn ensure_parsed(&self, file: &SourceFile, compiler: &Arc<dyn nova_compiler_api::Compiler>) -> (ParsedTree, i32) {
        if let Some(tree) = file.parsed() {
            return (tree, file.version());
        }
        let version = file.version();
        let content = file.content();
        let tree = compiler.parse(file.file_id, &content);
        file.set_parsed(tree.clone(), version);
        (tree, version)
    }

    /// All non-temporary files, the compilation unit used when there's no
    /// module structure (`spec.md` §4.F edge case).
    pub fn all(&self) -> Vec<Arc<SourceFile>> {
        self.files
            .read()
            .unwrap()
            .values()
            .filter(|f| !f.is_temporary)
            .cloned()
            .collect()
    }

    /// Reverse lookup from the internal [`FileId`] handle back to its
    /// [`FileUri`], needed when a [`nova_compiler_api::DefinitionSite`]
    /// (which only carries a `FileId`) must be turned back into an LSP
    /// location.
    pub fn uri_for_file(&self, file_id: FileId) -> Option<FileUri> {
        self.files
            .read()
            .unwrap()
            .values()
            .find(|f| f.file_id == file_id)
            .map(|f| f.uri.clone())
    }

    pub fn all_in_module(&self, module: &ModuleId) -> Vec<Arc<SourceFile>> {
        self.files
            .read()
            .unwrap()
            .values()
            .filter(|f| !f.is_temporary && f.module().as_ref() == Some(module))
            .cloned()
            .collect()
    }

    /// Compile `uris`, partitioning by `FileKind` then by module
    /// (`spec.md` §4.F `compileFiles`). Build scripts always compile against
    /// `all()` regardless of module assignment.
    pub fn compile_files(&self, uris: &[FileUri], cancellation: &CancellationToken) -> CompileFilesOutcome {
        let requested: Vec<Arc<SourceFile>> = uris.iter().filter_map(|u| self.source_file(u)).collect();

        let mut build_scripts = Vec::new();
        let mut by_module: BTreeMap<Option<ModuleId>, ()> = BTreeMap::new();
        for file in &requested {
            match file.kind {
                FileKind::BuildScript => build_scripts.push(file.clone()),
                FileKind::Default => {
                    by_module.insert(file.module(), ());
                }
            }
        }

        let mut diagnostics = BTreeMap::new();
        let mut partitions = Vec::new();
        let mut index_deltas = Vec::new();

        if !build_scripts.is_empty() {
            self.compile_partition(
                None,
                &self.all(),
                cancellation,
                &mut diagnostics,
                &mut partitions,
                &mut index_deltas,
            );
        }

        for module in by_module.into_keys() {
            let scope = match &module {
                Some(m) => self.all_in_module(m),
                None => self.all(),
            };
            self.compile_partition(
                module,
                &scope,
                cancellation,
                &mut diagnostics,
                &mut partitions,
                &mut index_deltas,
            );
        }

        CompileFilesOutcome {
            diagnostics,
            binding_context: Arc::new(CompositeBindingContext { partitions }),
            index_deltas,
        }
    }

    fn compile_partition(
        &self,
        module: Option<ModuleId>,
        scope: &[Arc<SourceFile>],
        cancellation: &CancellationToken,
        diagnostics: &mut BTreeMap<FileId, Vec<Diagnostic>>,
        partitions: &mut Vec<(Vec<FileId>, Arc<dyn BindingContext>)>,
        index_deltas: &mut Vec<IndexDelta>,
    ) {
        let compilable: Vec<&Arc<SourceFile>> = scope.iter().filter(|f| f.path.is_some()).collect();
        if compilable.is_empty() {
            return;
        }

        let compiler = self.classpath.compiler_for_module(module.as_ref());
        let mut captured_versions = Vec::with_capacity(compilable.len());
        let units: Vec<CompileUnit> = compilable
            .iter()
            .map(|file| {
                let (_, version) = self.ensure_parsed(file, &compiler);
                captured_versions.push(version);
                CompileUnit {
                    file: file.file_id,
                    path: file.path.clone().expect("filtered to files with a path"),
                    text: file.content(),
                }
            })
            .collect();

        let outcome = match self.classpath.compile(module.as_ref(), &units, cancellation) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(?err, "compile_files: partition compile failed, skipping");
                return;
            }
        };
        diagnostics.extend(outcome.diagnostics.clone());

        let file_ids: Vec<FileId> = compilable.iter().map(|f| f.file_id).collect();
        partitions.push((file_ids, outcome.binding_context.clone()));

        for (file, produced_at_version) in compilable.iter().zip(captured_versions) {
            let old_tree = file.compiled_snapshot();
            let new_tree = ParsedTree {
                file: file.file_id,
                diagnostics: outcome.diagnostics.get(&file.file_id).cloned().unwrap_or_default(),
            };
            let published = file.publish_compiled(
                produced_at_version,
                new_tree.clone(),
                outcome.binding_context.clone(),
                module.clone(),
            );
            if published {
                index_deltas.push(IndexDelta {
                    file: file.file_id,
                    old_tree,
                    new_tree: Some(new_tree),
                    module: module.clone(),
                    extractor: self.extractor.clone(),
                });
            }
        }
    }

    /// Best-effort sweep over every known file: a single failing partition
    /// never aborts the rest.
    pub fn compile_all_files(&self, cancellation: &CancellationToken) -> CompileFilesOutcome {
        let uris: Vec<FileUri> = self.files.read().unwrap().keys().cloned().collect();
        self.compile_files(&uris, cancellation)
    }

    /// Write `uri`'s current content to disk and record it as the
    /// last-saved tree.
    pub fn save(&self, uri: &FileUri) -> std::io::Result<()> {
        let file = self
            .files
            .read()
            .unwrap()
            .get(uri.as_str())
            .cloned()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "unknown uri"))?;
        if let Some(path) = &file.path {
            std::fs::write(path.as_path(), file.content().as_bytes())?;
        }
        file.mark_saved();
        Ok(())
    }

    pub fn save_all_files(&self) -> Vec<(FileUri, std::io::Error)> {
        let uris: Vec<FileUri> = self.files.read().unwrap().keys().cloned().collect();
        let mut errors = Vec::new();
        for uri in uris {
            if let Err(err) = self.save(&uri) {
                errors.push((uri, err));
            }
        }
        errors
    }

    /// Remove cached compiled state (not content) for `uris`, forcing the
    /// next compile to run fresh.
    pub fn clean_files(&self, uris: &[FileUri]) {
        let files = self.files.read().unwrap();
        for uri in uris {
            if let Some(file) = files.get(uri.as_str()) {
                file.set_content(file.content(), file.version() + 1);
            }
        }
    }

    pub fn clean_all_files(&self) {
        let uris: Vec<FileUri> = self.files.read().unwrap().keys().cloned().collect();
        self.clean_files(&uris);
    }

    /// Re-resolve module assignment for every known non-temporary file
    /// (called after `ModuleRegistry::refresh`).
    pub fn refresh_module_assignments(&self) {
        let files = self.files.read().unwrap();
        for file in files.values() {
            if file.is_temporary {
                continue;
            }
            let module = file
                .path
                .as_ref()
                .and_then(|path| self.modules.find_module_for_file(path));
            file.set_module(module);
        }
    }

    /// Drop all cached parse/compile state and module assignments, without
    /// forgetting which files are open. Used when the classpath transitions
    /// back to `READY` after a full reload.
    pub fn refresh(&self) {
        self.content_cache.lock().clear();
        self.refresh_module_assignments();
        self.clean_all_files();
    }
}
