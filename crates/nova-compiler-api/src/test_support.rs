//! Fake [`Compiler`] and [`ClassPathResolver`] implementations for tests.
//!
//! These let the rest of the workspace (indexing, diagnostics, go-to-def,
//! classpath caching) be exercised end-to-end without a real Java/Kotlin
//! compiler or build tool on the machine running the tests.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::Arc;

use nova_core::{Diagnostic, TextRange};
use nova_ids::{FileId, ModuleId};

use crate::{
    BindingContext, CancellationToken, ClassPathResolver, CompileOutcome, CompileUnit, Compiler,
    CompilerError, CompilerFactory, DefinitionSite, ParsedTree, ResolveError, ResolvedClassPath,
    SyntaxTreeHandle,
};

/// A canned binding context: a fixed map from (file, offset) to definition
/// site, configured by the test.
#[derive(Debug, Default)]
pub struct FakeBindingContext {
    definitions: BTreeMap<(FileId, u32), DefinitionSite>,
}

impl FakeBindingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definition(
        mut self,
        file: FileId,
        offset: u32,
        site: DefinitionSite,
    ) -> Self {
        self.definitions.insert((file, offset), site);
        self
    }
}

impl BindingContext for FakeBindingContext {
    fn resolve_definition(&self, file: FileId, offset: crate::TextSize) -> Option<DefinitionSite> {
        self.definitions.get(&(file, u32::from(offset))).cloned()
    }
}

#[derive(Debug, Clone)]
pub struct FakeCompileResult {
    pub diagnostics: BTreeMap<FileId, Vec<Diagnostic>>,
    pub error: Option<FakeCompilerFailure>,
}

#[derive(Debug, Clone, Copy)]
pub enum FakeCompilerFailure {
    Panic,
    Cancelled,
    Internal,
}

impl Default for FakeCompileResult {
    fn default() -> Self {
        Self {
            diagnostics: BTreeMap::new(),
            error: None,
        }
    }
}

/// A fake compiler that records every call it receives and returns canned
/// results configured per-module ahead of time.
pub struct FakeCompiler {
    calls: Mutex<Vec<FakeCompilerCall>>,
    compile_results: Mutex<BTreeMap<ModuleId, FakeCompileResult>>,
    binding_contexts: Mutex<BTreeMap<ModuleId, Arc<dyn BindingContext>>>,
    generated_code: Mutex<BTreeMap<ModuleId, Vec<nova_core::AbsPathBuf>>>,
}

#[derive(Debug, Clone)]
pub enum FakeCompilerCall {
    Parse { file: FileId },
    Compile { module: ModuleId },
    GenerateCode { module: ModuleId },
    RemoveGeneratedCode { module: ModuleId },
    Close { module: ModuleId },
}

impl Default for FakeCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCompiler {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            compile_results: Mutex::new(BTreeMap::new()),
            binding_contexts: Mutex::new(BTreeMap::new()),
            generated_code: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn set_compile_result(&self, module: ModuleId, result: FakeCompileResult) {
        self.compile_results.lock().unwrap().insert(module, result);
    }

    pub fn set_binding_context(&self, module: ModuleId, context: Arc<dyn BindingContext>) {
        self.binding_contexts.lock().unwrap().insert(module, context);
    }

    pub fn set_generated_code(&self, module: ModuleId, files: Vec<nova_core::AbsPathBuf>) {
        self.generated_code.lock().unwrap().insert(module, files);
    }

    pub fn calls(&self) -> Vec<FakeCompilerCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: FakeCompilerCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Compiler for FakeCompiler {
    fn parse(&self, file: FileId, _text: &str) -> ParsedTree {
        self.record(FakeCompilerCall::Parse { file });
        ParsedTree {
            file,
            diagnostics: Vec::new(),
        }
    }

    fn create_syntax_tree(&self, file: FileId, _text: &str) -> SyntaxTreeHandle {
        SyntaxTreeHandle {
            file,
            generation: 0,
        }
    }

    fn compile(
        &self,
        module: &ModuleId,
        _files: &[CompileUnit],
        cancellation: &CancellationToken,
    ) -> Result<CompileOutcome, CompilerError> {
        self.record(FakeCompilerCall::Compile {
            module: module.clone(),
        });

        if cancellation.is_cancelled() {
            return Err(CompilerError::Cancelled {
                module: module.clone(),
            });
        }

        let result = self
            .compile_results
            .lock()
            .unwrap()
            .get(module)
            .cloned()
            .unwrap_or_default();

        if let Some(failure) = result.error {
            return Err(match failure {
                FakeCompilerFailure::Panic => CompilerError::Panicked {
                    module: module.clone(),
                    message: "simulated panic".to_string(),
                },
                FakeCompilerFailure::Cancelled => CompilerError::Cancelled {
                    module: module.clone(),
                },
                FakeCompilerFailure::Internal => CompilerError::Internal {
                    module: module.clone(),
                    message: "simulated internal error".to_string(),
                },
            });
        }

        let binding_context = self
            .binding_contexts
            .lock()
            .unwrap()
            .get(module)
            .cloned()
            .unwrap_or_else(|| Arc::new(FakeBindingContext::new()));

        Ok(CompileOutcome {
            module: module.clone(),
            diagnostics: result.diagnostics,
            binding_context,
        })
    }

    fn generate_code(&self, module: &ModuleId) -> Result<Vec<nova_core::AbsPathBuf>, CompilerError> {
        self.record(FakeCompilerCall::GenerateCode {
            module: module.clone(),
        });
        Ok(self
            .generated_code
            .lock()
            .unwrap()
            .get(module)
            .cloned()
            .unwrap_or_default())
    }

    fn remove_generated_code(&self, module: &ModuleId) -> Result<(), CompilerError> {
        self.record(FakeCompilerCall::RemoveGeneratedCode {
            module: module.clone(),
        });
        self.generated_code.lock().unwrap().remove(module);
        Ok(())
    }

    fn close(&self, module: &ModuleId) {
        self.record(FakeCompilerCall::Close {
            module: module.clone(),
        });
    }
}

/// Mints a fresh [`FakeCompiler`] (with no canned results configured) on
/// every call, so tests can assert that distinct modules get distinct
/// compiler instances.
#[derive(Default)]
pub struct FakeCompilerFactory;

impl FakeCompilerFactory {
    pub fn new() -> Self {
        Self
    }
}

impl CompilerFactory for FakeCompilerFactory {
    fn create_compiler(&self) -> Arc<dyn Compiler> {
        Arc::new(FakeCompiler::new())
    }
}

/// A fake classpath resolver returning canned [`ResolvedClassPath`] values
/// per module, with optional simulated failures.
pub struct FakeClassPathResolver {
    resolutions: Mutex<BTreeMap<ModuleId, Result<ResolvedClassPath, String>>>,
    resolve_calls: Mutex<Vec<ModuleId>>,
}

impl Default for FakeClassPathResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeClassPathResolver {
    pub fn new() -> Self {
        Self {
            resolutions: Mutex::new(BTreeMap::new()),
            resolve_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_resolution(&self, module: ModuleId, resolved: ResolvedClassPath) {
        self.resolutions.lock().unwrap().insert(module, Ok(resolved));
    }

    pub fn set_failure(&self, module: ModuleId, message: impl Into<String>) {
        self.resolutions
            .lock()
            .unwrap()
            .insert(module, Err(message.into()));
    }

    pub fn resolve_calls(&self) -> Vec<ModuleId> {
        self.resolve_calls.lock().unwrap().clone()
    }

    pub fn default_resolved(module: &ModuleId, compiled_jars: Vec<PathBuf>) -> ResolvedClassPath {
        ResolvedClassPath {
            module: module.clone(),
            compiled_jars,
            source_jars: Vec::new(),
            module_class_paths: BTreeMap::new(),
            build_file_version: 1,
        }
    }
}

impl ClassPathResolver for FakeClassPathResolver {
    fn resolve(
        &self,
        module: &ModuleId,
        _include_sources: bool,
        cancellation: &CancellationToken,
    ) -> Result<ResolvedClassPath, ResolveError> {
        self.resolve_calls.lock().unwrap().push(module.clone());

        if cancellation.is_cancelled() {
            return Err(ResolveError::Cancelled {
                module: module.clone(),
            });
        }

        match self.resolutions.lock().unwrap().get(module) {
            Some(Ok(resolved)) => Ok(resolved.clone()),
            Some(Err(message)) => Err(ResolveError::BuildToolFailed {
                module: module.clone(),
                message: message.clone(),
            }),
            None => Ok(Self::default_resolved(module, Vec::new())),
        }
    }
}

/// A definition site pointing at a fixed offset, for tests that only care
/// about "does go-to-definition land on the right file".
pub fn definition_at(file: FileId, start: u32, end: u32, is_external: bool) -> DefinitionSite {
    DefinitionSite {
        file,
        range: TextRange::new(start.into(), end.into()),
        is_external,
    }
}
