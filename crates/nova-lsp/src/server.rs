//! `Server`: wires `SourcePath`, `IndexingService`, `ModuleRegistry`,
//! `DiagnosticsManager`, and `LspCacheManager` into the request/notification
//! surface driven by `main.rs`'s `lsp-server` connection loop.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::RwLock;

use nova_classpath::CompilerClassPath;
use nova_compiler_api::CancellationToken as CompilerCancellationToken;
use nova_config::NovaConfig;
use nova_core::{Diagnostic as CoreDiagnostic, FileUri, LineIndex, Severity};
use nova_index::IndexingService;
use nova_modules::Symbol;
use nova_project::ModuleRegistry;
use nova_scheduler::{OperationKind, Scheduler};
use nova_vfs::{Language, SourcePath};

use crate::cache::{CacheKey, LspCacheManager};
use crate::definition::GoToDefinition;
use crate::diagnostics::{DiagnosticsClient, DiagnosticsManager};

type Cache = LspCacheManager<Vec<lsp_types::Location>, Option<lsp_types::Hover>, lsp_types::CompletionResponse, Vec<lsp_types::Location>>;

/// The long-lived state backing every LSP request/notification handler.
pub struct Server {
    pub source_path: Arc<SourcePath>,
    pub classpath: Arc<CompilerClassPath>,
    pub module_registry: Arc<ModuleRegistry>,
    pub index: Arc<IndexingService>,
    pub diagnostics: DiagnosticsManager,
    pub cache: Arc<Cache>,
    pub scheduler: Scheduler,
    pub config: RwLock<NovaConfig>,
    open_files: Arc<RwLock<HashSet<FileUri>>>,
    classpath_ready: Arc<AtomicBool>,
    sender: Sender<lsp_server::Message>,
}

impl Server {
    pub fn new(
        source_path: Arc<SourcePath>,
        classpath: Arc<CompilerClassPath>,
        module_registry: Arc<ModuleRegistry>,
        index: Arc<IndexingService>,
        scheduler: Scheduler,
        config: NovaConfig,
        sender: Sender<lsp_server::Message>,
    ) -> Arc<Self> {
        let classpath_ready = Arc::new(AtomicBool::new(false));
        let open_files: Arc<RwLock<HashSet<FileUri>>> = Arc::new(RwLock::new(HashSet::new()));

        let ready_flag = classpath_ready.clone();
        let open_files_flag = open_files.clone();
        let diagnostics = DiagnosticsManager::new(
            scheduler.clone(),
            Duration::from_millis(config.diagnostics.debounce_time),
            Arc::new(move || ready_flag.load(Ordering::SeqCst)),
            Arc::new(move |uri: &FileUri| open_files_flag.read().contains(uri)),
        );
        diagnostics.set_level(severity_from_config(&config.diagnostics.level));

        let server = Arc::new(Self {
            source_path,
            classpath,
            module_registry,
            index,
            diagnostics,
            cache: Arc::new(Cache::new()),
            scheduler,
            config: RwLock::new(config),
            open_files,
            classpath_ready,
            sender,
        });

        let lint_server = server.clone();
        server.diagnostics.set_lint_action(Arc::new(move |pending: &HashSet<FileUri>| {
            lint_server.lint(pending)
        }));
        server.diagnostics.connect(Arc::new(OutgoingDiagnosticsClient {
            sender: server.sender.clone(),
            source_path: server.source_path.clone(),
        }));

        let ready_server = server.clone();
        server
            .classpath
            .on_class_path_ready(Arc::new(move |_module, _resolved| ready_server.recheck_classpath_readiness()));

        server
    }

    /// Recomputes overall classpath readiness from every registered module's
    /// individual resolution state: READY only once all of them (if any) are
    /// `Ready`. Invoked on every `D.onClassPathReady` transition.
    fn recheck_classpath_readiness(&self) {
        let modules = self.module_registry.all_modules();
        let all_ready = modules.iter().all(|module| {
            let module_id = nova_ids::ModuleId::new(module.name.as_str());
            matches!(self.classpath.classpath_state(&module_id), nova_classpath::ResolveState::Ready(_))
        });
        self.set_classpath_ready(all_ready);
    }

    pub fn set_classpath_ready(&self, ready: bool) {
        self.classpath_ready.store(ready, Ordering::SeqCst);
        if ready {
            // `spec.md` §2 READY data flow: F.cleanAll + J.clearAll + re-lint
            // open files, then G.refresh.
            self.source_path.refresh();
            self.cache.clear_all();
            self.refresh_index();

            // every currently-open file is linted immediately rather than
            // waiting for the next edit's debounce window.
            for uri in self.open_files.read().iter() {
                self.diagnostics.lint_immediately(uri.clone());
            }
        }
    }

    /// G.refresh: re-index every currently registered module. Uses
    /// `NoopScanner` until a real compiler frontend supplies package/jar
    /// enumeration.
    fn refresh_index(&self) {
        if !self.index.is_enabled() {
            return;
        }
        let scanner: Arc<dyn nova_index::WorkspaceScanner> = Arc::new(nova_index::NoopScanner);
        for module in self.module_registry.all_modules() {
            let module_id = nova_ids::ModuleId::new(module.name.as_str());
            let build_file_version = match self.classpath.classpath_state(&module_id) {
                nova_classpath::ResolveState::Ready(resolved) => resolved.build_file_version as i64,
                _ => 0,
            };
            self.index.refresh(module_id, HashSet::new(), build_file_version, true, None, scanner.clone());
        }
    }

    /// Resolves `deltas` (only when indexing is enabled, since resolving a
    /// delta drives the declaration extractor) and applies the result to the
    /// symbol index.
    fn apply_index_deltas(&self, deltas: Vec<nova_vfs::IndexDelta>) {
        if !self.index.is_enabled() {
            return;
        }
        for delta in deltas {
            let (removed, added) = delta.resolve();
            if let Err(err) = self.index.apply_delta(&removed, &added) {
                tracing::warn!(?err, "failed to apply index delta");
            }
        }
    }

    fn lint(&self, pending: &HashSet<FileUri>) -> std::collections::BTreeMap<FileUri, Vec<CoreDiagnostic>> {
        let uris: Vec<FileUri> = pending.iter().cloned().collect();
        let token = CompilerCancellationToken::new();
        let outcome = self.source_path.compile_files(&uris, &token);
        self.apply_index_deltas(outcome.index_deltas);
        outcome
            .diagnostics
            .into_iter()
            .filter_map(|(file, diags)| self.source_path.uri_for_file(file).map(|uri| (uri, diags)))
            .collect()
    }

    // -- document lifecycle ------------------------------------------------

    pub fn did_open(&self, uri: FileUri, text: String, language: &str) {
        self.source_path.put(uri.clone(), text, Language::new(language), false);
        self.open_files.write().insert(uri.clone());
        self.diagnostics.schedule_lint(uri);
    }

    pub fn did_change(&self, uri: FileUri, text: String) {
        self.source_path.put(uri.clone(), text, Language::new("unknown"), false);
        self.cache.invalidate_file(&uri);
        self.diagnostics.schedule_lint(uri);
    }

    pub fn did_save(&self, uri: &FileUri) {
        let _ = self.source_path.save(uri);
    }

    pub fn did_close(&self, uri: &FileUri) {
        self.open_files.write().remove(uri);
        if let Some(delta) = self.source_path.delete(uri) {
            self.apply_index_deltas(vec![delta]);
        }
    }

    pub fn did_change_configuration(&self, config: NovaConfig) {
        self.diagnostics.set_level(severity_from_config(&config.diagnostics.level));
        self.diagnostics
            .update_debounce_time(Duration::from_millis(config.diagnostics.debounce_time));
        self.index.set_enabled(config.indexing.enabled);
        *self.config.write() = config;
    }

    // -- requests ------------------------------------------------------------

    fn ensure_compiled(&self, uri: &FileUri) {
        let token = CompilerCancellationToken::new();
        let outcome = self.source_path.compile_files(std::slice::from_ref(uri), &token);
        self.apply_index_deltas(outcome.index_deltas);
    }

    fn cache_key(&self, uri: &FileUri, position: lsp_types::Position) -> Option<CacheKey> {
        let version = self.source_path.current_version(uri)?;
        Some((uri.clone(), position.line, position.character, version))
    }

    pub fn goto_definition(&self, uri: &FileUri, position: lsp_types::Position) -> Vec<lsp_types::Location> {
        let key = self.cache_key(uri, position);
        if let Some(key) = &key {
            if let Some(hit) = self.cache.definition(key) {
                return hit;
            }
        }

        self.ensure_compiled(uri);
        let Some(file) = self.source_path.source_file(uri) else {
            return Vec::new();
        };
        let content = file.content();
        let line_index = LineIndex::new(&content);
        let Some(offset) = line_index.text_range(&content, lsp_types::Range { start: position, end: position }.into())
            .map(|r| r.start())
        else {
            return Vec::new();
        };

        let goto = GoToDefinition {
            source_path: &self.source_path,
            index: &self.index,
        };
        let result = goto.resolve(uri, offset, file.module().as_ref());
        if let Some(key) = key {
            self.cache.put_definition(key, result.clone());
        }
        result
    }

    pub fn hover(&self, uri: &FileUri, position: lsp_types::Position) -> Option<lsp_types::Hover> {
        let key = self.cache_key(uri, position);
        if let Some(key) = &key {
            if let Some(hit) = self.cache.hover(key) {
                return hit;
            }
        }
        if !self.classpath_ready.load(Ordering::SeqCst) {
            // `spec.md` §8 scenario 3: degraded mode returns a structurally
            // empty response rather than a stale or misleading one.
            return None;
        }

        self.ensure_compiled(uri);
        let file = self.source_path.source_file(uri)?;
        let content = file.content();
        let offset = LineIndex::new(&content)
            .text_range(&content, lsp_types::Range { start: position, end: position }.into())?
            .start();
        let word = crate::definition::identifier_at_pub(&content, offset)?;
        let short_name = word.rsplit('.').next().unwrap_or(&word);
        let hits = self.index.query(&word, None, 5, "", file.module().as_ref());
        let symbol = hits
            .iter()
            .find(|s| s.fq_name == word)
            .or_else(|| hits.iter().find(|s| s.short_name == short_name))
            .or_else(|| hits.first())?;

        let hover = Some(lsp_types::Hover {
            contents: lsp_types::HoverContents::Markup(lsp_types::MarkupContent {
                kind: lsp_types::MarkupKind::Markdown,
                value: format!("`{}`\n\n{:?}", symbol.fq_name, symbol.kind),
            }),
            range: None,
        });
        if let Some(key) = key {
            self.cache.put_hover(key, hover.clone());
        }
        hover
    }

    pub fn references(&self, uri: &FileUri, position: lsp_types::Position) -> Vec<lsp_types::Location> {
        let key = self.cache_key(uri, position);
        if let Some(key) = &key {
            if let Some(hit) = self.cache.references(key) {
                return hit;
            }
        }

        let Some(file) = self.source_path.source_file(uri) else {
            return Vec::new();
        };
        let content = file.content();
        let Some(offset) = LineIndex::new(&content)
            .text_range(&content, lsp_types::Range { start: position, end: position }.into())
            .map(|r| r.start())
        else {
            return Vec::new();
        };
        let Some(word) = crate::definition::identifier_at_pub(&content, offset) else {
            return Vec::new();
        };

        // No structural "find references" exists on the opaque compiler
        // boundary; approximate with a textual scan over every known file.
        let mut locations = Vec::new();
        for candidate in self.source_path.all() {
            let text = candidate.content();
            let line_index = LineIndex::new(&text);
            let mut search_from = 0usize;
            while let Some(found) = text[search_from..].find(word.as_str()) {
                let start = search_from + found;
                let end = start + word.len();
                let boundary_ok = text[..start].chars().next_back().map_or(true, |c| !c.is_alphanumeric() && c != '_')
                    && text[end..].chars().next().map_or(true, |c| !c.is_alphanumeric() && c != '_');
                if boundary_ok {
                    let range = line_index.range(
                        &text,
                        nova_core::TextRange::new((start as u32).into(), (end as u32).into()),
                    );
                    if let Ok(lsp_uri) = candidate.uri.as_str().parse() {
                        locations.push(lsp_types::Location {
                            uri: lsp_uri,
                            range: range.into(),
                        });
                    }
                }
                search_from = end;
            }
        }

        if let Some(key) = key {
            self.cache.put_references(key, locations.clone());
        }
        locations
    }

    pub fn document_symbol(&self, uri: &FileUri) -> Vec<lsp_types::SymbolInformation> {
        let Some(file) = self.source_path.source_file(uri) else {
            return Vec::new();
        };
        let symbols = self.index.query("", None, 10_000, "", file.module().as_ref());
        symbols
            .into_iter()
            .filter(|s| s.location.as_ref().map(|l| &l.uri) == Some(uri))
            .filter_map(|s| symbol_to_information(&s, &self.source_path))
            .collect()
    }

    pub fn workspace_symbol(&self, query: &str) -> Vec<lsp_types::SymbolInformation> {
        self.index
            .query(query, None, 100, "", None)
            .into_iter()
            .filter_map(|s| symbol_to_information(&s, &self.source_path))
            .collect()
    }

    pub fn completion(&self, uri: &FileUri, position: lsp_types::Position) -> lsp_types::CompletionResponse {
        let key = self.cache_key(uri, position);
        if let Some(key) = &key {
            if let Some(hit) = self.cache.completion(key) {
                return hit;
            }
        }

        let Some(file) = self.source_path.source_file(uri) else {
            return lsp_types::CompletionResponse::Array(Vec::new());
        };
        let content = file.content();
        let Some(offset) = LineIndex::new(&content)
            .text_range(&content, lsp_types::Range { start: position, end: position }.into())
            .map(|r| r.start())
        else {
            return lsp_types::CompletionResponse::Array(Vec::new());
        };
        let prefix = crate::definition::identifier_at_pub(&content, offset).unwrap_or_default();

        let items: Vec<lsp_types::CompletionItem> = self
            .index
            .query(&prefix, None, 50, "", file.module().as_ref())
            .into_iter()
            .map(|s| lsp_types::CompletionItem {
                label: s.short_name.clone(),
                detail: Some(s.fq_name.clone()),
                kind: Some(symbol_completion_kind(&s)),
                ..Default::default()
            })
            .collect();

        let response = lsp_types::CompletionResponse::Array(items);
        if let Some(key) = key {
            self.cache.put_completion(key, response.clone());
        }
        response
    }

    /// Run `job` on the serial executor for `kind`, so per-kind request
    /// ordering is preserved relative to other submissions of the same
    /// operation (`spec.md` §4.K's `LspExecutorPool`).
    pub fn submit(&self, kind: OperationKind, job: impl FnOnce() + Send + 'static) {
        self.scheduler.submit(kind, job);
    }
}

struct OutgoingDiagnosticsClient {
    sender: Sender<lsp_server::Message>,
    source_path: Arc<SourcePath>,
}

impl DiagnosticsClient for OutgoingDiagnosticsClient {
    fn publish_diagnostics(&self, uri: &FileUri, diagnostics: Vec<CoreDiagnostic>) {
        let Ok(lsp_uri) = uri.as_str().parse::<lsp_types::Uri>() else {
            return;
        };
        let content = self.source_path.content(uri);
        let lsp_diagnostics: Vec<lsp_types::Diagnostic> = diagnostics
            .into_iter()
            .map(|d| {
                let range = content
                    .as_deref()
                    .map(|text| LineIndex::new(text).range(text, d.range).into())
                    .unwrap_or_default();
                lsp_types::Diagnostic {
                    range,
                    severity: Some(to_lsp_severity(d.severity)),
                    code: d.code.map(lsp_types::NumberOrString::String),
                    message: d.message,
                    ..Default::default()
                }
            })
            .collect();

        let params = lsp_types::PublishDiagnosticsParams {
            uri: lsp_uri,
            diagnostics: lsp_diagnostics,
            version: None,
        };
        let notification = lsp_server::Notification::new("textDocument/publishDiagnostics".to_owned(), params);
        let _ = self.sender.send(lsp_server::Message::Notification(notification));
    }
}

fn severity_from_config(level: &nova_config::DiagnosticSeverityLevel) -> Severity {
    match level {
        nova_config::DiagnosticSeverityLevel::Error => Severity::Error,
        nova_config::DiagnosticSeverityLevel::Warning => Severity::Warning,
        nova_config::DiagnosticSeverityLevel::Info => Severity::Info,
        nova_config::DiagnosticSeverityLevel::Hint => Severity::Hint,
    }
}

fn to_lsp_severity(severity: Severity) -> lsp_types::DiagnosticSeverity {
    match severity {
        Severity::Error => lsp_types::DiagnosticSeverity::ERROR,
        Severity::Warning => lsp_types::DiagnosticSeverity::WARNING,
        Severity::Info => lsp_types::DiagnosticSeverity::INFORMATION,
        Severity::Hint => lsp_types::DiagnosticSeverity::HINT,
    }
}

fn symbol_to_information(symbol: &Symbol, source_path: &SourcePath) -> Option<lsp_types::SymbolInformation> {
    let location = symbol.location.as_ref()?;
    let lsp_uri = location.uri.as_str().parse().ok()?;
    let range = source_path
        .content(&location.uri)
        .map(|text| LineIndex::new(&text).range(&text, location.range).into())
        .unwrap_or_default();
    #[allow(deprecated)]
    Some(lsp_types::SymbolInformation {
        name: symbol.short_name.clone(),
        kind: symbol_kind_to_lsp(symbol.kind),
        tags: None,
        deprecated: None,
        location: lsp_types::Location { uri: lsp_uri, range },
        container_name: None,
    })
}

fn symbol_kind_to_lsp(kind: nova_modules::SymbolKind) -> lsp_types::SymbolKind {
    use nova_modules::SymbolKind::*;
    match kind {
        Class => lsp_types::SymbolKind::CLASS,
        Interface => lsp_types::SymbolKind::INTERFACE,
        Object => lsp_types::SymbolKind::OBJECT,
        Function => lsp_types::SymbolKind::FUNCTION,
        Variable => lsp_types::SymbolKind::VARIABLE,
        Field => lsp_types::SymbolKind::FIELD,
        EnumConstant => lsp_types::SymbolKind::ENUM_MEMBER,
        TypeAlias => lsp_types::SymbolKind::TYPE_PARAMETER,
    }
}

fn symbol_completion_kind(symbol: &Symbol) -> lsp_types::CompletionItemKind {
    use nova_modules::SymbolKind::*;
    match symbol.kind {
        Class => lsp_types::CompletionItemKind::CLASS,
        Interface => lsp_types::CompletionItemKind::INTERFACE,
        Object => lsp_types::CompletionItemKind::MODULE,
        Function => lsp_types::CompletionItemKind::FUNCTION,
        Variable => lsp_types::CompletionItemKind::VARIABLE,
        Field => lsp_types::CompletionItemKind::FIELD,
        EnumConstant => lsp_types::CompletionItemKind::ENUM_MEMBER,
        TypeAlias => lsp_types::CompletionItemKind::STRUCT,
    }
}
