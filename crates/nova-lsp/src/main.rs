//! Entry point: wires up `lsp-server`'s stdio transport, loads configuration,
//! initializes tracing, and drives the `Server` request/notification loop.

use std::sync::Arc;

use anyhow::Result;
use crossbeam_channel::Sender;

use nova_classpath::{ClassPathResolverCache, CompilerClassPath};
use nova_compiler_api::test_support::{FakeClassPathResolver, FakeCompilerFactory};
use nova_config::NovaConfig;
use nova_core::FileUri;
use nova_index::IndexingService;
use nova_lsp::Server;
use nova_project::ModuleRegistry;
use nova_scheduler::{OperationKind, Scheduler};
use nova_storage::DatabaseService;
use nova_vfs::{DiskContentProvider, SourcePath};

fn main() -> Result<()> {
    let config = load_config();
    let _log_buffer = nova_config::init_tracing(&config.logging);

    tracing::info!("starting nova-lsp");

    let (connection, io_threads) = lsp_server::Connection::stdio();
    let server_capabilities = serde_json::to_value(capabilities())?;
    let initialize_params = connection.initialize(server_capabilities)?;
    let _initialize_params: lsp_types::InitializeParams = serde_json::from_value(initialize_params)?;

    let server = build_server(config, connection.sender.clone())?;
    // `D.addWorkspaceRoot` per registered module; each resolve's eventual
    // `onClassPathReady` drives the server to READY (see `Server::new`'s
    // listener). There is no real build-tool/module discovery anywhere in
    // this workspace yet, so `module_registry` is always empty here; with
    // nothing to wait on, the server is immediately usable.
    let modules = server.module_registry.all_modules();
    if modules.is_empty() {
        server.set_classpath_ready(true);
    } else {
        for module in modules {
            server.classpath.add_workspace_root(nova_ids::ModuleId::new(module.name.as_str()));
        }
    }

    main_loop(&connection, &server)?;
    io_threads.join()?;
    tracing::info!("nova-lsp exited");
    Ok(())
}

fn load_config() -> NovaConfig {
    let path = std::env::var_os("NOVA_CONFIG").map(std::path::PathBuf::from);
    let Some(path) = path else {
        return NovaConfig::default();
    };
    match NovaConfig::load_file(&path) {
        Ok((config, diagnostics)) => {
            for key in &diagnostics.unknown_keys {
                eprintln!("warning: unknown config key `{key}`");
            }
            config
        }
        Err(err) => {
            eprintln!("warning: failed to load {}: {err}", path.display());
            NovaConfig::default()
        }
    }
}

/// The compiler/classpath frontend is an opaque collaborator
/// ([`nova_compiler_api`]) with no real implementation anywhere in this
/// workspace (a JVM/Kotlin frontend is its own separate, out-of-scope
/// project). `test_support`'s fakes stand in as an explicit placeholder;
/// swapping in a real `Compiler`/`ClassPathResolver` pair here is the only
/// change a frontend integration needs.
fn build_server(config: NovaConfig, sender: Sender<lsp_server::Message>) -> Result<Arc<Server>> {
    let resolver = Arc::new(FakeClassPathResolver::new());
    let classpath_cache = Arc::new(ClassPathResolverCache::new(resolver));
    let factory = Arc::new(FakeCompilerFactory::new());
    let classpath = Arc::new(CompilerClassPath::new(classpath_cache, factory));

    let module_registry = Arc::new(ModuleRegistry::new());

    let database = Arc::new(DatabaseService::open(None)?);
    let symbol_index = Arc::new(nova_index::SymbolIndex::new(database));
    let indexing = Arc::new(IndexingService::new(symbol_index, config.indexing.enabled));

    let source_path = Arc::new(SourcePath::new(
        classpath.clone(),
        module_registry.clone(),
        Arc::new(DiskContentProvider),
    ));

    let scheduler = Scheduler::new();

    Ok(Server::new(source_path, classpath, module_registry, indexing, scheduler, config, sender))
}

fn capabilities() -> lsp_types::ServerCapabilities {
    lsp_types::ServerCapabilities {
        text_document_sync: Some(lsp_types::TextDocumentSyncCapability::Kind(
            lsp_types::TextDocumentSyncKind::FULL,
        )),
        definition_provider: Some(lsp_types::OneOf::Left(true)),
        hover_provider: Some(lsp_types::HoverProviderCapability::Simple(true)),
        references_provider: Some(lsp_types::OneOf::Left(true)),
        document_symbol_provider: Some(lsp_types::OneOf::Left(true)),
        workspace_symbol_provider: Some(lsp_types::OneOf::Left(true)),
        completion_provider: Some(lsp_types::CompletionOptions {
            trigger_characters: Some(vec![".".to_string()]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn main_loop(connection: &lsp_server::Connection, server: &Arc<Server>) -> Result<()> {
    for message in &connection.receiver {
        match message {
            lsp_server::Message::Request(request) => {
                if connection.handle_shutdown(&request)? {
                    return Ok(());
                }
                dispatch_request(connection.sender.clone(), server.clone(), request);
            }
            lsp_server::Message::Notification(notification) => {
                handle_notification(server, notification);
            }
            lsp_server::Message::Response(_) => {}
        }
    }
    Ok(())
}

fn dispatch_request(sender: Sender<lsp_server::Message>, server: Arc<Server>, request: lsp_server::Request) {
    let (kind, id, method) = (operation_kind(&request.method), request.id.clone(), request.method.clone());
    server.submit(kind, move || {
        let params = request.params;
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handle_request(&server, &method, params)));
        let response = match outcome {
            Ok(Ok(value)) => {
                tracing::info!(method = %method, "request completed");
                lsp_server::Response::new_ok(id, value)
            }
            Ok(Err(err)) => {
                tracing::info!(method = %method, %err, "request returned a degraded/empty response");
                lsp_server::Response::new_err(id, lsp_server::ErrorCode::InternalError as i32, err.to_string())
            }
            Err(payload) => {
                let message = nova_core::panic_payload_to_str(&*payload);
                tracing::error!(method = %method, panic = %message, "request handler panicked");
                lsp_server::Response::new_err(id, lsp_server::ErrorCode::InternalError as i32, message.into_owned())
            }
        };
        let _ = sender.send(lsp_server::Message::Response(response));
    });
}

fn operation_kind(method: &str) -> OperationKind {
    match method {
        "textDocument/definition" => OperationKind::Definition,
        "textDocument/hover" => OperationKind::Hover,
        "textDocument/completion" => OperationKind::Completion,
        "textDocument/references" => OperationKind::References,
        // documentSymbol/workspaceSymbol have no dedicated executor thread;
        // they're cheap index reads, so sharing Definition's queue is fine.
        _ => OperationKind::Definition,
    }
}

fn handle_request(server: &Server, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
    match method {
        "textDocument/definition" => {
            let params: lsp_types::GotoDefinitionParams = serde_json::from_value(params)?;
            let uri = FileUri::new(params.text_document_position_params.text_document.uri.as_str());
            let locations = server.goto_definition(&uri, params.text_document_position_params.position);
            Ok(serde_json::to_value(lsp_types::GotoDefinitionResponse::Array(locations))?)
        }
        "textDocument/hover" => {
            let params: lsp_types::HoverParams = serde_json::from_value(params)?;
            let uri = FileUri::new(params.text_document_position_params.text_document.uri.as_str());
            let hover = server.hover(&uri, params.text_document_position_params.position);
            Ok(serde_json::to_value(hover)?)
        }
        "textDocument/references" => {
            let params: lsp_types::ReferenceParams = serde_json::from_value(params)?;
            let uri = FileUri::new(params.text_document_position.text_document.uri.as_str());
            let locations = server.references(&uri, params.text_document_position.position);
            Ok(serde_json::to_value(locations)?)
        }
        "textDocument/documentSymbol" => {
            let params: lsp_types::DocumentSymbolParams = serde_json::from_value(params)?;
            let uri = FileUri::new(params.text_document.uri.as_str());
            let symbols = server.document_symbol(&uri);
            Ok(serde_json::to_value(lsp_types::DocumentSymbolResponse::Flat(symbols))?)
        }
        "workspace/symbol" => {
            let params: lsp_types::WorkspaceSymbolParams = serde_json::from_value(params)?;
            let symbols = server.workspace_symbol(&params.query);
            Ok(serde_json::to_value(symbols)?)
        }
        "textDocument/completion" => {
            let params: lsp_types::CompletionParams = serde_json::from_value(params)?;
            let uri = FileUri::new(params.text_document_position.text_document.uri.as_str());
            let response = server.completion(&uri, params.text_document_position.position);
            Ok(serde_json::to_value(response)?)
        }
        // Best-effort empty responses: cheap to answer structurally, but
        // nothing downstream (`BindingContext`) exposes the data a real
        // implementation would need.
        "textDocument/signatureHelp" => Ok(serde_json::Value::Null),
        "textDocument/documentHighlight" => Ok(serde_json::to_value(Vec::<lsp_types::DocumentHighlight>::new())?),
        "textDocument/inlayHint" => Ok(serde_json::to_value(Vec::<lsp_types::InlayHint>::new())?),
        "textDocument/semanticTokens/full" | "textDocument/semanticTokens/range" => Ok(serde_json::to_value(
            lsp_types::SemanticTokensResult::Tokens(lsp_types::SemanticTokens { result_id: None, data: Vec::new() }),
        )?),
        // Formatting, rename, and code actions are explicit non-goals.
        "textDocument/formatting"
        | "textDocument/rangeFormatting"
        | "textDocument/rename"
        | "textDocument/codeAction" => Ok(serde_json::Value::Null),
        "kotlin/jarClassContents" => {
            Err(anyhow::anyhow!("decompilation is not supported; archive-resident sources cannot be rendered"))
        }
        "kotlin/buildOutputLocation" => Ok(serde_json::to_value(build_output_location(server, params)?)?),
        "kotlin/mainClass" => Ok(serde_json::Value::Null),
        "kotlin/overrideMember" => Ok(serde_json::to_value(Vec::<serde_json::Value>::new())?),
        _ => Ok(serde_json::Value::Null),
    }
}

#[derive(serde::Deserialize)]
struct TextDocumentUriParams {
    #[serde(rename = "textDocument")]
    text_document: lsp_types::TextDocumentIdentifier,
}

/// Best-effort guess at a module's compiled-output directory: `nova-project`
/// tracks each module's source directories and root path, but not a build
/// tool's actual output location, so this is only ever a convention-based
/// guess (`<root>/build/classes`), never authoritative.
fn build_output_location(server: &Server, params: serde_json::Value) -> Result<Option<lsp_types::Uri>> {
    let params: TextDocumentUriParams = serde_json::from_value(params)?;
    let uri = FileUri::new(params.text_document.uri.as_str());
    let Some(file) = server.source_path.source_file(&uri) else {
        return Ok(None);
    };
    let Some(module_id) = file.module() else {
        return Ok(None);
    };
    let Some(info) = server.module_registry.module_by_id(&module_id) else {
        return Ok(None);
    };
    let output_path = info.root_path.as_path().join("build").join("classes");
    let Ok(output) = nova_core::AbsPathBuf::new(output_path) else {
        return Ok(None);
    };
    let Ok(uri) = FileUri::from_path(&output) else {
        return Ok(None);
    };
    Ok(uri.as_str().parse().ok())
}

fn handle_notification(server: &Arc<Server>, notification: lsp_server::Notification) {
    let result = (|| -> Result<()> {
        match notification.method.as_str() {
            "textDocument/didOpen" => {
                let params: lsp_types::DidOpenTextDocumentParams = serde_json::from_value(notification.params)?;
                let uri = FileUri::new(params.text_document.uri.as_str());
                server.did_open(uri, params.text_document.text, &params.text_document.language_id);
            }
            "textDocument/didChange" => {
                let params: lsp_types::DidChangeTextDocumentParams = serde_json::from_value(notification.params)?;
                let uri = FileUri::new(params.text_document.uri.as_str());
                if let Some(change) = params.content_changes.into_iter().last() {
                    server.did_change(uri, change.text);
                }
            }
            "textDocument/didSave" => {
                let params: lsp_types::DidSaveTextDocumentParams = serde_json::from_value(notification.params)?;
                let uri = FileUri::new(params.text_document.uri.as_str());
                server.did_save(&uri);
            }
            "textDocument/didClose" => {
                let params: lsp_types::DidCloseTextDocumentParams = serde_json::from_value(notification.params)?;
                let uri = FileUri::new(params.text_document.uri.as_str());
                server.did_close(&uri);
            }
            "workspace/didChangeConfiguration" => {
                let params: lsp_types::DidChangeConfigurationParams = serde_json::from_value(notification.params)?;
                if let Ok(config) = serde_json::from_value::<NovaConfig>(params.settings) {
                    server.did_change_configuration(config);
                }
            }
            _ => {}
        }
        Ok(())
    })();
    if let Err(err) = result {
        tracing::warn!(?err, method = %notification.method, "failed to handle notification");
    }
}
