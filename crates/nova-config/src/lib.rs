//! Workspace configuration for Nova.
//!
//! `NovaConfig` is the single source of truth for user-tunable behavior. It
//! is deserialized from `nova.toml` (or the LSP `workspace/configuration`
//! JSON payload, which uses the same field names) and exposes JSON Schema
//! for editor tooling via [`json_schema`].
//!
//! Loading is split from validation: [`NovaConfig::load_str`] always
//! succeeds if the TOML is well-formed (unknown keys are collected, not
//! rejected), while [`NovaConfig::validate`] reports semantic problems that
//! would bite at runtime (e.g. `indexing.batchSize = 0`).

use std::path::PathBuf;
use std::sync::{Arc, Mutex, Once, OnceLock};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriter};
use tracing_subscriber::prelude::*;

mod diagnostics;
mod schema;
mod validation;

pub use diagnostics::{
    ConfigDiagnostics, ConfigValidationError, ConfigWarning, ValidationDiagnostics,
};
pub use schema::json_schema;
pub use validation::ConfigValidationContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[schemars(deny_unknown_fields)]
pub struct NovaConfig {
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default, rename = "externalSources")]
    pub external_sources: ExternalSourcesConfig,

    #[serde(default)]
    pub scripts: ScriptsConfig,

    #[serde(default, rename = "inlayHints")]
    pub inlay_hints: InlayHintsConfig,

    #[serde(default)]
    pub compiler: CompilerConfig,

    /// Global logging settings for Nova crates.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl NovaConfig {
    /// Load `nova.toml` contents, collecting (but not rejecting) unknown keys.
    ///
    /// Returns the parsed config plus the sorted, deduplicated list of
    /// unrecognized keys. Callers that want semantic validation too should
    /// follow up with [`NovaConfig::validate`] and merge both into a single
    /// [`ConfigDiagnostics`].
    pub fn load_str(text: &str) -> Result<(Self, Vec<String>), ConfigLoadError> {
        let (config, unknown_keys) = diagnostics::deserialize_toml_with_unknown_keys(text)?;
        Ok((config, unknown_keys))
    }

    pub fn load_file(path: &std::path::Path) -> Result<(Self, ConfigDiagnostics), ConfigLoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let (config, unknown_keys) = Self::load_str(&text)?;
        let mut out = ConfigDiagnostics {
            unknown_keys,
            ..Default::default()
        };
        out.extend_validation(config.validate());
        Ok((config, out))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverityLevel {
    Error,
    Warning,
    Info,
    Hint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct DiagnosticsConfig {
    /// Whether compiler diagnostics are published at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum severity published to the client.
    #[serde(default = "DiagnosticsConfig::default_level")]
    pub level: DiagnosticSeverityLevel,

    /// Milliseconds a document's diagnostics run is delayed after the last
    /// edit, so rapid keystrokes coalesce into a single recompute.
    #[serde(default = "DiagnosticsConfig::default_debounce_time", rename = "debounceTime")]
    #[schemars(range(min = 0))]
    pub debounce_time: u64,
}

impl DiagnosticsConfig {
    fn default_level() -> DiagnosticSeverityLevel {
        DiagnosticSeverityLevel::Hint
    }

    fn default_debounce_time() -> u64 {
        250
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: Self::default_level(),
            debounce_time: Self::default_debounce_time(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct IndexingConfig {
    /// Whether background symbol indexing runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Number of class files indexed per `IndexingService` batch before
    /// yielding (and checking for cancellation).
    #[serde(default = "IndexingConfig::default_batch_size", rename = "batchSize")]
    #[schemars(range(min = 1))]
    pub batch_size: u32,
}

impl IndexingConfig {
    fn default_batch_size() -> u32 {
        50
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: Self::default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct SnippetsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for SnippetsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct CompletionConfig {
    #[serde(default)]
    pub snippets: SnippetsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct ExternalSourcesConfig {
    /// Serve decompiled/library sources under the `kls:` URI scheme instead
    /// of materializing them as temp files on disk.
    #[serde(default = "default_true", rename = "useKlsScheme")]
    pub use_kls_scheme: bool,

    /// Best-effort convert decompiled external sources to Kotlin syntax
    /// before display.
    #[serde(default, rename = "autoConvertToKotlin")]
    pub auto_convert_to_kotlin: bool,
}

impl Default for ExternalSourcesConfig {
    fn default() -> Self {
        Self {
            use_kls_scheme: true,
            auto_convert_to_kotlin: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct ScriptsConfig {
    /// Whether standalone script files (outside any module's source roots)
    /// are loaded at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether build-tool script files (build.gradle.kts, etc) are loaded
    /// and indexed as scripts.
    ///
    /// Off by default: build scripts tend to be large, rarely navigated to,
    /// and can meaningfully slow down indexing.
    #[serde(default, rename = "buildScriptsEnabled")]
    pub build_scripts_enabled: bool,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            build_scripts_enabled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct InlayHintsConfig {
    #[serde(default = "default_true", rename = "type")]
    pub type_hints: bool,

    #[serde(default = "default_true", rename = "parameter")]
    pub parameter_hints: bool,

    #[serde(default = "default_true", rename = "chained")]
    pub chained_hints: bool,
}

impl Default for InlayHintsConfig {
    fn default() -> Self {
        Self {
            type_hints: true,
            parameter_hints: true,
            chained_hints: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct JvmConfig {
    /// Target JVM bytecode version used when the compiler generates code
    /// on-the-fly for diagnostics (`"8"`, `"11"`, `"17"`, `"21"`, ...).
    #[serde(default = "JvmConfig::default_target")]
    pub target: String,
}

impl JvmConfig {
    fn default_target() -> String {
        "17".to_owned()
    }
}

impl Default for JvmConfig {
    fn default() -> Self {
        Self {
            target: Self::default_target(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct CompilerConfig {
    #[serde(default)]
    pub jvm: JvmConfig,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level for all Nova crates.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,

    /// Mirror logs to stderr (in addition to the in-memory buffer).
    ///
    /// Defaults to enabled so running the server outside an editor still
    /// produces real-time logs.
    #[serde(default = "default_true")]
    pub stderr: bool,

    /// Append logs to the given file path (in addition to the in-memory
    /// buffer). If the file cannot be opened, file logging is disabled while
    /// other sinks remain active.
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub file: Option<PathBuf>,

    /// Number of log lines kept in memory for bug reports.
    #[serde(default = "LoggingConfig::default_buffer_lines")]
    #[schemars(range(min = 1))]
    pub buffer_lines: usize,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn default_buffer_lines() -> usize {
        2_000
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            // Anything else is treated as a full `EnvFilter` directive string
            // (e.g. "nova_index=debug,nova_classpath=trace").
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(&directives)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(Self::default_level()))
    }

    /// Effective filter: `RUST_LOG`, if set, takes priority (with this
    /// config's directives as a fallback suffix so `RUST_LOG=debug` still
    /// layers over per-target overrides from `nova.toml`).
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let config_directives = Self::normalize_level_directives(&self.level);

        match env_directives {
            Some(env_directives) => {
                let combined = format!("{config_directives},{env_directives}");
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: true,
            file: None,
            buffer_lines: Self::default_buffer_lines(),
        }
    }
}

/// A bounded in-memory ring buffer of formatted log lines, used to populate
/// bug report bundles without re-reading a log file from disk.
pub struct LogBuffer {
    capacity: usize,
    inner: Mutex<VecDeque<String>>,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
        }
    }

    fn push(&self, line: String) {
        let mut guard = self.inner.lock().expect("log buffer mutex poisoned");
        if guard.len() >= self.capacity {
            guard.pop_front();
        }
        guard.push_back(line);
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("log buffer mutex poisoned")
            .iter()
            .cloned()
            .collect()
    }
}

struct LogBufferMakeWriter {
    buffer: Arc<LogBuffer>,
}

impl<'a> MakeWriter<'a> for LogBufferMakeWriter {
    type Writer = LogBufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogBufferWriter {
            buffer: self.buffer.clone(),
            bytes: Vec::new(),
        }
    }
}

struct LogBufferWriter {
    buffer: Arc<LogBuffer>,
    bytes: Vec<u8>,
}

impl std::io::Write for LogBufferWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.bytes.is_empty() {
            let text = String::from_utf8_lossy(&self.bytes).into_owned();
            for line in text.lines() {
                self.buffer.push(line.to_owned());
            }
            self.bytes.clear();
        }
        Ok(())
    }
}

impl Drop for LogBufferWriter {
    fn drop(&mut self) {
        let _ = std::io::Write::flush(self);
    }
}

static TRACING_INIT: Once = Once::new();
static GLOBAL_LOG_BUFFER: OnceLock<Arc<LogBuffer>> = OnceLock::new();

pub fn global_log_buffer() -> Arc<LogBuffer> {
    GLOBAL_LOG_BUFFER
        .get_or_init(|| Arc::new(LogBuffer::new(LoggingConfig::default_buffer_lines())))
        .clone()
}

/// Initializes structured `tracing` logging.
///
/// Safe to call multiple times; only the first call installs a global
/// subscriber. Subsequent calls return the already-installed in-memory log
/// buffer.
pub fn init_tracing(config: &LoggingConfig) -> Arc<LogBuffer> {
    let buffer = GLOBAL_LOG_BUFFER
        .get_or_init(|| Arc::new(LogBuffer::new(config.buffer_lines)))
        .clone();

    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();

        let base_file = config.file.as_ref().and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

        let mut make_writer = BoxMakeWriter::new(LogBufferMakeWriter {
            buffer: buffer.clone(),
        });
        if config.stderr {
            make_writer = BoxMakeWriter::new(
                tracing_subscriber::fmt::writer::MakeWriterExt::and(make_writer, std::io::stderr),
            );
        }
        if let Some(file) = base_file {
            let file = Arc::new(Mutex::new(file));
            make_writer = BoxMakeWriter::new(tracing_subscriber::fmt::writer::MakeWriterExt::and(
                make_writer,
                MutexFileMakeWriter { file },
            ));
        }

        let layer = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        let _ = tracing::subscriber::set_global_default(subscriber);
    });

    buffer
}

struct MutexFileMakeWriter {
    file: Arc<Mutex<std::fs::File>>,
}

impl<'a> MakeWriter<'a> for MutexFileMakeWriter {
    type Writer = MutexFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        MutexFileWriter {
            guard: self.file.lock().expect("log file mutex poisoned"),
        }
    }
}

struct MutexFileWriter<'a> {
    guard: std::sync::MutexGuard<'a, std::fs::File>,
}

impl std::io::Write for MutexFileWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.guard.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.guard.flush()
    }
}
