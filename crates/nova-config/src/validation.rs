use std::path::Path;

use crate::diagnostics::{ConfigValidationError, ConfigWarning, ValidationDiagnostics};
use crate::{LoggingConfig, NovaConfig};

/// Context for semantic config validation.
///
/// Some validations (checking whether configured directories exist) require
/// a base directory. Callers without a workspace root can provide the
/// directory containing the config file instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigValidationContext<'a> {
    /// Workspace root used to resolve relative paths in the config.
    pub workspace_root: Option<&'a Path>,
    /// Directory containing the loaded config file, used as a fallback base directory.
    pub config_dir: Option<&'a Path>,
}

impl<'a> ConfigValidationContext<'a> {
    #[allow(dead_code)]
    fn base_dir(self) -> Option<&'a Path> {
        self.workspace_root.or(self.config_dir)
    }
}

impl NovaConfig {
    /// Validate semantic invariants for a configuration.
    ///
    /// Validation is best-effort: it attempts to report as many problems as
    /// possible in one pass rather than stopping at the first error.
    #[must_use]
    pub fn validate(&self) -> ValidationDiagnostics {
        self.validate_with_context(ConfigValidationContext::default())
    }

    /// Like [`NovaConfig::validate`] but with access to additional context
    /// such as the workspace root.
    #[must_use]
    pub fn validate_with_context(&self, _ctx: ConfigValidationContext<'_>) -> ValidationDiagnostics {
        let mut out = ValidationDiagnostics::default();

        validate_diagnostics(self, &mut out);
        validate_indexing(self, &mut out);
        validate_logging(self, &mut out);

        out
    }
}

fn validate_diagnostics(config: &NovaConfig, out: &mut ValidationDiagnostics) {
    // `debounce_time = 0` is a legitimate (if noisy) opt-out of debouncing, not an error.
    if config.diagnostics.debounce_time > 60_000 {
        out.warnings.push(ConfigWarning::InvalidValue {
            toml_path: "diagnostics.debounceTime".to_string(),
            message: "> 60s will make diagnostics feel unresponsive".to_string(),
        });
    }
}

fn validate_indexing(config: &NovaConfig, out: &mut ValidationDiagnostics) {
    if config.indexing.batch_size == 0 {
        out.errors.push(ConfigValidationError::InvalidValue {
            toml_path: "indexing.batchSize".to_string(),
            message: "must be >= 1".to_string(),
        });
    }
}

fn validate_logging(config: &NovaConfig, out: &mut ValidationDiagnostics) {
    if config.logging.buffer_lines == 0 {
        out.warnings.push(ConfigWarning::InvalidValue {
            toml_path: "logging.buffer_lines".to_string(),
            message: "must be >= 1 (0 is treated as 1)".to_string(),
        });
    }

    let normalized = LoggingConfig::normalize_level_directives(&config.logging.level);
    if !config.logging.level.trim().is_empty()
        && tracing_subscriber::EnvFilter::try_new(normalized.clone()).is_err()
    {
        out.warnings.push(ConfigWarning::InvalidValue {
            toml_path: "logging.level".to_string(),
            message: format!(
                "{:?} is not a valid level or EnvFilter directive (normalized: {normalized:?})",
                config.logging.level
            ),
        });
    }
}
