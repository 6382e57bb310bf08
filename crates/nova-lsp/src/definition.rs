//! `GoToDefinition`: the four-step fallback chain from `spec.md` §4.L.
//!
//! The compiler frontend is an opaque collaborator ([`nova_compiler_api`]):
//! it exposes a binding context keyed by byte offset, not a structural query
//! surface. So the "per-module source-directory text search" and
//! "import-directive" steps here work over raw text — a simple identifier
//! scan rather than a real grammar — which is as far as this seam can reach
//! without decompiling or re-implementing the parser.

use nova_compiler_api::TextSize;
use nova_core::{AbsPathBuf, FileUri, ModuleId};
use nova_index::IndexingService;
use nova_vfs::SourcePath;

/// True if `path` resolves into a JDK home, Maven (`~/.m2`), or Gradle
/// dependency cache — `spec.md` §4.L's "archive detection normalises paths
/// and compares against JDK home and user/system caches".
pub fn looks_like_dependency_cache(path: &AbsPathBuf) -> bool {
    let s = path.as_path().to_string_lossy();
    s.contains("/.m2/repository/")
        || s.contains("/caches/modules-2/")
        || s.contains("/caches/jars-9/")
        || s.ends_with(".jar")
        || s.contains("/jdk")
        || s.contains("/jre")
}

/// Word-under-cursor extraction shared with the hover/completion/references
/// handlers, which have no binding context to fall back on.
pub fn identifier_at_pub(text: &str, offset: TextSize) -> Option<String> {
    identifier_at(text, offset)
}

/// Byte-offset scan for the word under `offset`: ASCII identifier
/// characters plus `.`, so `com.foo.Bar` in an import directive comes back
/// as one token.
fn identifier_at(text: &str, offset: TextSize) -> Option<String> {
    let offset = u32::from(offset) as usize;
    if offset > text.len() {
        return None;
    }
    let is_ident = |c: char| c.is_alphanumeric() || c == '_' || c == '.';
    let bytes = text.as_bytes();
    let mut start = offset.min(bytes.len());
    while start > 0 && is_ident(text[..start].chars().next_back()?) {
        start -= text[..start].chars().next_back().unwrap().len_utf8();
    }
    let mut end = offset;
    let mut chars = text[end..].chars();
    while let Some(c) = chars.clone().next() {
        if !is_ident(c) {
            break;
        }
        end += c.len_utf8();
        chars.next();
    }
    if start == end {
        None
    } else {
        Some(text[start..end].to_string())
    }
}

/// `true` if `offset` sits on a line beginning with `import` (ignoring
/// leading whitespace) — `spec.md` §4.L step 1.
fn is_import_directive(text: &str, offset: TextSize) -> bool {
    let offset = u32::from(offset) as usize;
    let line_start = text[..offset.min(text.len())].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = text[offset.min(text.len())..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(text.len());
    text[line_start..line_end].trim_start().starts_with("import ")
}

/// Constructs the `kls:`-scheme URI identifying an archive-resident
/// declaration. Decompilation is out of scope; this is returned unresolved
/// (`spec.md` §1 Non-goals, `SPEC_FULL.md` §4.L).
pub fn kls_uri_for(archive_hint: &str, entry_hint: &str) -> FileUri {
    FileUri::new(format!("kls://{archive_hint}!/{entry_hint}"))
}

pub struct GoToDefinition<'a> {
    pub source_path: &'a SourcePath,
    pub index: &'a IndexingService,
}

impl<'a> GoToDefinition<'a> {
    /// Resolve a definition request, returning workspace locations when the
    /// declaration is reachable, or a single `kls:` URI location as a
    /// last resort for archive-resident declarations.
    pub fn resolve(&self, uri: &FileUri, offset: TextSize, module: Option<&ModuleId>) -> Vec<lsp_types::Location> {
        let Some(file) = self.source_path.source_file(uri) else {
            return Vec::new();
        };
        let content = file.content();

        if is_import_directive(&content, offset) {
            if let Some(name) = identifier_at(&content, offset) {
                if let Some(loc) = self.resolve_via_symbol_index(&name, module) {
                    return vec![loc];
                }
            }
        }

        let Some((_, binding_context)) = file.compiled() else {
            return Vec::new();
        };
        let Some(site) = binding_context.resolve_definition(file.file_id, offset) else {
            return Vec::new();
        };

        if !site.is_external {
            if let Some(loc) = self.location_for(site.file, site.range) {
                return vec![loc];
            }
        }

        // Archive-resident (or otherwise unreachable): fall back through the
        // workspace symbol index, then give up with a `kls:` placeholder.
        if let Some(name) = identifier_at(&content, offset) {
            if let Some(loc) = self.resolve_via_symbol_index(&name, module) {
                return vec![loc];
            }
        }

        vec![lsp_types::Location {
            uri: kls_uri_for("unknown", &format!("file#{}", site.file.to_raw()))
                .as_str()
                .parse()
                .expect("kls: URI is always a valid lsp_types::Uri"),
            range: lsp_types::Range::default(),
        }]
    }

    fn resolve_via_symbol_index(&self, name: &str, module: Option<&ModuleId>) -> Option<lsp_types::Location> {
        let short_name = name.rsplit('.').next().unwrap_or(name);
        let hits = self.index.query(name, None, 20, "", module);
        let hit = hits
            .iter()
            .find(|s| s.fq_name == name)
            .or_else(|| hits.iter().find(|s| s.short_name == short_name))
            .or_else(|| hits.first())?;
        let location = hit.location.as_ref()?;
        let content = self.source_path.content(&location.uri)?;
        let line_index = nova_core::LineIndex::new(&content);
        Some(lsp_types::Location {
            uri: location.uri.as_str().parse().ok()?,
            range: line_index.range(&content, location.range).into(),
        })
    }

    fn location_for(&self, file: nova_ids::FileId, range: nova_core::TextRange) -> Option<lsp_types::Location> {
        let uri = self.source_path.uri_for_file(file)?;
        let content = self.source_path.content(&uri)?;
        let line_index = nova_core::LineIndex::new(&content);
        Some(lsp_types::Location {
            uri: uri.as_str().parse().ok()?,
            range: line_index.range(&content, range).into(),
        })
    }
}
