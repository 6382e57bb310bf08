//! Content providers used to materialize a [`crate::SourceFile`] for a URI
//! `SourcePath` has never seen `put()` for — e.g. a reference into a
//! dependency's source JAR, or a workspace file touched by `find-references`
//! before the editor ever opened it.

use std::sync::Arc;

use nova_archive::Archive;
use nova_core::FileUri;

/// Resolves a URI's text when it isn't already tracked by `SourcePath`.
///
/// Implementations must not assume the URI maps to a real filesystem path;
/// `SourcePath` only falls back to this for URIs with no existing entry, and
/// the result becomes a **temporary** `SourceFile` (`spec.md` §4.F lifecycle).
pub trait ContentProvider: Send + Sync {
    fn fetch(&self, uri: &FileUri) -> Option<Arc<str>>;
}

fn normalize_line_endings(text: &str) -> Arc<str> {
    if !text.contains('\r') {
        return Arc::from(text);
    }
    Arc::from(text.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Reads ordinary workspace/filesystem files.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskContentProvider;

impl ContentProvider for DiskContentProvider {
    fn fetch(&self, uri: &FileUri) -> Option<Arc<str>> {
        let path = uri.to_path().ok()?;
        let text = std::fs::read_to_string(path.as_path()).ok()?;
        Some(normalize_line_endings(&text))
    }
}

/// Reads a source file embedded in a JAR, addressed by a `jar:` URI of the
/// form `jar:file:///path/to/lib-sources.jar!/com/foo/Bar.java`.
///
/// This is a best-effort lookup only: Nova never materializes decompiled
/// class files here, it only serves source already present in a resolved
/// source JAR (`spec.md` §1 explicitly excludes decompilation output from
/// being written to disk).
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveContentProvider;

impl ContentProvider for ArchiveContentProvider {
    fn fetch(&self, uri: &FileUri) -> Option<Arc<str>> {
        let (jar_uri, entry) = parse_jar_uri(uri.as_str())?;
        let jar_path = FileUri::new(jar_uri).to_path().ok()?;
        let archive = Archive::new(jar_path.into_path_buf());
        let bytes = archive.read(entry).ok().flatten()?;
        let text = String::from_utf8_lossy(&bytes);
        Some(normalize_line_endings(&text))
    }
}

fn parse_jar_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("jar:")?;
    let (jar_uri, entry) = rest.split_once('!')?;
    Some((jar_uri, entry.trim_start_matches('/')))
}

/// Tries each provider in order, returning the first hit.
pub struct CompositeContentProvider {
    providers: Vec<Arc<dyn ContentProvider>>,
}

impl CompositeContentProvider {
    pub fn new(providers: Vec<Arc<dyn ContentProvider>>) -> Self {
        Self { providers }
    }

    /// The standard provider chain: disk first, then JAR-embedded sources.
    pub fn standard() -> Self {
        Self::new(vec![Arc::new(DiskContentProvider), Arc::new(ArchiveContentProvider)])
    }
}

impl ContentProvider for CompositeContentProvider {
    fn fetch(&self, uri: &FileUri) -> Option<Arc<str>> {
        self.providers.iter().find_map(|provider| provider.fetch(uri))
    }
}
