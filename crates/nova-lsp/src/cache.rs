//! `LspResponseCache` / `LspCacheManager`: four per-operation LRU caches
//! keyed by `(uri, line, character, fileVersion)` (`spec.md` §4.J).

use lru::LruCache;
use parking_lot::Mutex;

use nova_core::FileUri;

pub const CACHE_CAPACITY: usize = 200;

/// `(uri, line, character, fileVersion)` — the exact key shape `spec.md`
/// specifies; `line`/`character` are the LSP cursor position, `fileVersion`
/// the document version the response was computed against.
pub type CacheKey = (FileUri, u32, u32, i32);

fn new_cache<V>() -> LruCache<CacheKey, V> {
    LruCache::new(std::num::NonZeroUsize::new(CACHE_CAPACITY).unwrap())
}

fn evict_uri<V>(cache: &mut LruCache<CacheKey, V>, uri: &FileUri) {
    let stale: Vec<CacheKey> = cache
        .iter()
        .filter(|(key, _)| &key.0 == uri)
        .map(|(key, _)| key.clone())
        .collect();
    for key in stale {
        cache.pop(&key);
    }
}

/// Caches `definition`/`hover`/`completion`/`references` responses. Each
/// family is behind its own lock, matching `spec.md`'s "protected by an
/// intrinsic lock on each cache" — a slow fill of one doesn't block reads of
/// the others.
pub struct LspCacheManager<D, H, C, R> {
    definition: Mutex<LruCache<CacheKey, D>>,
    hover: Mutex<LruCache<CacheKey, H>>,
    completion: Mutex<LruCache<CacheKey, C>>,
    references: Mutex<LruCache<CacheKey, R>>,
}

impl<D, H, C, R> Default for LspCacheManager<D, H, C, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D, H, C, R> LspCacheManager<D, H, C, R> {
    pub fn new() -> Self {
        Self {
            definition: Mutex::new(new_cache()),
            hover: Mutex::new(new_cache()),
            completion: Mutex::new(new_cache()),
            references: Mutex::new(new_cache()),
        }
    }

    /// Drops all entries for `uri` in the definition/hover/completion
    /// caches, plus the references cache **in full** — references span
    /// files, so any edit anywhere can change a references answer for a URI
    /// that was never itself the cache key.
    pub fn invalidate_file(&self, uri: &FileUri)
    where
        D: Clone,
        H: Clone,
        C: Clone,
    {
        evict_uri(&mut self.definition.lock(), uri);
        evict_uri(&mut self.hover.lock(), uri);
        evict_uri(&mut self.completion.lock(), uri);
        self.references.lock().clear();
    }

    pub fn clear_all(&self) {
        self.definition.lock().clear();
        self.hover.lock().clear();
        self.completion.lock().clear();
        self.references.lock().clear();
    }
}

macro_rules! cache_accessors {
    ($get:ident, $put:ident, $field:ident, $value:ident) => {
        impl<D, H, C, R> LspCacheManager<D, H, C, R> {
            pub fn $get(&self, key: &CacheKey) -> Option<$value>
            where
                $value: Clone,
            {
                self.$field.lock().get(key).cloned()
            }

            pub fn $put(&self, key: CacheKey, value: $value) {
                self.$field.lock().put(key, value);
            }
        }
    };
}

cache_accessors!(definition, put_definition, definition, D);
cache_accessors!(hover, put_hover, hover, H);
cache_accessors!(completion, put_completion, completion, C);
cache_accessors!(references, put_references, references, R);
