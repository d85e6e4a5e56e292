//! Shared resource cache
//!
//! The cache is the sole synchronization point across concurrently open
//! pages: every resource, link placeholder, and chapter lives here, keyed by
//! canonical URL. The contract that matters for correctness is the atomic
//! check-then-insert: two pages resolving the same canonical URL must end
//! up with exactly one entry, first write wins.

use crate::model::CacheEntry;
use crate::url::{canonical_path, canonical_url};
use std::collections::HashMap;
use std::sync::RwLock;

/// Buffered bytes and MIME type served back to an intercepted request
#[derive(Debug, Clone)]
pub struct CachedPayload {
    pub content: Vec<u8>,
    pub mime_type: String,
}

/// Returns the cache key for a URL: its canonical form, or the raw string
/// for URLs the canonicalizer rejects (data URLs, engine-internal schemes)
pub fn key_for(url: &str) -> String {
    canonical_url(url).unwrap_or_else(|_| url.to_string())
}

/// Contract of the shared resource store
///
/// Implementations must be safe under arbitrary interleaving: interception
/// callbacks arrive on the rendering engine binding's own delivery task,
/// concurrently with page tasks.
pub trait ResourceCache: Send + Sync {
    /// Snapshot of the entry for this URL, if any
    fn get(&self, url: &str) -> Option<CacheEntry>;

    fn contains(&self, url: &str) -> bool {
        self.get(url).is_some()
    }

    /// Atomic check-then-insert; returns false (and leaves the existing
    /// entry untouched) when the key is already present
    fn insert_if_absent(&self, entry: CacheEntry) -> bool;

    /// Unconditional store; returns the entry it replaced, if any
    fn insert(&self, entry: CacheEntry) -> Option<CacheEntry>;

    /// Appends a backlink source to an existing entry; false on a miss
    fn add_backlink(&self, url: &str, from: &str) -> bool;

    /// Flips `save` on the entry and returns its stable book path
    ///
    /// Repeated calls for the same URL return the same path; any content
    /// conversion (compression, transcoding) is the implementation's
    /// concern and must not change the path.
    fn mark_saved(&self, url: &str) -> Option<String>;

    /// Looks up buffered content by book path for the request-interception
    /// short-circuit
    fn book_cache(&self, path: &str) -> Option<CachedPayload>;

    /// Drops unsaved, page-scoped entries discovered from `url`
    fn clean_for_page(&self, url: &str);

    /// All entries marked for export
    fn saved(&self) -> Vec<CacheEntry>;
}

/// In-memory cache implementation
///
/// A single `RwLock` over the entry map; the write scope of
/// [`insert_if_absent`](ResourceCache::insert_if_absent) covers both the
/// existence check and the insert, which is what makes concurrent pages
/// resolving the same canonical URL safe.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResourceCache for MemoryCache {
    fn get(&self, url: &str) -> Option<CacheEntry> {
        let entries = self.entries.read().expect("cache lock poisoned");
        entries.get(&key_for(url)).cloned()
    }

    fn insert_if_absent(&self, entry: CacheEntry) -> bool {
        let key = key_for(entry.url());
        let mut entries = self.entries.write().expect("cache lock poisoned");
        if entries.contains_key(&key) {
            return false;
        }
        entries.insert(key, entry);
        true
    }

    fn insert(&self, entry: CacheEntry) -> Option<CacheEntry> {
        let key = key_for(entry.url());
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.insert(key, entry)
    }

    fn add_backlink(&self, url: &str, from: &str) -> bool {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        match entries.get_mut(&key_for(url)) {
            Some(entry) => {
                entry.add_backlink(from);
                true
            }
            None => false,
        }
    }

    fn mark_saved(&self, url: &str) -> Option<String> {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        let entry = entries.get_mut(&key_for(url))?;
        entry.set_save(true);
        Some(entry.book_path())
    }

    fn book_cache(&self, path: &str) -> Option<CachedPayload> {
        let wanted = canonical_path(path);
        let entries = self.entries.read().expect("cache lock poisoned");
        entries.values().find_map(|entry| {
            if canonical_path(&entry.book_path()) != wanted {
                return None;
            }
            entry.content_bytes().map(|bytes| CachedPayload {
                content: bytes.to_vec(),
                mime_type: entry.mime_type().to_string(),
            })
        })
    }

    fn clean_for_page(&self, url: &str) {
        let page_key = key_for(url);
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.retain(|_, entry| {
            if entry.save() || entry.is_chapter() || entry.is_link() {
                return true;
            }
            // unsaved resources referenced only by this page go away
            let backlinks = entry.backlinks();
            !(backlinks.len() == 1 && key_for(&backlinks[0]) == page_key)
        });
    }

    fn saved(&self) -> Vec<CacheEntry> {
        let entries = self.entries.read().expect("cache lock poisoned");
        entries.values().filter(|e| e.save()).cloned().collect()
    }
}
