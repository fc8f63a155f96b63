use std::fmt::Display;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use lru::LruCache;

/// Identifies one remote image resource
///
/// The same logical resource always maps to the same key, so cache lookups
/// and in-flight coalescing can rely on key equality alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Poster(String),
    Backdrop(String),
}

impl CacheKey {
    /// Provider-relative image path carried by this key
    pub fn image_path(&self) -> &str {
        match self {
            CacheKey::Poster(path) => path,
            CacheKey::Backdrop(path) => path,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Poster(path) => write!(f, "poster:{}", path),
            CacheKey::Backdrop(path) => write!(f, "backdrop:{}", path),
        }
    }
}

/// Size bounds for the content cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries
    pub max_entries: usize,
    /// Maximum total payload bytes across all entries
    pub max_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            max_bytes: 64 * 1024 * 1024,
        }
    }
}

/// A cached blob and the moment it was fetched
///
/// Handed out as `Arc<CacheEntry>`, so eviction never invalidates an entry a
/// reader is still holding.
#[derive(Debug)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub bytes: Bytes,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

struct CacheInner {
    entries: LruCache<CacheKey, Arc<CacheEntry>>,
    total_bytes: u64,
    max_bytes: u64,
}

/// Bounded in-memory key→blob store
///
/// Entries are evicted least-recently-used once either bound is exceeded.
/// Callers must not rely on any particular eviction order. Cloning the cache
/// yields another handle to the same shared state.
#[derive(Clone)]
pub struct ContentCache {
    inner: Arc<Mutex<CacheInner>>,
}

impl ContentCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries.max(1)).unwrap();
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                entries: LruCache::new(capacity),
                total_bytes: 0,
                max_bytes: config.max_bytes,
            })),
        }
    }

    /// Looks up a cached entry, promoting it to most-recently-used
    ///
    /// Non-suspending; absence is the only negative outcome.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.entries.get(key).cloned();
        match &entry {
            Some(_) => tracing::debug!(key = %key, "Content cache hit"),
            None => tracing::debug!(key = %key, "Content cache miss"),
        }
        entry
    }

    /// Inserts or overwrites an entry, evicting under pressure
    pub fn put(&self, key: CacheKey, bytes: Bytes) {
        let entry = Arc::new(CacheEntry {
            key: key.clone(),
            bytes,
            fetched_at: Utc::now(),
        });

        let mut inner = self.inner.lock().unwrap();
        inner.total_bytes += entry.len() as u64;

        // push replaces a same-key entry or evicts the LRU entry at capacity
        if let Some((old_key, old_entry)) = inner.entries.push(key.clone(), entry) {
            inner.total_bytes -= old_entry.len() as u64;
            if old_key != key {
                tracing::debug!(evicted = %old_key, "Evicted entry at capacity");
            }
        }

        // Shed least-recently-used entries while over the byte budget,
        // keeping at least the entry just inserted.
        while inner.total_bytes > inner.max_bytes && inner.entries.len() > 1 {
            match inner.entries.pop_lru() {
                Some((old_key, old_entry)) => {
                    inner.total_bytes -= old_entry.len() as u64;
                    tracing::debug!(evicted = %old_key, "Evicted entry over byte budget");
                }
                None => break,
            }
        }
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total payload bytes currently held
    pub fn total_bytes(&self) -> u64 {
        self.inner.lock().unwrap().total_bytes
    }
}
