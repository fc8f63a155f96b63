use crate::cache::{CacheKey, ContentService};

/// Best-effort speculative cache population
///
/// Runs the same coalesced miss path as a regular load, but detached from any
/// consumer: nothing is returned and every failure is swallowed after
/// logging. Concurrent with a real load of the same key, the cache still
/// converges on a single entry and a single fetch.
#[derive(Clone)]
pub struct Prefetcher {
    service: ContentService,
}

impl Prefetcher {
    pub fn new(service: ContentService) -> Self {
        Self { service }
    }

    /// Warms the cache for `key` without blocking the caller
    ///
    /// Returns immediately. Short-circuits when the key is already cached.
    pub fn prefetch(&self, key: CacheKey) {
        if self.service.cache().get(&key).is_some() {
            tracing::debug!(key = %key, "Prefetch skipped, already cached");
            return;
        }

        let service = self.service.clone();
        tokio::spawn(async move {
            match service.fetch_bytes(&key).await {
                Some(bytes) => {
                    tracing::debug!(key = %key, bytes = bytes.len(), "Prefetch populated cache")
                }
                None => tracing::debug!(key = %key, "Prefetch gave up"),
            }
        });
    }
}
