pub mod loader;
pub mod prefetch;
pub mod store;

pub use loader::{ContentLoad, ContentService, LoadState};
pub use prefetch::Prefetcher;
pub use store::{CacheConfig, CacheEntry, CacheKey, ContentCache};
