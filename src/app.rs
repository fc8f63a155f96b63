use std::sync::Arc;

use reqwest::Client as HttpClient;

use crate::{
    cache::{CacheConfig, ContentCache, ContentService, Prefetcher},
    config::Config,
    images::{FormatSniffer, HttpImageFetcher},
    services::{
        providers::{MetadataProvider, TmdbProvider},
        recommendations::RecommendationService,
    },
    watched::{JsonFileStore, WatchedSet},
};

/// Process-wide application assembly
///
/// Every component is constructed once and wired explicitly: the content
/// cache lives here and flows into the services that need it, instead of
/// hiding behind a global. One `App` per process is the expected shape;
/// everything inside is cheap to clone or share.
pub struct App {
    pub content: ContentService,
    pub prefetcher: Prefetcher,
    pub watched: Arc<WatchedSet>,
    pub metadata: Arc<dyn MetadataProvider>,
    pub recommendations: RecommendationService,
}

impl App {
    /// Wires the full component graph from configuration
    pub fn from_config(config: &Config) -> Self {
        let http_client = HttpClient::new();

        let cache = ContentCache::new(CacheConfig {
            max_entries: config.cache_max_entries,
            max_bytes: config.cache_max_bytes,
        });
        let fetcher = Arc::new(HttpImageFetcher::new(
            http_client.clone(),
            config.image_base_url.clone(),
        ));
        let content = ContentService::new(cache, fetcher, Arc::new(FormatSniffer));
        let prefetcher = Prefetcher::new(content.clone());

        let watched = Arc::new(WatchedSet::new(Arc::new(JsonFileStore::new(
            config.data_dir.clone(),
        ))));

        let metadata: Arc<dyn MetadataProvider> = Arc::new(TmdbProvider::new(
            http_client,
            config.tmdb_api_key.clone(),
            config.tmdb_api_url.clone(),
            config.language.clone(),
        ));

        let recommendations =
            RecommendationService::new(metadata.clone(), watched.clone(), prefetcher.clone());

        Self {
            content,
            prefetcher,
            watched,
            metadata,
            recommendations,
        }
    }
}
