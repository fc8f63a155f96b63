use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use marquee::cache::{CacheConfig, CacheKey, ContentCache, ContentService, LoadState, Prefetcher};
use marquee::error::{AppError, AppResult};
use marquee::images::{FormatSniffer, ImageFetcher};
use marquee::models::{Genre, GenreId, Movie, MovieDetail, MovieId};
use marquee::services::providers::MetadataProvider;
use marquee::services::recommendations::RecommendationService;
use marquee::watched::{JsonFileStore, MemoryStore, WatchedSet};

const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x01, 0x02, 0x03];

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("marquee=debug")
        .try_init();
}

fn movie(id: MovieId) -> Movie {
    Movie {
        id,
        title: format!("Movie {}", id),
        poster_path: Some(format!("/poster-{}.jpg", id)),
        backdrop_path: None,
    }
}

/// Image CDN stand-in: counts fetches, optionally slow, optionally failing
struct FakeImageCdn {
    calls: AtomicUsize,
    delay: Duration,
    failing: bool,
}

impl FakeImageCdn {
    fn instant() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            failing: false,
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
            failing: false,
        }
    }

    fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            failing: true,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ImageFetcher for FakeImageCdn {
    async fn fetch(&self, _key: &CacheKey) -> AppResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing {
            return Err(AppError::ExternalApi("CDN returned status 503".to_string()));
        }
        Ok(Bytes::from_static(JPEG_BYTES))
    }

    fn name(&self) -> &'static str {
        "fake-cdn"
    }
}

/// Metadata provider stand-in serving a fixed candidate list
struct FakeMetadata {
    movies: Vec<Movie>,
}

#[async_trait::async_trait]
impl MetadataProvider for FakeMetadata {
    async fn popular(&self) -> AppResult<Vec<Movie>> {
        Ok(self.movies.clone())
    }

    async fn discover(&self, _genres: &[GenreId]) -> AppResult<Vec<Movie>> {
        Ok(self.movies.clone())
    }

    async fn search(&self, query: &str) -> AppResult<Vec<Movie>> {
        Ok(self
            .movies
            .iter()
            .filter(|m| m.title == query)
            .cloned()
            .collect())
    }

    async fn genres(&self) -> AppResult<Vec<Genre>> {
        Ok(vec![Genre {
            id: 28,
            name: "Action".to_string(),
        }])
    }

    async fn movie_details(&self, id: MovieId) -> AppResult<MovieDetail> {
        self.movies
            .iter()
            .find(|m| m.id == id)
            .map(|m| MovieDetail {
                id: m.id,
                title: m.title.clone(),
                overview: None,
                release_date: None,
                runtime: None,
                tagline: None,
                production_countries: vec![],
                credits: Default::default(),
            })
            .ok_or_else(|| AppError::ExternalApi(format!("No movie {}", id)))
    }

    fn name(&self) -> &'static str {
        "fake-metadata"
    }
}

struct Core {
    content: ContentService,
    cache: ContentCache,
    cdn: Arc<FakeImageCdn>,
}

fn build_core(cdn: FakeImageCdn) -> Core {
    let cache = ContentCache::new(CacheConfig::default());
    let cdn = Arc::new(cdn);
    let content = ContentService::new(cache.clone(), cdn.clone(), Arc::new(FormatSniffer));
    Core {
        content,
        cache,
        cdn,
    }
}

fn build_recommender(core: &Core, movies: Vec<Movie>, watched: Arc<WatchedSet>) -> RecommendationService {
    RecommendationService::new(
        Arc::new(FakeMetadata { movies }),
        watched,
        Prefetcher::new(core.content.clone()),
    )
}

async fn wait_for_key(cache: &ContentCache, key: &CacheKey) -> bool {
    for _ in 0..100 {
        if cache.get(key).is_some() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread")]
async fn test_end_to_end_recommendation_flow() {
    init_tracing();

    let core = build_core(FakeImageCdn::instant());
    let watched = Arc::new(WatchedSet::new(Arc::new(MemoryStore::default())));
    watched.add(2).await;

    let recommender = build_recommender(&core, vec![movie(1), movie(2), movie(3)], watched.clone());
    let mut session = recommender.start_session(&[]).await.unwrap();

    // Watched movie 2 is filtered out: 1 on show, 3 preloaded
    assert_eq!(session.current().map(|m| m.id), Some(1));
    assert_eq!(session.preloaded().map(|m| m.id), Some(3));

    // The preloaded poster is warmed exactly once
    let preloaded_key = CacheKey::Poster("/poster-3.jpg".to_string());
    assert!(wait_for_key(&core.cache, &preloaded_key).await);
    assert_eq!(core.cdn.calls(), 1);

    // Promoting the preloaded movie ends the pool
    assert_eq!(session.advance().map(|m| m.id), Some(3));
    assert!(session.preloaded().is_none());

    // Its poster now loads from cache without touching the CDN again
    let mut load = core.content.load(preloaded_key);
    match load.wait().await {
        LoadState::Ready(image) => assert_eq!(image.bytes.as_ref(), JPEG_BYTES),
        other => panic!("expected Ready, got {:?}", other),
    }
    assert_eq!(core.cdn.calls(), 1);

    // Details for the movie on show resolve through the provider
    let detail = recommender.movie_details(3).await.unwrap();
    assert_eq!(detail.title, "Movie 3");

    assert_eq!(session.advance(), None);
    assert!(session.is_exhausted());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mark_watched_excludes_movie_from_later_sessions() {
    init_tracing();

    let core = build_core(FakeImageCdn::instant());
    let watched = Arc::new(WatchedSet::new(Arc::new(MemoryStore::default())));
    let recommender = build_recommender(&core, vec![movie(1), movie(2), movie(3)], watched.clone());

    let mut session = recommender.start_session(&[]).await.unwrap();
    assert_eq!(session.current().map(|m| m.id), Some(1));
    session.mark_watched().await;

    let next_session = recommender.start_session(&[]).await.unwrap();
    assert_ne!(next_session.current().map(|m| m.id), Some(1));
    assert!(!next_session
        .preloaded()
        .map(|m| m.id == 1)
        .unwrap_or(false));
    assert!(watched.contains(1).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_loads_share_one_fetch() {
    init_tracing();

    let core = build_core(FakeImageCdn::slow(Duration::from_millis(100)));
    let key = CacheKey::Poster("/poster-1.jpg".to_string());

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let content = core.content.clone();
        let key = key.clone();
        tasks.push(tokio::spawn(async move { content.fetch_bytes(&key).await }));
    }

    for task in tasks {
        let bytes = task.await.unwrap().expect("all callers receive the bytes");
        assert_eq!(bytes.as_ref(), JPEG_BYTES);
    }

    assert_eq!(core.cdn.calls(), 1);
    assert_eq!(core.cache.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_prefetch_failure_is_invisible() {
    init_tracing();

    let core = build_core(FakeImageCdn::failing());
    let prefetcher = Prefetcher::new(core.content.clone());
    let key = CacheKey::Poster("/poster-9.jpg".to_string());

    prefetcher.prefetch(key.clone());
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Nothing cached, nothing crashed; a real load reports failure cleanly
    assert!(core.cache.is_empty());
    let mut load = core.content.load(key);
    assert_eq!(load.wait().await, LoadState::Failed);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_session_from_titles_resolves_through_search() {
    init_tracing();

    let core = build_core(FakeImageCdn::instant());
    let watched = Arc::new(WatchedSet::new(Arc::new(MemoryStore::default())));
    let recommender = build_recommender(&core, vec![movie(1), movie(2)], watched);

    let titles = vec![
        "Movie 2".to_string(),
        "Unknown Title".to_string(),
        "Movie 1".to_string(),
    ];
    let session = recommender.session_from_titles(&titles).await.unwrap();

    assert_eq!(session.current().map(|m| m.id), Some(2));
    assert_eq!(session.preloaded().map(|m| m.id), Some(1));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watched_ids_survive_a_restart() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();

    {
        let set = WatchedSet::new(Arc::new(JsonFileStore::new(dir.path())));
        set.add(603).await;
        set.add(27205).await;
    }

    // A fresh instance over the same directory sees the same IDs
    let set = WatchedSet::new(Arc::new(JsonFileStore::new(dir.path())));
    let ids = set.ids().await;
    assert!(ids.contains(&603));
    assert!(ids.contains(&27205));
    assert_eq!(ids.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_corrupt_watched_file_reads_as_empty() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("watched_movie_ids.json"), b"{oops").unwrap();

    let set = WatchedSet::new(Arc::new(JsonFileStore::new(dir.path())));
    assert!(set.ids().await.is_empty());

    // The set still works and rewrites a clean document
    set.add(7).await;
    assert!(set.contains(7).await);
}
