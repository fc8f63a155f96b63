use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::error::AppResult;
use crate::models::{Movie, MovieId};

/// Storage key for the watched-ID document
const WATCHED_IDS_NAME: &str = "watched_movie_ids";

/// Persisted store for small named JSON documents
///
/// The watched set is the only writer; documents are rewritten whole, never
/// appended to.
#[async_trait::async_trait]
pub trait WatchedStore: Send + Sync {
    /// Loads the raw JSON text stored under `name`
    async fn load(&self, name: &str) -> AppResult<Option<String>>;

    /// Stores the raw JSON text under `name`, replacing any previous value
    async fn save(&self, name: &str, raw_json: &str) -> AppResult<()>;
}

/// Store backed by one `<name>.json` file per document
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }
}

#[async_trait::async_trait]
impl WatchedStore for JsonFileStore {
    async fn load(&self, name: &str) -> AppResult<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(name)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, name: &str, raw_json: &str) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(name), raw_json).await?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: std::sync::Mutex<HashMap<String, String>>,
}

#[async_trait::async_trait]
impl WatchedStore for MemoryStore {
    async fn load(&self, name: &str) -> AppResult<Option<String>> {
        Ok(self.inner.lock().unwrap().get(name).cloned())
    }

    async fn save(&self, name: &str, raw_json: &str) -> AppResult<()> {
        self.inner
            .lock()
            .unwrap()
            .insert(name.to_string(), raw_json.to_string());
        Ok(())
    }
}

/// Persisted, append-only set of watched movie IDs
///
/// Loaded lazily on first access; every effective insertion rewrites the full
/// sorted ID sequence to the store. Read problems (missing or corrupt
/// documents) degrade to the empty set, and write failures are logged rather
/// than surfaced, so nothing here can take the process down.
pub struct WatchedSet {
    store: Arc<dyn WatchedStore>,
    name: String,
    ids: Mutex<Option<BTreeSet<MovieId>>>,
}

impl WatchedSet {
    pub fn new(store: Arc<dyn WatchedStore>) -> Self {
        Self::with_name(store, WATCHED_IDS_NAME)
    }

    pub fn with_name(store: Arc<dyn WatchedStore>, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
            ids: Mutex::new(None),
        }
    }

    /// All watched IDs
    pub async fn ids(&self) -> BTreeSet<MovieId> {
        self.loaded().await.as_ref().unwrap().clone()
    }

    pub async fn contains(&self, id: MovieId) -> bool {
        self.loaded().await.as_ref().unwrap().contains(&id)
    }

    /// Records `id` as watched; re-adding a known ID changes nothing
    pub async fn add(&self, id: MovieId) {
        let mut guard = self.loaded().await;
        let ids = guard.as_mut().unwrap();
        if !ids.insert(id) {
            return;
        }

        let snapshot: Vec<MovieId> = ids.iter().copied().collect();
        let raw = match serde_json::to_string(&snapshot) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize watched IDs");
                return;
            }
        };

        if let Err(e) = self.store.save(&self.name, &raw).await {
            tracing::error!(error = %e, name = %self.name, "Failed to persist watched IDs");
        }

        tracing::debug!(movie_id = id, total = snapshot.len(), "Marked movie as watched");
    }

    /// Retains only candidates the user has not watched yet
    pub async fn filter_unwatched(&self, movies: Vec<Movie>) -> Vec<Movie> {
        let guard = self.loaded().await;
        let ids = guard.as_ref().unwrap();
        movies.into_iter().filter(|m| !ids.contains(&m.id)).collect()
    }

    /// Lazily loads the persisted document on first access
    async fn loaded(&self) -> MutexGuard<'_, Option<BTreeSet<MovieId>>> {
        let mut guard = self.ids.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_store().await);
        }
        guard
    }

    async fn read_store(&self) -> BTreeSet<MovieId> {
        match self.store.load(&self.name).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<MovieId>>(&raw) {
                Ok(ids) => ids.into_iter().collect(),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        name = %self.name,
                        "Corrupt watched-ID document, starting empty"
                    );
                    BTreeSet::new()
                }
            },
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    name = %self.name,
                    "Watched-ID read failed, starting empty"
                );
                BTreeSet::new()
            }
        }
    }
}
