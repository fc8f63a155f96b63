use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{
    cache::{CacheKey, ContentCache},
    images::{ImageDecoder, ImageFetcher, PosterImage},
};

/// Published outcome of one coalesced fetch
///
/// Failure collapses to `Done(None)`: followers share the leader's outcome
/// and re-requesting stays the consumer's decision.
#[derive(Clone)]
enum FlightStatus {
    Pending,
    Done(Option<Bytes>),
}

enum FlightRole {
    Leader(watch::Sender<FlightStatus>),
    Follower(watch::Receiver<FlightStatus>),
}

/// Delivery states observed by one content consumer
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Ready(PosterImage),
    Failed,
}

impl LoadState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoadState::Loading)
    }
}

/// Cache-or-fetch orchestration for image content
///
/// Checks the content cache, falls back to the fetcher on a miss, validates
/// the payload through the decoder boundary, and stores the raw bytes.
/// Concurrent requests for the same key coalesce onto a single fetch; every
/// waiter receives the leader's outcome. Cloning yields another handle to the
/// same cache and in-flight table.
#[derive(Clone)]
pub struct ContentService {
    cache: ContentCache,
    fetcher: Arc<dyn ImageFetcher>,
    decoder: Arc<dyn ImageDecoder>,
    inflight: Arc<Mutex<HashMap<CacheKey, watch::Receiver<FlightStatus>>>>,
}

impl ContentService {
    pub fn new(
        cache: ContentCache,
        fetcher: Arc<dyn ImageFetcher>,
        decoder: Arc<dyn ImageDecoder>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            decoder,
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The process-wide content cache behind this service
    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Returns the raw bytes for `key`, fetching and caching on a miss
    ///
    /// `None` means the fetch or validation failed; the failure has already
    /// been logged and nothing was cached.
    pub async fn fetch_bytes(&self, key: &CacheKey) -> Option<Bytes> {
        loop {
            if let Some(entry) = self.cache.get(key) {
                return Some(entry.bytes.clone());
            }

            match self.join_flight(key) {
                FlightRole::Leader(tx) => {
                    let outcome = self.fetch_and_store(key).await;
                    self.inflight.lock().unwrap().remove(key);
                    // All followers may be gone; that is fine.
                    let _ = tx.send(FlightStatus::Done(outcome.clone()));
                    return outcome;
                }
                FlightRole::Follower(mut rx) => {
                    match rx
                        .wait_for(|status| matches!(status, FlightStatus::Done(_)))
                        .await
                    {
                        Ok(status) => {
                            if let FlightStatus::Done(outcome) = &*status {
                                return outcome.clone();
                            }
                        }
                        // Leader dropped without publishing (cancelled
                        // mid-fetch). Take another lap and lead if needed.
                        Err(_) => continue,
                    }
                }
            }
        }
    }

    /// Joins the in-flight fetch for `key`, becoming leader if there is none
    fn join_flight(&self, key: &CacheKey) -> FlightRole {
        let mut inflight = self.inflight.lock().unwrap();

        if let Some(rx) = inflight.get(key) {
            let rx = rx.clone();
            // A cancelled leader leaves a closed channel stuck on Pending.
            let stale =
                rx.has_changed().is_err() && matches!(&*rx.borrow(), FlightStatus::Pending);
            if !stale {
                return FlightRole::Follower(rx);
            }
        }

        let (tx, rx) = watch::channel(FlightStatus::Pending);
        inflight.insert(key.clone(), rx);
        FlightRole::Leader(tx)
    }

    /// Single fetch attempt: fetch, validate, cache
    ///
    /// Exactly one cache put per successful fetch; failures cache nothing.
    async fn fetch_and_store(&self, key: &CacheKey) -> Option<Bytes> {
        let bytes = match self.fetcher.fetch(key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    error = %e,
                    fetcher = self.fetcher.name(),
                    "Content fetch failed"
                );
                return None;
            }
        };

        // Validation gates the put so undecodable payloads never enter the cache
        if let Err(e) = self.decoder.decode(&bytes) {
            tracing::warn!(key = %key, error = %e, "Fetched content failed validation");
            return None;
        }

        self.cache.put(key.clone(), bytes.clone());
        Some(bytes)
    }

    /// Starts a load for one consumer and one key
    ///
    /// The returned handle observes `Loading` until the decoded value (or
    /// failure) is published. A handle is bound to its key for its whole
    /// lifetime; a different key means a new load.
    pub fn load(&self, key: CacheKey) -> ContentLoad {
        let (tx, rx) = watch::channel(LoadState::Loading);
        let service = self.clone();
        let task_key = key.clone();

        let task = tokio::spawn(async move {
            let state = match service.fetch_bytes(&task_key).await {
                Some(bytes) => match service.decoder.decode(&bytes) {
                    Ok(image) => LoadState::Ready(image),
                    Err(e) => {
                        tracing::warn!(key = %task_key, error = %e, "Cached content failed to decode");
                        LoadState::Failed
                    }
                },
                None => LoadState::Failed,
            };
            // The consumer may have dropped its handle; nothing to deliver then.
            let _ = tx.send(state);
        });

        ContentLoad { key, rx, task }
    }
}

/// Handle held by the consumer of one in-progress load
///
/// Dropping the handle stops delivery and aborts the delivery task.
#[derive(Debug)]
pub struct ContentLoad {
    key: CacheKey,
    rx: watch::Receiver<LoadState>,
    task: JoinHandle<()>,
}

impl ContentLoad {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Current delivery state
    pub fn state(&self) -> LoadState {
        self.rx.borrow().clone()
    }

    /// Waits for the terminal state of this load
    pub async fn wait(&mut self) -> LoadState {
        match self.rx.wait_for(LoadState::is_terminal).await {
            Ok(state) => state.clone(),
            Err(_) => LoadState::Failed,
        }
    }
}

impl Drop for ContentLoad {
    fn drop(&mut self) {
        self.task.abort();
    }
}
