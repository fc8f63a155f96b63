use std::collections::HashSet;
use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::{
    cache::Prefetcher,
    error::{AppError, AppResult},
    models::{Genre, GenreId, Movie, MovieDetail, MovieId},
    services::providers::MetadataProvider,
    watched::WatchedSet,
};

/// Builds recommendation sessions from a metadata provider
///
/// Candidates come either from the provider's own listings (popular or
/// discover-by-genre) or from an externally supplied title list resolved
/// through search. Watched movies and movies without a poster never enter a
/// session.
pub struct RecommendationService {
    provider: Arc<dyn MetadataProvider>,
    watched: Arc<WatchedSet>,
    prefetcher: Prefetcher,
}

impl RecommendationService {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        watched: Arc<WatchedSet>,
        prefetcher: Prefetcher,
    ) -> Self {
        Self {
            provider,
            watched,
            prefetcher,
        }
    }

    /// Starts a session for the selected genres; no selection means popular
    pub async fn start_session(&self, genres: &[GenreId]) -> AppResult<RecommendationSession> {
        let candidates = if genres.is_empty() {
            self.provider.popular().await?
        } else {
            self.provider.discover(genres).await?
        };

        tracing::info!(
            candidates = candidates.len(),
            provider = self.provider.name(),
            "Fetched recommendation candidates"
        );

        Ok(self.build_session(candidates).await)
    }

    /// Starts a session from an external title list
    ///
    /// Each title is resolved through provider search in parallel; titles
    /// that fail to resolve are skipped. Fails only when nothing resolved
    /// and at least one lookup errored.
    pub async fn session_from_titles(&self, titles: &[String]) -> AppResult<RecommendationSession> {
        let mut tasks = Vec::new();

        for title in titles {
            let provider = self.provider.clone();
            let title = title.clone();
            let task = tokio::spawn(async move {
                provider
                    .search(&title)
                    .await
                    .map(|results| results.into_iter().next())
            });
            tasks.push(task);
        }

        let mut candidates = Vec::new();
        let mut seen = HashSet::new();
        let mut errors = 0usize;

        for task in tasks {
            match task.await {
                Ok(Ok(Some(movie))) => {
                    if seen.insert(movie.id) {
                        candidates.push(movie);
                    }
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Title resolution failed");
                    errors += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Task join error");
                    errors += 1;
                }
            }
        }

        if candidates.is_empty() && errors > 0 {
            return Err(AppError::ExternalApi(
                "Failed to resolve any title".to_string(),
            ));
        }

        tracing::info!(
            titles = titles.len(),
            resolved = candidates.len(),
            skipped = titles.len() - candidates.len(),
            "Resolved title list"
        );

        Ok(self.build_session(candidates).await)
    }

    /// The provider's genre vocabulary, for building a selection UI
    ///
    /// Delegates to the configured provider, keeping consumers away from the
    /// provider wiring.
    pub async fn genres(&self) -> AppResult<Vec<Genre>> {
        self.provider.genres().await
    }

    /// Full details for one movie, fetched on demand
    pub async fn movie_details(&self, id: MovieId) -> AppResult<MovieDetail> {
        self.provider.movie_details(id).await
    }

    async fn build_session(&self, candidates: Vec<Movie>) -> RecommendationSession {
        // Only unwatched movies with a poster can be shown
        let with_posters: Vec<Movie> = candidates
            .into_iter()
            .filter(|m| m.poster_path.is_some())
            .collect();
        let mut pool = self.watched.filter_unwatched(with_posters).await;

        let current = if pool.is_empty() {
            None
        } else {
            Some(pool.remove(0))
        };

        let mut session = RecommendationSession {
            pool,
            current,
            preloaded: None,
            watched: self.watched.clone(),
            prefetcher: self.prefetcher.clone(),
        };
        let first_up = session.pool.first().cloned();
        session.set_preloaded(first_up);

        session
    }
}

/// One user's recommendation rotation
///
/// Holds the candidate pool, the movie currently on show, and a preloaded
/// next pick whose poster is being warmed in the content cache. The current
/// movie is never in the pool; the preloaded one stays in the pool until it
/// is promoted.
pub struct RecommendationSession {
    pool: Vec<Movie>,
    current: Option<Movie>,
    preloaded: Option<Movie>,
    watched: Arc<WatchedSet>,
    prefetcher: Prefetcher,
}

impl std::fmt::Debug for RecommendationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommendationSession")
            .field("pool", &self.pool)
            .field("current", &self.current)
            .field("preloaded", &self.preloaded)
            .finish_non_exhaustive()
    }
}

impl RecommendationSession {
    /// The movie currently on show, if any remain
    pub fn current(&self) -> Option<&Movie> {
        self.current.as_ref()
    }

    /// The movie queued up to be shown next
    pub fn preloaded(&self) -> Option<&Movie> {
        self.preloaded.as_ref()
    }

    /// Candidates left in the pool (excluding the current movie)
    pub fn remaining(&self) -> usize {
        self.pool.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.current.is_none()
    }

    /// Rotates to the next recommendation
    ///
    /// The preloaded movie becomes current and leaves the pool; a new
    /// preloaded pick is drawn at random and its poster prefetched. Returns
    /// the new current movie, or `None` when the pool is exhausted.
    pub fn advance(&mut self) -> Option<&Movie> {
        let next = self.preloaded.take();
        if let Some(next) = &next {
            self.pool.retain(|m| m.id != next.id);
        }
        self.current = next;

        let pick = self.pool.choose(&mut rand::thread_rng()).cloned();
        self.set_preloaded(pick);

        self.current.as_ref()
    }

    /// Records the current movie as watched, then rotates
    ///
    /// A watched ID is persisted immediately and never recommended again,
    /// in this session or any later one.
    pub async fn mark_watched(&mut self) -> Option<&Movie> {
        if let Some(current) = self.current.take() {
            self.watched.add(current.id).await;
        }
        self.advance()
    }

    fn set_preloaded(&mut self, movie: Option<Movie>) {
        self.preloaded = movie;
        if let Some(key) = self.preloaded.as_ref().and_then(Movie::poster_key) {
            tracing::debug!(key = %key, "Warming poster for the next recommendation");
            self.prefetcher.prefetch(key);
        }
    }
}
