/// Movie metadata provider abstraction
///
/// This module provides a pluggable architecture for movie metadata sources.
/// A provider covers candidate listing (popular, discover-by-genre, title
/// search), the genre vocabulary, and per-movie details, so one configured
/// source serves a whole recommendation session.
use crate::{
    error::AppResult,
    models::{Genre, GenreId, Movie, MovieDetail, MovieId},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Trait for movie metadata providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Currently popular movies, for sessions with no genre selection
    async fn popular(&self) -> AppResult<Vec<Movie>>;

    /// Movies matching the selected genres
    async fn discover(&self, genres: &[GenreId]) -> AppResult<Vec<Movie>>;

    /// Free-text title search
    ///
    /// Returns matches best-first; callers typically take the first result.
    async fn search(&self, query: &str) -> AppResult<Vec<Movie>>;

    /// The provider's genre vocabulary
    async fn genres(&self) -> AppResult<Vec<Genre>>;

    /// Full details for one movie, including credits
    async fn movie_details(&self, id: MovieId) -> AppResult<MovieDetail>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
