/// TMDB API provider
///
/// Serves candidate listings and per-movie details from The Movie Database.
///
/// API flow:
/// 1. Candidates: /movie/popular or /discover/movie?with_genres=a,b,c
/// 2. Title search: /search/movie?query=...
/// 3. Details: /movie/{id}?append_to_response=credits
///
/// Every request carries the api_key and language query parameters.
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

use crate::{
    error::{AppError, AppResult},
    models::{Genre, GenreId, GenreList, Movie, MovieDetail, MovieId, MoviePage},
    services::providers::MetadataProvider,
};

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    language: String,
}

impl TmdbProvider {
    pub fn new(
        http_client: HttpClient,
        api_key: String,
        api_url: String,
        language: String,
    ) -> Self {
        Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            language,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    /// Comma-joined genre list, the form the discover endpoint expects
    fn genre_param(genres: &[GenreId]) -> String {
        genres
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Issues a GET with the standing api_key/language parameters
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        extra_query: &[(&str, String)],
    ) -> AppResult<T> {
        let url = self.endpoint(path);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .query(extra_query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn popular(&self) -> AppResult<Vec<Movie>> {
        let page: MoviePage = self.get_json("movie/popular", &[]).await?;

        tracing::info!(
            results = page.results.len(),
            provider = self.name(),
            "Popular movies fetched"
        );

        Ok(page.results)
    }

    async fn discover(&self, genres: &[GenreId]) -> AppResult<Vec<Movie>> {
        let page: MoviePage = self
            .get_json(
                "discover/movie",
                &[("with_genres", Self::genre_param(genres))],
            )
            .await?;

        tracing::info!(
            genres = genres.len(),
            results = page.results.len(),
            provider = self.name(),
            "Discover completed"
        );

        Ok(page.results)
    }

    async fn search(&self, query: &str) -> AppResult<Vec<Movie>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let page: MoviePage = self
            .get_json("search/movie", &[("query", query.to_string())])
            .await?;

        tracing::info!(
            query = %query,
            results = page.results.len(),
            provider = self.name(),
            "Title search completed"
        );

        Ok(page.results)
    }

    async fn genres(&self) -> AppResult<Vec<Genre>> {
        let list: GenreList = self.get_json("genre/movie/list", &[]).await?;
        Ok(list.genres)
    }

    async fn movie_details(&self, id: MovieId) -> AppResult<MovieDetail> {
        let detail: MovieDetail = self
            .get_json(
                &format!("movie/{}", id),
                &[("append_to_response", "credits".to_string())],
            )
            .await?;

        tracing::info!(
            movie_id = id,
            provider = self.name(),
            "Movie details fetched"
        );

        Ok(detail)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_provider() -> TmdbProvider {
        TmdbProvider::new(
            reqwest::Client::new(),
            "test_key".to_string(),
            "https://api.themoviedb.org/3/".to_string(),
            "en-US".to_string(),
        )
    }

    #[test]
    fn test_endpoint_joins_cleanly() {
        let provider = create_test_provider();
        assert_eq!(
            provider.endpoint("movie/popular"),
            "https://api.themoviedb.org/3/movie/popular"
        );
        assert_eq!(
            provider.endpoint("/movie/603"),
            "https://api.themoviedb.org/3/movie/603"
        );
    }

    #[test]
    fn test_genre_param_joins_with_commas() {
        assert_eq!(TmdbProvider::genre_param(&[28, 12, 878]), "28,12,878");
        assert_eq!(TmdbProvider::genre_param(&[35]), "35");
        assert_eq!(TmdbProvider::genre_param(&[]), "");
    }

    #[tokio::test]
    async fn test_empty_search_query_is_rejected() {
        let provider = create_test_provider();
        let err = provider.search("   ").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_genre_list_deserialization() {
        let json = r#"{
            "genres": [
                {"id": 28, "name": "Action"},
                {"id": 878, "name": "Science Fiction"}
            ]
        }"#;

        let list: GenreList = serde_json::from_str(json).unwrap();
        assert_eq!(list.genres.len(), 2);
        assert_eq!(list.genres[1].name, "Science Fiction");
    }
}
