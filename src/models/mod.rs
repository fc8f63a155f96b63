use serde::{Deserialize, Serialize};

use crate::cache::CacheKey;

/// TMDB-issued movie identifier
pub type MovieId = u64;

/// TMDB-issued genre identifier
pub type GenreId = u32;

/// A movie candidate as returned by discover/popular/search endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
}

impl Movie {
    /// Cache key for this movie's poster image, when one exists
    pub fn poster_key(&self) -> Option<CacheKey> {
        self.poster_path.as_ref().map(|p| CacheKey::Poster(p.clone()))
    }

    /// Cache key for this movie's backdrop image, when one exists
    pub fn backdrop_key(&self) -> Option<CacheKey> {
        self.backdrop_path
            .as_ref()
            .map(|p| CacheKey::Backdrop(p.clone()))
    }
}

/// One page of movie results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoviePage {
    #[serde(default)]
    pub page: u32,
    pub results: Vec<Movie>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

/// A movie genre
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

/// Response wrapper for the genre list endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenreList {
    pub genres: Vec<Genre>,
}

/// Full movie details, including credits when requested
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetail {
    pub id: MovieId,
    pub title: String,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<u32>,
    pub tagline: Option<String>,
    #[serde(default)]
    pub production_countries: Vec<ProductionCountry>,
    #[serde(default)]
    pub credits: Credits,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductionCountry {
    pub name: String,
    #[serde(default)]
    pub iso_3166_1: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Credits {
    pub cast: Vec<CastMember>,
}

impl Credits {
    /// Names of the first `limit` billed cast members
    pub fn top_billed(&self, limit: usize) -> Vec<&str> {
        self.cast
            .iter()
            .take(limit)
            .map(|member| member.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastMember {
    pub id: u64,
    pub name: String,
    pub character: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_page_deserialization() {
        let json = r#"{
            "page": 1,
            "results": [
                {
                    "id": 27205,
                    "title": "Inception",
                    "poster_path": "/oYuLEt3zVCKq57qu2F8dT7NIa6f.jpg",
                    "backdrop_path": "/s3TBrRGB1iav7gFOCNx3H31MoES.jpg"
                },
                {
                    "id": 603,
                    "title": "The Matrix",
                    "poster_path": null
                }
            ],
            "total_pages": 42,
            "total_results": 834
        }"#;

        let page: MoviePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0].id, 27205);
        assert_eq!(page.results[0].title, "Inception");
        assert!(page.results[1].poster_path.is_none());
        assert!(page.results[1].backdrop_path.is_none());
        assert_eq!(page.total_pages, 42);
    }

    #[test]
    fn test_movie_poster_key() {
        let movie = Movie {
            id: 27205,
            title: "Inception".to_string(),
            poster_path: Some("/oYuLEt3zVCKq57qu2F8dT7NIa6f.jpg".to_string()),
            backdrop_path: None,
        };

        assert_eq!(
            movie.poster_key(),
            Some(CacheKey::Poster("/oYuLEt3zVCKq57qu2F8dT7NIa6f.jpg".to_string()))
        );
        assert_eq!(movie.backdrop_key(), None);
    }

    #[test]
    fn test_movie_detail_deserialization() {
        let json = r#"{
            "id": 27205,
            "title": "Inception",
            "overview": "Cobb, a skilled thief...",
            "release_date": "2010-07-15",
            "runtime": 148,
            "tagline": "Your mind is the scene of the crime.",
            "production_countries": [
                {"iso_3166_1": "GB", "name": "United Kingdom"},
                {"iso_3166_1": "US", "name": "United States of America"}
            ],
            "credits": {
                "cast": [
                    {"id": 6193, "name": "Leonardo DiCaprio", "character": "Dom Cobb"},
                    {"id": 24045, "name": "Joseph Gordon-Levitt", "character": "Arthur"}
                ]
            }
        }"#;

        let detail: MovieDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.runtime, Some(148));
        assert_eq!(detail.production_countries.len(), 2);
        assert_eq!(detail.credits.cast[0].name, "Leonardo DiCaprio");
    }

    #[test]
    fn test_movie_detail_without_credits() {
        let json = r#"{
            "id": 603,
            "title": "The Matrix",
            "overview": null,
            "release_date": null,
            "runtime": null,
            "tagline": null
        }"#;

        let detail: MovieDetail = serde_json::from_str(json).unwrap();
        assert!(detail.credits.cast.is_empty());
        assert!(detail.production_countries.is_empty());
    }

    #[test]
    fn test_top_billed_limits_cast() {
        let credits = Credits {
            cast: vec![
                CastMember {
                    id: 1,
                    name: "First".to_string(),
                    character: None,
                },
                CastMember {
                    id: 2,
                    name: "Second".to_string(),
                    character: None,
                },
                CastMember {
                    id: 3,
                    name: "Third".to_string(),
                    character: None,
                },
            ],
        };

        assert_eq!(credits.top_billed(2), vec!["First", "Second"]);
        assert_eq!(credits.top_billed(10).len(), 3);
    }
}
