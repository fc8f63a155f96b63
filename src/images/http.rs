use bytes::Bytes;
use reqwest::Client as HttpClient;

use crate::{
    cache::CacheKey,
    error::{AppError, AppResult},
    images::ImageFetcher,
};

const POSTER_SIZE: &str = "w500";
const BACKDROP_SIZE: &str = "w780";

/// Fetches image bytes from a TMDB-style image CDN
///
/// Keys carry provider-relative paths; the fetcher composes the final URL as
/// `{base}/{size}{path}` with a per-kind size segment.
#[derive(Clone)]
pub struct HttpImageFetcher {
    http_client: HttpClient,
    base_url: String,
}

impl HttpImageFetcher {
    pub fn new(http_client: HttpClient, base_url: String) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn image_url(&self, key: &CacheKey) -> String {
        let size = match key {
            CacheKey::Poster(_) => POSTER_SIZE,
            CacheKey::Backdrop(_) => BACKDROP_SIZE,
        };
        format!("{}/{}{}", self.base_url, size, key.image_path())
    }
}

#[async_trait::async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, key: &CacheKey) -> AppResult<Bytes> {
        let url = self.image_url(key);

        let response = self.http_client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::ExternalApi(format!(
                "Image CDN returned status {} for {}",
                status, url
            )));
        }

        let bytes = response.bytes().await?;

        tracing::debug!(
            key = %key,
            bytes = bytes.len(),
            fetcher = self.name(),
            "Image fetched"
        );

        Ok(bytes)
    }

    fn name(&self) -> &'static str {
        "image-cdn"
    }
}
