use bytes::Bytes;

/// Image content boundaries
///
/// This module owns the two narrow seams the cache core consumes: fetching
/// raw image bytes for a key, and turning fetched bytes into a displayable
/// value. Neither side performs retries or pixel-level decoding.
use crate::{
    cache::CacheKey,
    error::{AppError, AppResult},
};

pub mod http;

pub use http::HttpImageFetcher;

/// Trait for image byte sources
///
/// A fetcher resolves a cache key to raw bytes from a remote source. One call
/// is one attempt: failures are reported once and retry policy stays with the
/// caller. Dropping the returned future abandons the request.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the raw bytes behind `key`
    async fn fetch(&self, key: &CacheKey) -> AppResult<Bytes>;

    /// Fetcher name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Image container formats recognized by signature sniffing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageFormat {
    /// Identify the container format from the payload's leading bytes
    pub fn sniff(bytes: &[u8]) -> Option<ImageFormat> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(b"GIF8") {
            Some(ImageFormat::Gif)
        } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
            Some(ImageFormat::Webp)
        } else {
            None
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }
}

/// A displayable image value: recognized format plus a shared view of the bytes
#[derive(Debug, Clone, PartialEq)]
pub struct PosterImage {
    pub format: ImageFormat,
    pub bytes: Bytes,
}

/// Trait for the bytes→displayable boundary
///
/// Decode failure is treated identically to fetch failure by the callers in
/// `crate::cache`: no value is delivered and nothing is cached.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &Bytes) -> AppResult<PosterImage>;
}

/// Decoder that validates the image signature without touching pixel data
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatSniffer;

impl ImageDecoder for FormatSniffer {
    fn decode(&self, bytes: &Bytes) -> AppResult<PosterImage> {
        match ImageFormat::sniff(bytes) {
            Some(format) => Ok(PosterImage {
                format,
                bytes: bytes.clone(),
            }),
            None => Err(AppError::Decode(format!(
                "unrecognized image signature in {} byte payload",
                bytes.len()
            ))),
        }
    }
}
