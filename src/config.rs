use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// TMDB API key
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Image CDN base URL (poster and backdrop files)
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,

    /// Preferred metadata language (ISO 639-1 plus region)
    #[serde(default = "default_language")]
    pub language: String,

    /// Maximum number of entries held by the content cache
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Maximum total payload bytes held by the content cache
    #[serde(default = "default_cache_max_bytes")]
    pub cache_max_bytes: u64,

    /// Directory for persisted application data (watched-ID set)
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_image_base_url() -> String {
    "https://image.tmdb.org/t/p".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_cache_max_entries() -> usize {
    256
}

fn default_cache_max_bytes() -> u64 {
    64 * 1024 * 1024
}

fn default_data_dir() -> String {
    "./data".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
