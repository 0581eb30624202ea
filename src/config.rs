use std::path::PathBuf;

use serde::Deserialize;

use crate::services::letterboxd::BulkFetchOptions;
use crate::services::recommender::UpdateParams;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Serialized factor model
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Film metadata table
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// File holding the Letterboxd API key and secret on separate lines
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,

    /// Letterboxd API base URL
    #[serde(default = "default_letterboxd_api_url")]
    pub letterboxd_api_url: String,

    /// Letterboxd website, used for username lookups
    #[serde(default = "default_letterboxd_site_url")]
    pub letterboxd_site_url: String,

    #[serde(default = "default_letterboxd_timeout_secs")]
    pub letterboxd_timeout_secs: u64,

    #[serde(default = "default_fetch_max_retries")]
    pub fetch_max_retries: u32,

    #[serde(default = "default_fetch_max_concurrency")]
    pub fetch_max_concurrency: usize,

    #[serde(default = "default_fetch_progress_every")]
    pub fetch_progress_every: usize,

    /// Upper bound on pages followed by a single paginated fetch
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    #[serde(default = "default_update_learning_rate")]
    pub update_learning_rate: f64,

    #[serde(default = "default_update_epochs")]
    pub update_epochs: usize,

    /// Clamp predictions to the model's rating scale
    #[serde(default = "default_bound_ratings")]
    pub bound_ratings: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/model.json")
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/film_data.json")
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.txt")
}

fn default_letterboxd_api_url() -> String {
    "https://api.letterboxd.com/api/v0".to_string()
}

fn default_letterboxd_site_url() -> String {
    "https://letterboxd.com".to_string()
}

fn default_letterboxd_timeout_secs() -> u64 {
    30
}

fn default_fetch_max_retries() -> u32 {
    15
}

fn default_fetch_max_concurrency() -> usize {
    50
}

fn default_fetch_progress_every() -> usize {
    1000
}

fn default_max_pages() -> usize {
    500
}

fn default_update_learning_rate() -> f64 {
    0.01
}

fn default_update_epochs() -> usize {
    10
}

fn default_bound_ratings() -> bool {
    true
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?
            .validate()
    }

    /// Rejects bounds that would stop work before it starts
    pub fn validate(self) -> anyhow::Result<Self> {
        if self.max_pages == 0 {
            anyhow::bail!("MAX_PAGES must be at least 1");
        }
        if self.fetch_max_concurrency == 0 {
            anyhow::bail!("FETCH_MAX_CONCURRENCY must be at least 1");
        }
        Ok(self)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn bulk_fetch_options(&self) -> BulkFetchOptions {
        BulkFetchOptions {
            max_retries: self.fetch_max_retries,
            max_concurrency: self.fetch_max_concurrency,
            progress_every: self.fetch_progress_every,
        }
    }

    pub fn update_params(&self) -> UpdateParams {
        UpdateParams {
            learning_rate: self.update_learning_rate,
            n_epochs: self.update_epochs,
        }
    }
}
