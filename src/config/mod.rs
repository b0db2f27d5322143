//! Runtime configuration, loaded from the environment.
//!
//! Credentials are required; everything else has a default. Page selectors
//! live in their own file, see [`selectors`].

pub mod selectors;

use figment::Figment;
use figment::providers::Env;
use fundu::DurationParser;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub use selectors::Selectors;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
    #[error("invalid `{field}` selector {selector:?}: {message}")]
    InvalidSelector {
        field: &'static str,
        selector: String,
        message: String,
    },
}

/// Main application configuration.
#[derive(Deserialize, custom_debug_derive::Debug)]
pub struct Config {
    /// Gemini API key, used for both embeddings and answer generation.
    #[debug(skip)]
    pub google_api_key: String,
    #[debug(skip)]
    pub pinecone_api_key: String,
    /// Pinecone environment/region, e.g. `us-east-1-aws`.
    pub pinecone_environment: String,
    #[serde(default = "default_pinecone_index")]
    pub pinecone_index: String,
    /// Skips host discovery through the Pinecone controller when set.
    #[serde(default)]
    pub pinecone_host: Option<Url>,
    #[serde(default)]
    pub pinecone_namespace: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_generation_model")]
    pub generation_model: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: Url,

    /// Log level for this crate's targets (`RUST_LOG` takes precedence).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Time given to client-side rendering after navigation completes.
    #[serde(
        default = "default_render_settle",
        deserialize_with = "deserialize_duration"
    )]
    pub render_settle: Duration,
    #[serde(
        default = "default_http_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub http_timeout: Duration,
    /// Browser binary; auto-detected when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    #[serde(default = "default_selectors_file")]
    pub selectors_file: PathBuf,
    /// Number of matches `ask` pulls from the index.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Config {
    /// Load configuration from process environment variables.
    ///
    /// Keys are matched case-insensitively against field names
    /// (`GOOGLE_API_KEY` -> `google_api_key`).
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Figment::new().merge(Env::raw()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        Ok(figment.extract()?)
    }
}

fn default_pinecone_index() -> String {
    "reviews".to_owned()
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_owned()
}

fn default_generation_model() -> String {
    "gemini-1.5-flash".to_owned()
}

fn default_gemini_base_url() -> Url {
    Url::parse("https://generativelanguage.googleapis.com").expect("static URL is valid")
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_render_settle() -> Duration {
    Duration::from_secs(3)
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_selectors_file() -> PathBuf {
    PathBuf::from("selectors.toml")
}

fn default_top_k() -> usize {
    5
}

/// Parse a human-readable duration such as `3s`, `1500ms` or `2m`.
///
/// A bare number is read as seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let parsed = DurationParser::with_all_time_units()
        .parse(input.trim())
        .map_err(|e| e.to_string())?;
    Duration::try_from(parsed).map_err(|e| e.to_string())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    // Env values that look numeric arrive as integers, not strings.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDuration {
        Seconds(u64),
        Text(String),
    }

    match RawDuration::deserialize(deserializer)? {
        RawDuration::Seconds(secs) => Ok(Duration::from_secs(secs)),
        RawDuration::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}
