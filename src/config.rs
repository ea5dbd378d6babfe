use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tracing::warn;

use crate::cache::CachePolicy;

pub const DEFAULT_TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
const DEFAULT_CACHE_MAX_ENTRIES: usize = 1024;

/// Process configuration, read once at startup and handed to the components
/// that need it.
#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub tmdb_api_key: Option<String>,
    pub tmdb_base_url: String,
    pub image_base_url: String,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
}

impl Config {
    /// Reads the configuration from the process environment. Call
    /// `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "3146".to_string())
            .parse()
            .context("PORT")?;

        let tmdb_api_key = env::var("TMDB_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        if tmdb_api_key.is_none() {
            warn!("TMDB_API_KEY is not set - movie requests will fail until it is configured");
        }

        let tmdb_base_url =
            env::var("TMDB_BASE_URL").unwrap_or_else(|_| DEFAULT_TMDB_BASE.to_string());
        let image_base_url =
            env::var("TMDB_IMAGE_BASE_URL").unwrap_or_else(|_| DEFAULT_IMAGE_BASE.to_string());

        let cache_ttl_secs = parse_or("TMDB_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;
        let cache_max_entries = parse_or("TMDB_CACHE_MAX_ENTRIES", DEFAULT_CACHE_MAX_ENTRIES)?;

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            tmdb_api_key,
            tmdb_base_url,
            image_base_url,
            cache_ttl_secs,
            cache_max_entries,
        })
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy::new(
            Duration::from_secs(self.cache_ttl_secs),
            self.cache_max_entries,
        )
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().context(key.to_string()),
        _ => Ok(default),
    }
}
