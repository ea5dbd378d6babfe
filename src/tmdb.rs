use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

use crate::cache::{CachePolicy, ResponseCache};
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{MovieDetail, PopularPage, Verbatim};

#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn fetch_detail(&self, id: i64) -> Result<Verbatim<MovieDetail>, ApiError>;
    async fn fetch_popular(&self, page: i64) -> Result<Verbatim<PopularPage>, ApiError>;
}

pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    cache: ResponseCache,
}

impl TmdbClient {
    pub fn new(base_url: &str, api_key: Option<String>, policy: CachePolicy) -> anyhow::Result<Self> {
        let user_agent = format!("reelview/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            cache: ResponseCache::new(policy),
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            &config.tmdb_base_url,
            config.tmdb_api_key.clone(),
            config.cache_policy(),
        )
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.cache.policy()
    }

    // One GET, no retries. Only successful, well-formed bodies are cached.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Verbatim<T>, ApiError> {
        let api_key = self.api_key.as_deref().ok_or(ApiError::Config)?;
        let key = cache_key(path, query);

        if let Some(body) = self.cache.get(&key).await {
            debug!("Serving {} from response cache", key);
            return decode(&body);
        }

        let url = format!("{}{}", self.base_url, path);
        let res = self
            .client
            .get(&url)
            .query(&[("api_key", api_key)])
            .query(query)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(ApiError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed = decode(&text)?;
        self.cache.insert(key, Arc::from(text)).await;
        Ok(parsed)
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn fetch_detail(&self, id: i64) -> Result<Verbatim<MovieDetail>, ApiError> {
        self.get_json(&format!("/movie/{id}"), &[]).await
    }

    async fn fetch_popular(&self, page: i64) -> Result<Verbatim<PopularPage>, ApiError> {
        self.get_json("/movie/popular", &[("page", page.to_string())])
            .await
    }
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<Verbatim<T>, ApiError> {
    let raw: serde_json::Value = serde_json::from_str(text)?;
    Ok(Verbatim::from_json(raw)?)
}

fn cache_key(path: &str, query: &[(&str, String)]) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let pairs = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{path}?{pairs}")
}

/// Leading integer of a client-supplied token: leading whitespace and a sign
/// are tolerated and anything after the digits is ignored, so
/// `"550-fight-club"` yields `550`. Values wider than `i64` saturate.
fn leading_integer(input: &str) -> Option<i64> {
    let s = input.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    let digits = &s[..end];
    let parsed = if negative {
        format!("-{digits}").parse::<i64>()
    } else {
        digits.parse::<i64>()
    };
    Some(parsed.unwrap_or(if negative { i64::MIN } else { i64::MAX }))
}

/// `None` only when the token carries no digits at all. Zero and negative
/// ids are still forwarded; TMDB decides whether they exist.
pub fn parse_movie_id(input: &str) -> Option<i64> {
    leading_integer(input)
}

/// A missing, blank or non-numeric page means the first page. No bounds are
/// applied; TMDB rejects out-of-range pages itself.
pub fn parse_page(input: Option<&str>) -> i64 {
    input.and_then(leading_integer).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movie_ids_take_leading_digits() {
        assert_eq!(parse_movie_id("550"), Some(550));
        assert_eq!(parse_movie_id(" 550"), Some(550));
        assert_eq!(parse_movie_id("+7"), Some(7));
        assert_eq!(parse_movie_id("550-fight-club"), Some(550));
    }

    #[test]
    fn any_numeric_id_is_accepted() {
        assert_eq!(parse_movie_id("0"), Some(0));
        assert_eq!(parse_movie_id("-5"), Some(-5));
        assert_eq!(parse_movie_id("99999999999"), Some(99_999_999_999));
        assert_eq!(parse_movie_id("99999999999999999999999"), Some(i64::MAX));
        assert_eq!(parse_movie_id("-99999999999999999999999"), Some(i64::MIN));
    }

    #[test]
    fn movie_ids_without_digits_are_rejected() {
        for raw in ["abc", "", "  ", "-", "+", "x550"] {
            assert_eq!(parse_movie_id(raw), None, "{raw:?} should be rejected");
        }
    }

    #[test]
    fn page_defaults_to_first() {
        assert_eq!(parse_page(None), 1);
        assert_eq!(parse_page(Some("")), 1);
        assert_eq!(parse_page(Some("two")), 1);
        assert_eq!(parse_page(Some("3")), 3);
        assert_eq!(parse_page(Some("2abc")), 2);
    }

    #[test]
    fn pages_are_not_bounded() {
        assert_eq!(parse_page(Some("0")), 0);
        assert_eq!(parse_page(Some("-1")), -1);
        assert_eq!(parse_page(Some("501")), 501);
    }

    #[test]
    fn cache_keys_omit_credential() {
        assert_eq!(cache_key("/movie/550", &[]), "/movie/550");
        assert_eq!(
            cache_key("/movie/popular", &[("page", "2".to_string())]),
            "/movie/popular?page=2"
        );
    }

    #[tokio::test]
    async fn missing_credential_fails_before_network() {
        // Unroutable base: any network attempt would surface as Transport.
        let client =
            TmdbClient::new("http://127.0.0.1:9", None, CachePolicy::default()).unwrap();
        assert!(matches!(
            client.fetch_detail(550).await,
            Err(ApiError::Config)
        ));
        assert!(matches!(
            client.fetch_popular(1).await,
            Err(ApiError::Config)
        ));
    }
}
