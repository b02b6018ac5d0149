//! HTTP client with rate limiting for the upstream metadata provider
//!
//! This module provides a rate-limited HTTP client that respects the
//! provider's request limits and implements retry logic with exponential
//! backoff. It is exposed to the rest of the crate through the
//! [`ListingSource`] trait.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::error::{CatalogError, Result};
use crate::types::{MediaKind, RawRecord, SeasonRecord};

/// Upper bound for a single retry delay
const MAX_BACKOFF_MS: u64 = 30_000;

/// Rate limiter to control request frequency
///
/// Ensures that requests are spaced at least `min_interval` apart
/// to stay within the upstream provider's quota.
pub struct RateLimiter {
    /// Minimum interval between requests
    min_interval: Duration,
    /// Timestamp of the last request
    last_request: Arc<Mutex<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified requests per second
    ///
    /// # Arguments
    /// * `requests_per_second` - Maximum number of requests allowed per second
    ///
    /// # Example
    /// ```
    /// use reelcheck_core::client::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(4.0); // 4 requests per second
    /// ```
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = Duration::from_secs_f64(1.0 / requests_per_second.max(0.001));
        let now = Instant::now();
        Self {
            min_interval,
            last_request: Arc::new(Mutex::new(now.checked_sub(min_interval).unwrap_or(now))),
        }
    }

    /// Acquire permission to make a request
    ///
    /// This method will wait if necessary to ensure the minimum interval
    /// between requests is respected.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();

        if elapsed < self.min_interval {
            let wait_time = self.min_interval - elapsed;
            sleep(wait_time).await;
        }

        *last = Instant::now();
    }

    /// Get the minimum interval between requests
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// One page of an upstream listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Listing {
    #[serde(default)]
    pub page: u32,
    /// Raw records; a payload without `results` is malformed
    pub results: Vec<Value>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u64,
}

/// Read-only access to the upstream metadata provider
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch one page of a listing endpoint such as `/movie/popular`.
    async fn fetch_listing(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Listing>;

    /// Fetch a single title, `None` when the provider does not know it.
    async fn fetch_by_id(&self, kind: MediaKind, title_id: u64) -> Result<Option<RawRecord>>;

    /// Fetch one season of a series with its episodes, `None` when unknown.
    async fn fetch_season(&self, title_id: u64, season: u32) -> Result<Option<SeasonRecord>>;
}

/// HTTP client for the upstream metadata provider with rate limiting and retry logic
///
/// This client automatically:
/// - Limits request rate to stay within the provider's quota
/// - Retries on transient errors (429, 5xx) with exponential backoff
/// - Appends the API key and language parameters
pub struct UpstreamClient {
    /// Underlying HTTP client
    client: reqwest::Client,
    /// Rate limiter for request throttling
    rate_limiter: RateLimiter,
    config: UpstreamConfig,
}

impl UpstreamClient {
    /// Create a new client with default configuration
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn new() -> Result<Self> {
        Self::with_config(UpstreamConfig::default())
    }

    /// Create a new client with custom configuration
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn with_config(config: UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let rate_limiter = RateLimiter::new(config.requests_per_second);

        Ok(Self {
            client,
            rate_limiter,
            config,
        })
    }

    /// Build the absolute URL for `path` with encoded query parameters.
    fn build_url(&self, path: &str, params: &[(&str, String)]) -> String {
        let mut query: Vec<String> = Vec::with_capacity(params.len() + 2);
        if let Some(key) = &self.config.api_key {
            query.push(format!("api_key={}", urlencoding::encode(key)));
        }
        query.push(format!("language={}", urlencoding::encode(&self.config.language)));
        query.extend(
            params
                .iter()
                .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value))),
        );

        format!(
            "{}{}?{}",
            self.config.base_url.trim_end_matches('/'),
            path,
            query.join("&")
        )
    }

    /// Fetch a JSON document from the provider
    ///
    /// This method handles rate limiting and retries automatically.
    ///
    /// # Errors
    /// - `CatalogError::Http` - Network or HTTP error
    /// - `CatalogError::RateLimited` - Server returned 429 after all retries
    /// - `CatalogError::NotFound` - Server returned 404
    /// - `CatalogError::UpstreamStatus` - Any other non-success status
    /// - `CatalogError::Json` - The body is not valid JSON
    pub async fn fetch_json(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = self.build_url(path, params);
        let body = self.fetch_with_retry(&url, 0).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Internal method to fetch with retry logic
    fn fetch_with_retry<'a>(
        &'a self,
        url: &'a str,
        attempt: u32,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            // Wait for rate limiter before making request
            self.rate_limiter.acquire().await;

            debug!(path = redact(url), attempt, "Upstream request");
            let response = self.client.get(url).send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response.text().await?);
            }

            // 404 is final
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(CatalogError::NotFound(redact(url).to_string()));
            }

            let retryable =
                status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && attempt < self.config.max_retries {
                let delay = self.calculate_backoff_delay(attempt);
                warn!(
                    path = redact(url),
                    status = status.as_u16(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Upstream request failed, retrying"
                );
                sleep(delay).await;
                return self.fetch_with_retry(url, attempt + 1).await;
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(CatalogError::RateLimited);
            }

            Err(CatalogError::UpstreamStatus {
                status: status.as_u16(),
                url: redact(url).to_string(),
            })
        })
    }

    /// Calculate exponential backoff delay for retry, capped at 30 s
    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let delay_ms = self
            .config
            .retry_base_delay_ms
            .saturating_mul(factor)
            .min(MAX_BACKOFF_MS);
        Duration::from_millis(delay_ms)
    }

    /// Get a reference to the rate limiter (for testing)
    #[cfg(test)]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}

#[async_trait]
impl ListingSource for UpstreamClient {
    async fn fetch_listing(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Listing> {
        let value = self.fetch_json(endpoint, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn fetch_by_id(&self, kind: MediaKind, title_id: u64) -> Result<Option<RawRecord>> {
        if title_id == 0 {
            return Err(CatalogError::InvalidId(title_id));
        }
        let path = format!("/{}/{}", kind, title_id);
        match self.fetch_json(&path, &[]).await {
            Ok(value) => RawRecord::from_value(kind, value).map(Some),
            Err(CatalogError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn fetch_season(&self, title_id: u64, season: u32) -> Result<Option<SeasonRecord>> {
        if title_id == 0 {
            return Err(CatalogError::InvalidId(title_id));
        }
        let path = format!("/tv/{}/season/{}", title_id, season);
        match self.fetch_json(&path, &[]).await {
            Ok(value) if value.as_object().is_some_and(|o| o.is_empty()) => Ok(None),
            Ok(value) => Ok(Some(serde_json::from_value(value)?)),
            Err(CatalogError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Strip the query string, which carries the API key.
fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> UpstreamClient {
        UpstreamClient::with_config(UpstreamConfig {
            base_url: server.uri(),
            api_key: Some("k3y".to_string()),
            requests_per_second: 1000.0,
            max_retries: 1,
            retry_base_delay_ms: 10,
            ..UpstreamConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(2.0);
        assert_eq!(limiter.min_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_rate_limiter_different_rates() {
        let limiter = RateLimiter::new(1.0);
        assert_eq!(limiter.min_interval(), Duration::from_secs(1));

        let limiter = RateLimiter::new(4.0);
        assert_eq!(limiter.min_interval(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_rate_limiter_acquire() {
        let limiter = RateLimiter::new(10.0); // 100ms interval

        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(100));
    }

    #[test]
    fn test_backoff_delay_calculation() {
        let client = UpstreamClient::new().unwrap();

        assert_eq!(client.calculate_backoff_delay(0), Duration::from_millis(500));
        assert_eq!(client.calculate_backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(client.calculate_backoff_delay(2), Duration::from_millis(2000));
        assert_eq!(client.rate_limiter().min_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_backoff_delay_is_capped() {
        let client = UpstreamClient::with_config(UpstreamConfig {
            max_retries: 100,
            ..UpstreamConfig::default()
        })
        .unwrap();

        assert_eq!(client.calculate_backoff_delay(6), Duration::from_secs(30));
        assert_eq!(client.calculate_backoff_delay(63), Duration::from_secs(30));
        assert_eq!(client.calculate_backoff_delay(64), Duration::from_secs(30));
        assert_eq!(client.calculate_backoff_delay(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_build_url_encodes_params() {
        let client = UpstreamClient::with_config(UpstreamConfig {
            base_url: "https://api.example.test/3/".to_string(),
            api_key: Some("abc".to_string()),
            ..UpstreamConfig::default()
        })
        .unwrap();

        let url = client.build_url("/search/multi", &[("query", "la casa di carta".to_string())]);
        assert_eq!(
            url,
            "https://api.example.test/3/search/multi?api_key=abc&language=it-IT&query=la%20casa%20di%20carta"
        );
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("https://x.test/movie/1?api_key=secret"), "https://x.test/movie/1");
        assert_eq!(redact("https://x.test/movie/1"), "https://x.test/movie/1");
    }

    #[tokio::test]
    async fn test_fetch_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/popular"))
            .and(query_param("api_key", "k3y"))
            .and(query_param("language", "it-IT"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 2,
                "results": [{"id": 1, "title": "Uno"}, {"id": 2, "title": "Due"}],
                "total_pages": 9,
                "total_results": 170
            })))
            .mount(&server)
            .await;

        let listing = client_for(&server)
            .fetch_listing("/movie/popular", &[("page", "2".to_string())])
            .await
            .unwrap();
        assert_eq!(listing.page, 2);
        assert_eq!(listing.results.len(), 2);
        assert_eq!(listing.total_pages, 9);
    }

    #[tokio::test]
    async fn test_fetch_listing_without_results_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tv/popular"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status_message": "oops"})))
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_listing("/tv/popular", &[]).await;
        assert!(matches!(result, Err(CatalogError::Json(_))));
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/top_rated"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_listing("/movie/top_rated", &[]).await;
        match result {
            Err(CatalogError::UpstreamStatus { status, url }) => {
                assert_eq!(status, 503);
                assert!(!url.contains("k3y"));
            }
            other => panic!("Expected UpstreamStatus error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rate_limited_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(2)
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_listing("/trending/all/week", &[]).await;
        assert!(matches!(result, Err(CatalogError::RateLimited)));
    }

    #[tokio::test]
    async fn test_fetch_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tv/1399"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1399,
                "name": "Il Trono di Spade",
                "number_of_seasons": 8
            })))
            .mount(&server)
            .await;

        let record = client_for(&server)
            .fetch_by_id(MediaKind::Series, 1399)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.kind(), MediaKind::Series);
        assert_eq!(record.title(), Some("Il Trono di Spade"));
    }

    #[tokio::test]
    async fn test_fetch_by_id_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let record = client_for(&server).fetch_by_id(MediaKind::Movie, 42).await.unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn test_fetch_by_id_zero() {
        let client = UpstreamClient::new().unwrap();
        let result = client.fetch_by_id(MediaKind::Movie, 0).await;
        assert!(matches!(result, Err(CatalogError::InvalidId(0))));
    }

    #[tokio::test]
    async fn test_fetch_season() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tv/1399/season/1"))
            .and(query_param("api_key", "k3y"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "season_number": 1,
                "name": "Stagione 1",
                "air_date": "2011-04-17",
                "episodes": [
                    {"episode_number": 1, "name": "L'inverno sta arrivando", "air_date": "2011-04-17", "runtime": 62},
                    {"episode_number": 2, "name": "La strada del re", "air_date": "2011-04-24"}
                ]
            })))
            .mount(&server)
            .await;

        let season = client_for(&server).fetch_season(1399, 1).await.unwrap().unwrap();
        assert_eq!(season.season_number, 1);
        assert_eq!(season.episodes.len(), 2);
        assert_eq!(season.episodes[0].runtime, Some(62));
        assert_eq!(season.episodes[1].runtime, None);
    }

    #[tokio::test]
    async fn test_fetch_season_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tv/1399/season/9"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tv/1399/season/8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.fetch_season(1399, 9).await.unwrap().is_none());
        assert!(client.fetch_season(1399, 8).await.unwrap().is_none());
        assert!(matches!(client.fetch_season(0, 1).await, Err(CatalogError::InvalidId(0))));
    }
}
