//! Configuration for reelcheck
//!
//! Every component takes its own plain config struct with documented defaults.
//! [`Config`] aggregates them, can be deserialized from partial JSON and can be
//! overlaid with environment variables.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// Default upstream metadata API
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Default delivery source
pub const DEFAULT_PROBE_BASE_URL: &str = "https://vixsrc.to";

/// Configuration of the upstream metadata client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the metadata API (default: TMDB v3)
    pub base_url: String,
    /// API key sent as the `api_key` query parameter
    pub api_key: Option<String>,
    /// Value of the `language` query parameter (default: it-IT)
    pub language: String,
    /// Maximum requests per second (default: 4.0)
    pub requests_per_second: f64,
    /// Request timeout in seconds (default: 15)
    pub timeout_secs: u64,
    /// Retry attempts on 429/5xx (default: 3)
    pub max_retries: u32,
    /// Base delay of the exponential backoff in milliseconds (default: 500)
    pub retry_base_delay_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            api_key: None,
            language: "it-IT".to_string(),
            requests_per_second: 4.0,
            timeout_secs: 15,
            max_retries: 3,
            retry_base_delay_ms: 500,
        }
    }
}

/// Configuration of the delivery-source prober
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Base URL of the delivery source
    pub base_url: String,
    /// Timeout of a single HEAD or GET in seconds (default: 10)
    pub timeout_secs: u64,
    /// Maximum redirects followed per request (default: 10)
    pub max_redirects: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROBE_BASE_URL.to_string(),
            timeout_secs: 10,
            max_redirects: 10,
        }
    }
}

/// Configuration of the availability cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL of whole-title entries in seconds (default: 24 hours)
    pub title_ttl_secs: u64,
    /// TTL of per-episode entries in seconds (default: 6 hours)
    pub episode_ttl_secs: u64,
    /// JSON file backing the cache; in-memory when unset
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            title_ttl_secs: 24 * 3600,
            episode_ttl_secs: 6 * 3600,
            path: None,
        }
    }
}

impl CacheConfig {
    pub fn title_ttl(&self) -> Duration {
        Duration::from_secs(self.title_ttl_secs)
    }

    pub fn episode_ttl(&self) -> Duration {
        Duration::from_secs(self.episode_ttl_secs)
    }
}

/// Configuration of the aggregation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Availability lookups in flight per aggregation (default: 12)
    pub max_concurrent_probes: usize,
    /// Overall deadline of one aggregation in seconds (default: 20)
    pub aggregate_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_probes: 12,
            aggregate_timeout_secs: 20,
        }
    }
}

impl PipelineConfig {
    pub fn aggregate_timeout(&self) -> Duration {
        Duration::from_secs(self.aggregate_timeout_secs)
    }
}

/// Content-classification exclusion rule
///
/// A record is excluded when it carries `excluded_genre_id` and either its
/// origin country or its original language is listed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub enabled: bool,
    /// Genre id that arms the rule (default: 16, Animation)
    pub excluded_genre_id: u32,
    /// Origin countries matched by the rule (default: JP)
    pub excluded_origin_countries: Vec<String>,
    /// Original languages matched by the rule (default: ja)
    pub excluded_languages: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            excluded_genre_id: 16,
            excluded_origin_countries: vec!["JP".to_string()],
            excluded_languages: vec!["ja".to_string()],
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub probe: ProbeConfig,
    pub cache: CacheConfig,
    pub pipeline: PipelineConfig,
    pub filter: FilterConfig,
}

impl Config {
    /// Parse a (possibly partial) JSON configuration.
    ///
    /// # Errors
    /// Returns `CatalogError::Json` if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overlaid with the process environment.
    ///
    /// # Errors
    /// Returns `CatalogError::Config` if a numeric variable does not parse.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Overlay values from a variable lookup.
    ///
    /// Recognized variables: `TMDB_API_KEY`, `TMDB_BASE_URL`, `TMDB_LANGUAGE`,
    /// `PROBE_BASE_URL`, `PROBE_TIMEOUT_SECS`, `AVAILABILITY_CACHE_PATH`,
    /// `TITLE_TTL_HOURS`, `EPISODE_TTL_HOURS`, `MAX_CONCURRENT_PROBES`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("TMDB_API_KEY") {
            self.upstream.api_key = Some(key);
        }
        if let Some(url) = lookup("TMDB_BASE_URL") {
            self.upstream.base_url = url;
        }
        if let Some(language) = lookup("TMDB_LANGUAGE") {
            self.upstream.language = language;
        }
        if let Some(url) = lookup("PROBE_BASE_URL") {
            self.probe.base_url = url;
        }
        if let Some(secs) = parse_var(&lookup, "PROBE_TIMEOUT_SECS")? {
            self.probe.timeout_secs = secs;
        }
        if let Some(path) = lookup("AVAILABILITY_CACHE_PATH") {
            self.cache.path = Some(PathBuf::from(path));
        }
        if let Some(hours) = parse_var(&lookup, "TITLE_TTL_HOURS")? {
            self.cache.title_ttl_secs = hours_to_secs("TITLE_TTL_HOURS", hours)?;
        }
        if let Some(hours) = parse_var(&lookup, "EPISODE_TTL_HOURS")? {
            self.cache.episode_ttl_secs = hours_to_secs("EPISODE_TTL_HOURS", hours)?;
        }
        if let Some(limit) = parse_var(&lookup, "MAX_CONCURRENT_PROBES")? {
            self.pipeline.max_concurrent_probes = limit;
        }
        Ok(self)
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CatalogError::Config(format!("{name}={raw}"))),
    }
}

fn hours_to_secs(name: &str, hours: u64) -> Result<u64> {
    hours
        .checked_mul(3600)
        .ok_or_else(|| CatalogError::Config(format!("{name}={hours}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache.title_ttl(), Duration::from_secs(86_400));
        assert_eq!(config.cache.episode_ttl(), Duration::from_secs(21_600));
        assert_eq!(config.probe.timeout_secs, 10);
        assert_eq!(config.pipeline.max_concurrent_probes, 12);
        assert_eq!(config.upstream.language, "it-IT");
        assert!(config.filter.enabled);
    }

    #[test]
    fn test_partial_json() {
        let config = Config::from_json(r#"{"cache": {"title_ttl_secs": 60}}"#).unwrap();
        assert_eq!(config.cache.title_ttl_secs, 60);
        assert_eq!(config.cache.episode_ttl_secs, 6 * 3600);
        assert_eq!(config.probe.base_url, DEFAULT_PROBE_BASE_URL);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("TMDB_API_KEY", "secret"),
            ("PROBE_BASE_URL", "http://localhost:9000"),
            ("TITLE_TTL_HOURS", "12"),
            ("MAX_CONCURRENT_PROBES", "4"),
        ]);
        let config = Config::default()
            .with_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.upstream.api_key.as_deref(), Some("secret"));
        assert_eq!(config.probe.base_url, "http://localhost:9000");
        assert_eq!(config.cache.title_ttl_secs, 12 * 3600);
        assert_eq!(config.pipeline.max_concurrent_probes, 4);
    }

    #[test]
    fn test_invalid_override() {
        let result = Config::default().with_overrides(|name| {
            (name == "EPISODE_TTL_HOURS").then(|| "six".to_string())
        });
        match result {
            Err(CatalogError::Config(msg)) => assert_eq!(msg, "EPISODE_TTL_HOURS=six"),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_ttl_hours_overflow_is_rejected() {
        let huge = u64::MAX.to_string();
        for name in ["TITLE_TTL_HOURS", "EPISODE_TTL_HOURS"] {
            let result = Config::default().with_overrides(|var| (var == name).then(|| huge.clone()));
            match result {
                Err(CatalogError::Config(msg)) => assert_eq!(msg, format!("{name}={huge}")),
                other => panic!("Expected Config error, got {:?}", other),
            }
        }

        let largest = (u64::MAX / 3600).to_string();
        let config = Config::default()
            .with_overrides(|var| (var == "TITLE_TTL_HOURS").then(|| largest.clone()))
            .unwrap();
        assert_eq!(config.cache.title_ttl_secs, (u64::MAX / 3600) * 3600);
    }
}
