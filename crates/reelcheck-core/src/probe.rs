//! Delivery-source availability probe
//!
//! The delivery source offers no listing API: the only way to know whether a
//! title can be played is to request its player page. A probe issues a HEAD
//! and, when that is not conclusive, a GET whose body is checked for a
//! "not found" marker. Probes never fail: every error degrades to
//! "unavailable".

use std::time::Duration;

use async_trait::async_trait;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ProbeConfig;
use crate::error::{CatalogError, Result};
use crate::types::{CacheKey, MediaKind};

/// Marker the delivery source puts in pages of missing titles
const NOT_FOUND_PATTERN: &str = r"(?i)not\s+found";

/// Default User-Agent mimicking a modern browser
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Result of a single probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub available: bool,
    /// URL that answered, only set when available
    pub source_url: Option<String>,
}

impl ProbeOutcome {
    pub fn available(url: impl Into<String>) -> Self {
        Self {
            available: true,
            source_url: Some(url.into()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            source_url: None,
        }
    }
}

/// One existence check against the delivery source
#[async_trait]
pub trait Prober: Send + Sync {
    /// Check availability of the title or episode named by `key`.
    async fn probe(&self, key: &CacheKey) -> ProbeOutcome;
}

/// Player path on the delivery source for `key`.
///
/// A whole series is checked through its first episode.
///
/// # Examples
/// ```
/// use reelcheck_core::probe::probe_path;
/// use reelcheck_core::{CacheKey, MediaKind};
///
/// assert_eq!(probe_path(&CacheKey::title(5, MediaKind::Movie)), "/movie/5");
/// assert_eq!(probe_path(&CacheKey::title(5, MediaKind::Series)), "/tv/5/1/1");
/// assert_eq!(probe_path(&CacheKey::episode(5, 2, 3)), "/tv/5/2/3");
/// ```
pub fn probe_path(key: &CacheKey) -> String {
    match *key {
        CacheKey::Title {
            title_id,
            kind: MediaKind::Movie,
        } => format!("/movie/{}", title_id),
        CacheKey::Title {
            title_id,
            kind: MediaKind::Series,
        } => format!("/tv/{}/1/1", title_id),
        CacheKey::Episode {
            title_id,
            season,
            episode,
        } => format!("/tv/{}/{}/{}", title_id, season, episode),
    }
}

/// HTTP prober for the delivery source
pub struct HttpProber {
    client: reqwest::Client,
    base_url: String,
    not_found: Regex,
}

impl HttpProber {
    /// Create a prober with default configuration
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn new() -> Result<Self> {
        Self::with_config(ProbeConfig::default())
    }

    /// Create a prober with custom configuration
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn with_config(config: ProbeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;
        let not_found =
            Regex::new(NOT_FOUND_PATTERN).map_err(|e| CatalogError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            not_found,
        })
    }

    /// Absolute URL probed for `key`.
    pub fn url_for(&self, key: &CacheKey) -> String {
        format!("{}{}", self.base_url, probe_path(key))
    }

    /// HEAD first, GET fallback.
    ///
    /// A timed-out HEAD is not retried as a GET.
    async fn check(&self, url: &str) -> Result<bool> {
        match self.client.head(url).send().await {
            Ok(response) if response.status().is_success() => return Ok(true),
            Ok(response) => {
                debug!(url, status = response.status().as_u16(), "HEAD not conclusive, trying GET");
            }
            Err(e) if e.is_timeout() => return Err(e.into()),
            Err(e) => {
                debug!(url, error = %e, "HEAD failed, trying GET");
            }
        }

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Ok(false);
        }
        let body = response.text().await?;
        Ok(!self.not_found.is_match(&body))
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, key: &CacheKey) -> ProbeOutcome {
        let url = self.url_for(key);
        match self.check(&url).await {
            Ok(true) => {
                debug!(%key, %url, "Probe: available");
                ProbeOutcome::available(url)
            }
            Ok(false) => {
                debug!(%key, %url, "Probe: unavailable");
                ProbeOutcome::unavailable()
            }
            Err(e) => {
                warn!(%key, %url, error = %e, "Probe failed, treating as unavailable");
                ProbeOutcome::unavailable()
            }
        }
    }
}
