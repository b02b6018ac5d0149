//! Error types for reelcheck
//!
//! This module defines all error types used throughout the library.
//! CatalogError implements Serialize so it can be returned inside JSON responses.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error type for catalog and availability operations
#[derive(Error, Debug)]
pub enum CatalogError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to decode a JSON payload
    #[error("Failed to decode JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error from the availability store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream returned {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    /// Rate limited by the upstream provider (HTTP 429)
    #[error("Rate limited - too many requests")]
    RateLimited,

    /// Requested title was not found upstream
    #[error("Title not found: {0}")]
    NotFound(String),

    /// Invalid title id provided
    #[error("Invalid title id: {0}")]
    InvalidId(u64),

    /// Invalid search query or selector
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Every configured listing source failed
    #[error("All {0} listing sources failed")]
    AllSourcesFailed(usize),
}

impl CatalogError {
    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::UpstreamStatus { status, .. } => *status >= 500,
            Self::RateLimited => true,
            _ => false,
        }
    }
}

/// Serialize CatalogError as its display string
impl Serialize for CatalogError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias for reelcheck operations
pub type Result<T> = std::result::Result<T, CatalogError>;
