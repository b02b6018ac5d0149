//! Content-classification exclusion rule

use crate::config::FilterConfig;
use crate::types::CandidateRecord;

/// Record-by-record exclusion filter.
///
/// A candidate is excluded when its genres contain the configured genre id
/// and its origin country or original language is one of the configured
/// values.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    config: FilterConfig,
}

impl ContentFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// A filter that never excludes anything.
    pub fn disabled() -> Self {
        Self {
            config: FilterConfig {
                enabled: false,
                ..FilterConfig::default()
            },
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Whether `candidate` must be dropped.
    pub fn excludes(&self, candidate: &CandidateRecord) -> bool {
        if !self.config.enabled || !candidate.genre_ids.contains(&self.config.excluded_genre_id) {
            return false;
        }

        let country_match = candidate.origin_country.iter().any(|country| {
            self.config
                .excluded_origin_countries
                .iter()
                .any(|excluded| excluded.eq_ignore_ascii_case(country))
        });
        let language_match = candidate.original_language.as_deref().is_some_and(|language| {
            self.config
                .excluded_languages
                .iter()
                .any(|excluded| excluded.eq_ignore_ascii_case(language))
        });

        country_match || language_match
    }
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}
