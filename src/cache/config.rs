//! Article cache configuration.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_ARTICLE_LIMIT: usize = 1024;

/// Article cache configuration from `lectern.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum articles held before least-recently-used eviction.
    /// `0` keeps every article.
    pub article_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            article_limit: DEFAULT_ARTICLE_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            article_limit: settings.article_limit,
        }
    }
}

impl CacheConfig {
    pub fn unbounded() -> Self {
        Self { article_limit: 0 }
    }

    /// Returns the capacity bound, or `None` when the cache is unbounded.
    pub fn article_limit_non_zero(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.article_limit)
    }
}
