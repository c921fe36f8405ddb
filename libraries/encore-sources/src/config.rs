//! Configuration for the source layer

use encore_core::types::Platform;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for backends and the resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Base URL of the aggregated catalog API; the catalog backend is
    /// disabled when unset.
    pub api_url: Option<String>,

    /// API key sent as `X-API-Key` on catalog requests.
    pub api_key: Option<String>,

    /// Directory media payloads are downloaded into.
    pub downloads_dir: PathBuf,

    /// Backend free-text searches fall through to when no URL pattern
    /// matches (default: YouTube).
    pub default_platform: Platform,

    /// Maximum free-text search results (default: 5).
    pub search_limit: usize,

    /// Maximum recommendation results (default: 4).
    pub recommend_limit: usize,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            downloads_dir: PathBuf::from("downloads"),
            default_platform: Platform::YouTube,
            search_limit: 5,
            recommend_limit: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = SourcesConfig::default();
        assert!(config.api_url.is_none());
        assert_eq!(config.downloads_dir, PathBuf::from("downloads"));
        assert_eq!(config.default_platform, Platform::YouTube);
        assert_eq!(config.search_limit, 5);
        assert_eq!(config.recommend_limit, 4);
    }
}
