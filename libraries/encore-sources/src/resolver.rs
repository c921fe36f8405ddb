//! Routing front door for the backend set
//!
//! Classifies incoming text as URL or free-text, routes URLs to the single
//! backend whose patterns own them, and falls through to the default
//! backend's search otherwise. Callers never talk to a backend directly.

use crate::backends::{CatalogSource, SaavnSource, YouTubeSource};
use crate::config::SourcesConfig;
use crate::http::HttpClient;
use encore_core::traits::MediaSource;
use encore_core::types::{PlatformTracks, PlayMode, Platform, TrackInfo};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Maximum candidates surfaced when the chat asks to choose.
const CHOOSE_LIMIT: usize = 4;

/// True when the input parses as an absolute http(s) URL or matches a
/// scheme-less domain form a backend owns.
pub fn is_url(text: &str) -> bool {
    match Url::parse(text) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => {
            // Share links often arrive without a scheme.
            Url::parse(&format!("https://{text}"))
                .map(|url| url.host_str().is_some_and(|host| host.contains('.')))
                .unwrap_or(false)
                && !text.contains(' ')
        }
    }
}

/// What the controller should do with a resolution result, shaped by the
/// chat's play mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Queue this track immediately.
    Play(TrackInfo),
    /// Present these candidates and wait for a pick.
    Choose(Vec<TrackInfo>),
}

impl Selection {
    /// Apply a chat's play mode to an ordered result set. `None` when the
    /// set is empty.
    pub fn pick(mode: PlayMode, tracks: PlatformTracks) -> Option<Self> {
        if tracks.is_empty() {
            return None;
        }
        match mode {
            PlayMode::First => tracks.into_iter().next().map(Self::Play),
            PlayMode::Choose => Some(Self::Choose(
                tracks.into_iter().take(CHOOSE_LIMIT).collect(),
            )),
        }
    }
}

/// Ordered backend registry plus the routing rules over it.
pub struct SourceResolver {
    backends: Vec<Arc<dyn MediaSource>>,
    default_index: usize,
}

impl SourceResolver {
    /// Build the standard backend set from configuration. Registration
    /// order is claim-priority order for URL routing.
    pub fn new(config: &SourcesConfig, http: HttpClient) -> Self {
        let backends: Vec<Arc<dyn MediaSource>> = vec![
            Arc::new(CatalogSource::new(http.clone(), config)),
            Arc::new(YouTubeSource::new(http.clone(), config)),
            Arc::new(SaavnSource::new(http, config)),
        ];
        let default_index = backends
            .iter()
            .position(|b| b.platform() == config.default_platform)
            .unwrap_or(0);
        Self {
            backends,
            default_index,
        }
    }

    /// Build a resolver over an explicit backend set. The first backend is
    /// the default for free-text search.
    pub fn with_backends(backends: Vec<Arc<dyn MediaSource>>) -> Self {
        Self {
            backends,
            default_index: 0,
        }
    }

    /// Backend owning a platform, if registered.
    pub fn backend_for(&self, platform: Platform) -> Option<&Arc<dyn MediaSource>> {
        self.backends.iter().find(|b| b.platform() == platform)
    }

    /// Resolve arbitrary chat input into tracks.
    ///
    /// A URL goes to the first backend claiming it; a claimed URL that
    /// fails to resolve is a failure, never a fallback to another backend.
    /// Unclaimed URLs and plain text go to the default backend's search.
    /// Empty result sets collapse to `None` here so callers see one "no
    /// tracks" shape.
    pub async fn resolve_any(&self, input: &str) -> Option<PlatformTracks> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if is_url(input) {
            if let Some(backend) = self.backends.iter().find(|b| b.is_valid(input)) {
                debug!(platform = %backend.platform(), input = %input, "routing URL");
                return backend.resolve(input).await.filter(|t| !t.is_empty());
            }
            warn!(input = %input, "no backend claims this URL");
            return None;
        }

        debug!(input = %input, "free-text search via default backend");
        self.backends[self.default_index]
            .search(input)
            .await
            .filter(|t| !t.is_empty())
    }

    /// Fetch a single track by platform-scoped id, used when a search
    /// candidate is picked after the fact.
    pub async fn track_by_id(&self, platform: Platform, id: &str) -> Option<TrackInfo> {
        self.backend_for(platform)?.track_by_id(id).await
    }

    /// Suggestions from the first backend that has any.
    pub async fn recommendations(&self) -> Option<PlatformTracks> {
        for backend in &self.backends {
            if let Some(tracks) = backend.recommendations().await {
                if !tracks.is_empty() {
                    return Some(tracks);
                }
            }
        }
        None
    }
}
