//! Aggregated catalog API backend
//!
//! Owns Spotify, Apple Music, and SoundCloud link shapes and resolves them
//! through a self-hosted catalog API. The API speaks a `{"results": [...]}`
//! envelope for every track-list endpoint.

use crate::backends::sanitize_track_id;
use crate::config::SourcesConfig;
use crate::http::HttpClient;
use async_trait::async_trait;
use encore_core::traits::MediaSource;
use encore_core::types::{PlatformTracks, Platform, TrackInfo};
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

/// Track-list envelope returned by every catalog list endpoint.
#[derive(Debug, Deserialize)]
struct TrackListResponse {
    results: Vec<WireTrack>,
}

/// One track in a list response.
#[derive(Debug, Deserialize)]
struct WireTrack {
    id: String,
    name: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    album: String,
    #[serde(default)]
    duration: u32,
    #[serde(default)]
    cover: String,
    #[serde(default)]
    year: u32,
    #[serde(default)]
    cdnurl: String,
}

/// Detailed single-track response from `get_track`.
#[derive(Debug, Deserialize)]
struct WireTrackDetail {
    #[serde(rename = "tc")]
    id: String,
    name: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    album: String,
    #[serde(default)]
    cover: String,
    #[serde(default)]
    lyrics: String,
    #[serde(default)]
    duration: u32,
    #[serde(default)]
    year: u32,
    #[serde(default)]
    cdnurl: String,
    #[serde(default)]
    key: String,
}

/// Backend for the aggregated catalog API.
pub struct CatalogSource {
    http: HttpClient,
    api_url: Option<String>,
    downloads_dir: PathBuf,
    recommend_limit: usize,
    apple_music: Regex,
    spotify: Regex,
}

impl CatalogSource {
    /// Build the backend. It stays registered but inert (every `is_valid`
    /// is false) when no API URL is configured.
    pub fn new(http: HttpClient, config: &SourcesConfig) -> Self {
        Self {
            http,
            api_url: config.api_url.clone(),
            downloads_dir: config.downloads_dir.clone(),
            recommend_limit: config.recommend_limit,
            apple_music: Regex::new(
                r"(?i)^(https?://)?(music\.apple\.com/([a-z]{2}/)?(album|playlist|song)/[a-zA-Z0-9\-_]+/[0-9]+)(\?.*)?$",
            )
            .unwrap(),
            spotify: Regex::new(
                r"(?i)^(https?://)?(open\.spotify\.com/(track|playlist|album|artist)/[a-zA-Z0-9]+)(\?.*)?$",
            )
            .unwrap(),
        }
    }

    async fn fetch_list(&self, endpoint: &str) -> Option<PlatformTracks> {
        let api_url = self.api_url.as_ref()?;
        let url = format!("{api_url}/{endpoint}");
        match self.http.get_json::<TrackListResponse>(&url).await {
            Ok(response) => Some(PlatformTracks::new(
                response.results.into_iter().map(WireTrack::into_track).collect(),
            )),
            Err(err) => {
                warn!(endpoint = %endpoint, error = %err, "catalog request failed");
                None
            }
        }
    }

    fn encode(text: &str) -> String {
        url::form_urlencoded::byte_serialize(text.as_bytes()).collect()
    }
}

impl WireTrack {
    fn into_track(self) -> TrackInfo {
        TrackInfo {
            id: self.id,
            name: self.name,
            artist: self.artist,
            album: self.album,
            duration_secs: self.duration,
            cover: self.cover,
            lyrics: None,
            year: self.year,
            platform: Platform::Catalog,
            locator: self.cdnurl,
            key: None,
        }
    }
}

#[async_trait]
impl MediaSource for CatalogSource {
    fn platform(&self) -> Platform {
        Platform::Catalog
    }

    fn is_valid(&self, url: &str) -> bool {
        if self.api_url.is_none() || url.is_empty() {
            return false;
        }
        self.apple_music.is_match(url)
            || self.spotify.is_match(url)
            || url.to_lowercase().contains("soundcloud")
    }

    async fn resolve(&self, url: &str) -> Option<PlatformTracks> {
        self.fetch_list(&format!("get_url_new?url={}", Self::encode(url)))
            .await
    }

    async fn search(&self, text: &str) -> Option<PlatformTracks> {
        self.fetch_list(&format!("search_track/{}", Self::encode(text)))
            .await
    }

    async fn track_by_id(&self, id: &str) -> Option<TrackInfo> {
        let api_url = self.api_url.as_ref()?;
        let url = format!("{api_url}/get_track?id={}", Self::encode(id));
        match self.http.get_json::<WireTrackDetail>(&url).await {
            Ok(detail) => Some(TrackInfo {
                id: detail.id,
                name: detail.name,
                artist: detail.artist,
                album: detail.album,
                duration_secs: detail.duration,
                cover: detail.cover,
                lyrics: match detail.lyrics.as_str() {
                    "" | "None" => None,
                    _ => Some(detail.lyrics),
                },
                year: detail.year,
                platform: Platform::Catalog,
                locator: detail.cdnurl,
                key: match detail.key.as_str() {
                    "" | "nil" | "None" => None,
                    _ => Some(detail.key),
                },
            }),
            Err(err) => {
                warn!(id = %id, error = %err, "catalog track lookup failed");
                None
            }
        }
    }

    async fn fetch_media(&self, track: &TrackInfo) -> Option<PathBuf> {
        if track.locator.is_empty() {
            warn!(id = %track.id, "catalog track has no content locator");
            return None;
        }

        let dest = self
            .downloads_dir
            .join(format!("{}.mp3", sanitize_track_id(&track.id)));
        match self.http.download_file(&track.locator, &dest).await {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(id = %track.id, error = %err, "catalog media download failed");
                None
            }
        }
    }

    async fn recommendations(&self) -> Option<PlatformTracks> {
        self.fetch_list(&format!("recommend_songs?lim={}", self.recommend_limit))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> CatalogSource {
        let config = SourcesConfig {
            api_url: Some("https://api.example.com".to_string()),
            ..SourcesConfig::default()
        };
        CatalogSource::new(HttpClient::new().unwrap(), &config)
    }

    #[test]
    fn owns_spotify_and_apple_music_urls() {
        let source = configured();
        assert!(source.is_valid("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"));
        assert!(source.is_valid("open.spotify.com/album/6dVIqQ8qmQ5GBnJ9shOYGE"));
        assert!(source.is_valid("https://music.apple.com/us/album/some-album/1440857781"));
        assert!(source.is_valid("https://soundcloud.com/artist/track"));
    }

    #[test]
    fn rejects_foreign_urls() {
        let source = configured();
        assert!(!source.is_valid("https://youtube.com/watch?v=abc"));
        assert!(!source.is_valid(""));
    }

    #[test]
    fn inert_without_api_url() {
        let source = CatalogSource::new(HttpClient::new().unwrap(), &SourcesConfig::default());
        assert!(!source.is_valid("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"));
    }

    #[test]
    fn wire_track_maps_to_catalog_platform() {
        let wire = WireTrack {
            id: "t1".into(),
            name: "Song".into(),
            artist: "Artist".into(),
            album: String::new(),
            duration: 180,
            cover: String::new(),
            year: 2020,
            cdnurl: "https://cdn.example.com/t1".into(),
        };
        let track = wire.into_track();
        assert_eq!(track.platform, Platform::Catalog);
        assert_eq!(track.duration_secs, 180);
        assert_eq!(track.locator, "https://cdn.example.com/t1");
    }
}
