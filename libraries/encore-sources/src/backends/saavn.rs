//! JioSaavn backend
//!
//! Song and playlist pages resolve through `yt-dlp`; free-text search uses
//! the site's public autocomplete API. Track ids are `title/token` pairs so
//! the share URL can be rebuilt from the id alone.

use crate::backends::{duration_from_value, run_ytdlp_json, sanitize_track_id, str_field};
use crate::config::SourcesConfig;
use crate::http::HttpClient;
use async_trait::async_trait;
use encore_core::traits::MediaSource;
use encore_core::types::{PlatformTracks, Platform, TrackInfo};
use regex::Regex;
use serde_json::Value;
use std::path::PathBuf;
use tracing::warn;

const AUTOCOMPLETE_URL: &str =
    "https://www.jiosaavn.com/api.php?__call=autocomplete.get&_format=json&_marker=0&ctx=wap6dot0";

/// Backend for JioSaavn.
pub struct SaavnSource {
    http: HttpClient,
    downloads_dir: PathBuf,
    search_limit: usize,
    song: Regex,
    playlist: Regex,
}

impl SaavnSource {
    /// Build the backend.
    pub fn new(http: HttpClient, config: &SourcesConfig) -> Self {
        Self {
            http,
            downloads_dir: config.downloads_dir.clone(),
            search_limit: config.search_limit,
            song: Regex::new(
                r"(?i)^(https?://)?(www\.)?jiosaavn\.com/song/[\w-]+/[A-Za-z0-9_-]+",
            )
            .unwrap(),
            playlist: Regex::new(
                r"(?i)^(https?://)?(www\.)?jiosaavn\.com/featured/[\w-]+/[A-Za-z0-9_-]+",
            )
            .unwrap(),
        }
    }

    /// Derive the `title/token` track id from a song page URL.
    fn id_from_url(url: &str) -> Option<String> {
        let trimmed = url.trim_end_matches('/');
        let mut segments = trimmed.rsplit('/');
        let token = segments.next()?;
        let slug = segments.next()?;
        if token.is_empty() || slug.is_empty() {
            return None;
        }
        Some(format!("{slug}/{token}"))
    }

    /// Map a full `yt-dlp -J` song document. The locator is the highest
    /// bitrate audio format URL.
    fn map_song(data: &Value, page_url: &str) -> Option<TrackInfo> {
        let title = str_field(data, "title");
        if title.is_empty() {
            return None;
        }

        let token = page_url.trim_end_matches('/').rsplit('/').next()?;
        let locator = data
            .get("formats")
            .and_then(Value::as_array)
            .and_then(|formats| {
                formats
                    .iter()
                    .filter(|f| !str_field(f, "url").is_empty())
                    .max_by(|a, b| {
                        let abr_a = a.get("abr").and_then(Value::as_f64).unwrap_or(0.0);
                        let abr_b = b.get("abr").and_then(Value::as_f64).unwrap_or(0.0);
                        abr_a.total_cmp(&abr_b)
                    })
            })
            .map(|f| str_field(f, "url"))
            .unwrap_or_else(|| str_field(data, "url"));

        let mut track = TrackInfo::new(format!("{title}/{token}"), title, Platform::JioSaavn);
        track.artist = match str_field(data, "artist") {
            "" => str_field(data, "uploader"),
            artist => artist,
        }
        .to_string();
        track.album = str_field(data, "album").to_string();
        track.cover = str_field(data, "thumbnail").to_string();
        track.duration_secs = data.get("duration").map_or(0, duration_from_value);
        track.year = data
            .get("release_year")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32;
        track.locator = locator.to_string();
        Some(track)
    }

    /// Map one flat playlist entry. Flat entries carry no media formats;
    /// the locator stays empty and `fetch_media` re-resolves on demand.
    fn map_playlist_entry(entry: &Value) -> Option<TrackInfo> {
        let page_url = str_field(entry, "url");
        let id = Self::id_from_url(page_url)?;
        let mut track = TrackInfo::new(id, str_field(entry, "title"), Platform::JioSaavn);
        track.artist = str_field(entry, "uploader").to_string();
        track.duration_secs = entry.get("duration").map_or(0, duration_from_value);
        Some(track)
    }

    /// Map one autocomplete search hit.
    fn map_search_hit(hit: &Value) -> Option<TrackInfo> {
        let id = Self::id_from_url(str_field(hit, "url"))?;
        let more = hit.get("more_info");
        let mut track = TrackInfo::new(id, str_field(hit, "title"), Platform::JioSaavn);
        track.artist = more
            .map(|m| str_field(m, "singers"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| str_field(hit, "description"))
            .to_string();
        track.album = more
            .map(|m| str_field(m, "album"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| str_field(hit, "album"))
            .to_string();
        track.cover = str_field(hit, "image").to_string();
        track.duration_secs = more
            .and_then(|m| m.get("duration"))
            .map_or(0, duration_from_value);
        Some(track)
    }

    async fn resolve_song(&self, url: &str) -> Option<PlatformTracks> {
        let data = run_ytdlp_json(&["-J", url]).await?;
        let track = Self::map_song(&data, url)?;
        Some(PlatformTracks::new(vec![track]))
    }

    async fn resolve_playlist(&self, url: &str) -> Option<PlatformTracks> {
        let data = run_ytdlp_json(&["--flat-playlist", "-J", url]).await?;
        let entries = data.get("entries")?.as_array()?;
        Some(PlatformTracks::new(
            entries.iter().filter_map(Self::map_playlist_entry).collect(),
        ))
    }
}

#[async_trait]
impl MediaSource for SaavnSource {
    fn platform(&self) -> Platform {
        Platform::JioSaavn
    }

    fn is_valid(&self, url: &str) -> bool {
        !url.is_empty() && (self.song.is_match(url) || self.playlist.is_match(url))
    }

    async fn resolve(&self, url: &str) -> Option<PlatformTracks> {
        if self.song.is_match(url) {
            self.resolve_song(url).await
        } else if self.playlist.is_match(url) {
            self.resolve_playlist(url).await
        } else {
            None
        }
    }

    async fn search(&self, text: &str) -> Option<PlatformTracks> {
        if text.is_empty() {
            return None;
        }

        let query: String = url::form_urlencoded::byte_serialize(text.as_bytes()).collect();
        let url = format!("{AUTOCOMPLETE_URL}&query={query}");
        let data = match self.http.get_json::<Value>(&url).await {
            Ok(data) => data,
            Err(err) => {
                warn!(query = %text, error = %err, "autocomplete request failed");
                return None;
            }
        };

        let hits = data
            .get("songs")
            .and_then(|songs| songs.get("data"))
            .and_then(Value::as_array)?;
        Some(PlatformTracks::new(
            hits.iter()
                .filter_map(Self::map_search_hit)
                .take(self.search_limit)
                .collect(),
        ))
    }

    async fn track_by_id(&self, id: &str) -> Option<TrackInfo> {
        let url = Platform::JioSaavn.track_url(id);
        if url.is_empty() {
            warn!(id = %id, "track id has no slug, cannot rebuild URL");
            return None;
        }
        self.resolve_song(&url)
            .await
            .and_then(|tracks| tracks.into_iter().next())
    }

    async fn fetch_media(&self, track: &TrackInfo) -> Option<PathBuf> {
        let dest = self
            .downloads_dir
            .join(format!("{}.m4a", sanitize_track_id(&track.id)));
        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            return Some(dest);
        }

        // Flat playlist entries arrive without a locator; fill it in now.
        let locator = if track.locator.is_empty() {
            self.track_by_id(&track.id).await?.locator
        } else {
            track.locator.clone()
        };
        if locator.is_empty() {
            warn!(id = %track.id, "no media locator for track");
            return None;
        }

        match self.http.download_file(&locator, &dest).await {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(id = %track.id, error = %err, "media download failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> SaavnSource {
        SaavnSource::new(HttpClient::new().unwrap(), &SourcesConfig::default())
    }

    #[test]
    fn owns_song_and_playlist_urls() {
        let source = source();
        assert!(source.is_valid("https://www.jiosaavn.com/song/tum-hi-ho/OgwVXyFo"));
        assert!(source.is_valid("jiosaavn.com/song/tum-hi-ho/OgwVXyFo"));
        assert!(source.is_valid("https://www.jiosaavn.com/featured/best-of-2024/8rLZfo3n"));
    }

    #[test]
    fn rejects_foreign_urls() {
        let source = source();
        assert!(!source.is_valid("https://www.jiosaavn.com/album/aashiqui-2/abc"));
        assert!(!source.is_valid("https://youtube.com/watch?v=abc"));
        assert!(!source.is_valid(""));
    }

    #[test]
    fn derives_ids_from_page_urls() {
        assert_eq!(
            SaavnSource::id_from_url("https://www.jiosaavn.com/song/tum-hi-ho/OgwVXyFo").as_deref(),
            Some("tum-hi-ho/OgwVXyFo")
        );
        assert!(SaavnSource::id_from_url("").is_none());
    }

    #[test]
    fn maps_full_song_with_best_format() {
        let data = json!({
            "title": "Tum Hi Ho",
            "artist": "Arijit Singh",
            "album": "Aashiqui 2",
            "duration": 262,
            "release_year": 2013,
            "thumbnail": "https://c.saavncdn.com/cover.jpg",
            "formats": [
                {"url": "https://cdn.example.com/low.m4a", "abr": 64.0},
                {"url": "https://cdn.example.com/high.m4a", "abr": 320.0}
            ]
        });
        let track =
            SaavnSource::map_song(&data, "https://www.jiosaavn.com/song/tum-hi-ho/OgwVXyFo")
                .unwrap();
        assert_eq!(track.id, "Tum Hi Ho/OgwVXyFo");
        assert_eq!(track.locator, "https://cdn.example.com/high.m4a");
        assert_eq!(track.duration_secs, 262);
        assert_eq!(track.year, 2013);
        assert_eq!(track.platform, Platform::JioSaavn);
    }

    #[test]
    fn song_id_round_trips_through_track_url() {
        let data = json!({"title": "Tum Hi Ho", "formats": []});
        let track =
            SaavnSource::map_song(&data, "https://www.jiosaavn.com/song/tum-hi-ho/OgwVXyFo")
                .unwrap();
        assert_eq!(
            Platform::JioSaavn.track_url(&track.id),
            "https://www.jiosaavn.com/song/tum-hi-ho/OgwVXyFo"
        );
    }

    #[test]
    fn maps_search_hits() {
        let hit = json!({
            "title": "Tum Hi Ho",
            "url": "https://www.jiosaavn.com/song/tum-hi-ho/OgwVXyFo",
            "image": "https://c.saavncdn.com/cover.jpg",
            "description": "fallback artist",
            "more_info": {"singers": "Arijit Singh", "album": "Aashiqui 2", "duration": "262"}
        });
        let track = SaavnSource::map_search_hit(&hit).unwrap();
        assert_eq!(track.id, "tum-hi-ho/OgwVXyFo");
        assert_eq!(track.artist, "Arijit Singh");
        assert_eq!(track.album, "Aashiqui 2");
    }

    #[test]
    fn playlist_entries_have_no_locator() {
        let entry = json!({
            "title": "Tum Hi Ho",
            "url": "https://www.jiosaavn.com/song/tum-hi-ho/OgwVXyFo",
            "uploader": "Arijit Singh",
            "duration": 262
        });
        let track = SaavnSource::map_playlist_entry(&entry).unwrap();
        assert!(track.locator.is_empty());
        assert_eq!(track.id, "tum-hi-ho/OgwVXyFo");
    }
}
