//! YouTube backend
//!
//! Single videos resolve through the oembed endpoint (no API key needed);
//! playlists and free-text search go through `yt-dlp`'s flat JSON output.
//! Media payloads are extracted with `yt-dlp` as well, cached by video id.

use crate::backends::{duration_from_value, run_ytdlp_json, str_field};
use crate::config::SourcesConfig;
use crate::http::HttpClient;
use async_trait::async_trait;
use encore_core::traits::MediaSource;
use encore_core::types::{PlatformTracks, Platform, TrackInfo};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};

/// Response from the oembed endpoint for a single video.
#[derive(Debug, Deserialize)]
struct OembedResponse {
    title: String,
    #[serde(default)]
    author_name: String,
    #[serde(default)]
    thumbnail_url: String,
}

/// Backend for YouTube and YouTube Music.
pub struct YouTubeSource {
    http: HttpClient,
    downloads_dir: PathBuf,
    search_limit: usize,
    video: Regex,
    playlist: Regex,
}

impl YouTubeSource {
    /// Build the backend.
    pub fn new(http: HttpClient, config: &SourcesConfig) -> Self {
        Self {
            http,
            downloads_dir: config.downloads_dir.clone(),
            search_limit: config.search_limit,
            video: Regex::new(
                r"(?i)^(https?://)?(www\.)?(youtube\.com|music\.youtube\.com)/(watch\?v=|shorts/)[\w-]+",
            )
            .unwrap(),
            playlist: Regex::new(
                r"(?i)^(https?://)?(www\.)?(youtube\.com|music\.youtube\.com)/playlist\?list=[\w-]+",
            )
            .unwrap(),
        }
    }

    /// Drop everything after the first `&`; share links carry tracking
    /// params the patterns and oembed endpoint reject.
    fn trim_query(input: &str) -> &str {
        input.split('&').next().unwrap_or(input)
    }

    /// Pull the video id out of a watch/shorts URL.
    fn extract_video_id(url: &str) -> Option<&str> {
        if let Some(rest) = url.split_once("v=").map(|(_, rest)| rest) {
            return rest.split(['&', '/']).next();
        }
        if let Some(rest) = url.split_once("shorts/").map(|(_, rest)| rest) {
            return rest.split(['?', '&', '/']).next();
        }
        None
    }

    async fn resolve_video(&self, url: &str) -> Option<PlatformTracks> {
        let id = Self::extract_video_id(url)?;
        let oembed_url = format!(
            "https://www.youtube.com/oembed?url={}&format=json",
            url::form_urlencoded::byte_serialize(url.as_bytes()).collect::<String>()
        );

        match self.http.get_json::<OembedResponse>(&oembed_url).await {
            Ok(data) => {
                let mut track = TrackInfo::new(id, data.title, Platform::YouTube);
                track.artist = data.author_name;
                track.cover = data.thumbnail_url;
                Some(PlatformTracks::new(vec![track]))
            }
            Err(err) => {
                warn!(url = %url, error = %err, "oembed lookup failed");
                None
            }
        }
    }

    async fn resolve_playlist(&self, url: &str) -> Option<PlatformTracks> {
        let data = run_ytdlp_json(&["--flat-playlist", "-J", url]).await?;
        let entries = data.get("entries")?.as_array()?;
        Some(PlatformTracks::new(
            entries.iter().filter_map(Self::map_entry).collect(),
        ))
    }

    /// Map one flat-playlist/search entry to the canonical model.
    ///
    /// Durations arrive as numbers or clock strings depending on the
    /// extraction path; both normalize to seconds. Release year is not
    /// reported for YouTube content and stays 0.
    fn map_entry(entry: &Value) -> Option<TrackInfo> {
        let id = str_field(entry, "id");
        if id.is_empty() {
            return None;
        }

        let artist = match str_field(entry, "channel") {
            "" => str_field(entry, "uploader"),
            channel => channel,
        };
        let cover = entry
            .get("thumbnails")
            .and_then(Value::as_array)
            .and_then(|thumbs| thumbs.last())
            .map(|thumb| str_field(thumb, "url"))
            .unwrap_or_else(|| str_field(entry, "thumbnail"));

        let mut track = TrackInfo::new(id, str_field(entry, "title"), Platform::YouTube);
        track.artist = artist.to_string();
        track.cover = cover.to_string();
        track.duration_secs = entry.get("duration").map_or(0, duration_from_value);
        Some(track)
    }
}

#[async_trait]
impl MediaSource for YouTubeSource {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    fn is_valid(&self, url: &str) -> bool {
        !url.is_empty() && (self.video.is_match(url) || self.playlist.is_match(url))
    }

    async fn resolve(&self, url: &str) -> Option<PlatformTracks> {
        let url = Self::trim_query(url);
        if self.video.is_match(url) {
            self.resolve_video(url).await
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

        let query = format!("ytsearch{}:{}", self.search_limit, text);
        let data = run_ytdlp_json(&["--flat-playlist", "-J", &query]).await?;
        let entries = data.get("entries")?.as_array()?;
        Some(PlatformTracks::new(
            entries.iter().filter_map(Self::map_entry).collect(),
        ))
    }

    async fn track_by_id(&self, id: &str) -> Option<TrackInfo> {
        let url = Platform::YouTube.track_url(id);
        self.resolve_video(&url)
            .await
            .and_then(|tracks| tracks.into_iter().next())
    }

    async fn fetch_media(&self, track: &TrackInfo) -> Option<PathBuf> {
        let dest = self.downloads_dir.join(format!("{}.mp3", track.id));
        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            info!(path = %dest.display(), "media cache hit");
            return Some(dest);
        }

        if let Err(err) = tokio::fs::create_dir_all(&self.downloads_dir).await {
            warn!(error = %err, "cannot create downloads directory");
            return None;
        }

        let url = Platform::YouTube.track_url(&track.id);
        let template = self.downloads_dir.join(format!("{}.%(ext)s", track.id));
        let template = template.to_string_lossy().into_owned();
        let output = match tokio::process::Command::new("yt-dlp")
            .args([
                "-f",
                "bestaudio/best",
                "-x",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "192K",
                "--no-warnings",
                "-o",
                &template,
                &url,
            ])
            .output()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                warn!(error = %err, "failed to spawn yt-dlp");
                return None;
            }
        };

        if !output.status.success() {
            warn!(
                id = %track.id,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "yt-dlp download failed"
            );
            return None;
        }

        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            info!(path = %dest.display(), "downloaded media");
            Some(dest)
        } else {
            warn!(id = %track.id, "yt-dlp reported success but output is missing");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> YouTubeSource {
        YouTubeSource::new(HttpClient::new().unwrap(), &SourcesConfig::default())
    }

    #[test]
    fn owns_video_and_playlist_urls() {
        let source = source();
        assert!(source.is_valid("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(source.is_valid("https://music.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(source.is_valid("youtube.com/shorts/abc_123-xy"));
        assert!(source.is_valid("https://www.youtube.com/playlist?list=PL123abc"));
    }

    #[test]
    fn rejects_foreign_urls() {
        let source = source();
        assert!(!source.is_valid("https://open.spotify.com/track/abc"));
        assert!(!source.is_valid(""));
    }

    #[test]
    fn trims_tracking_params() {
        assert_eq!(
            YouTubeSource::trim_query("https://youtube.com/watch?v=abc&t=42s"),
            "https://youtube.com/watch?v=abc"
        );
    }

    #[test]
    fn extracts_video_ids() {
        assert_eq!(
            YouTubeSource::extract_video_id("https://youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            YouTubeSource::extract_video_id("https://youtube.com/shorts/abc123?feature=share"),
            Some("abc123")
        );
        assert_eq!(YouTubeSource::extract_video_id("https://youtube.com/"), None);
    }

    #[test]
    fn maps_entries_with_clock_durations() {
        let entry = json!({
            "id": "vid1",
            "title": "A Song",
            "duration": "3:15",
            "channel": {"name": "ignored shape"},
            "uploader": "Some Channel",
            "thumbnails": [{"url": "https://i.ytimg.com/low.jpg"}, {"url": "https://i.ytimg.com/hi.jpg"}]
        });
        let track = YouTubeSource::map_entry(&entry).unwrap();
        assert_eq!(track.id, "vid1");
        assert_eq!(track.duration_secs, 195);
        assert_eq!(track.artist, "Some Channel");
        assert_eq!(track.cover, "https://i.ytimg.com/hi.jpg");
        assert_eq!(track.year, 0);
        assert_eq!(track.platform, Platform::YouTube);
    }

    #[test]
    fn maps_entries_with_numeric_durations() {
        let entry = json!({"id": "vid2", "title": "Another", "duration": 212.4, "channel": "Ch"});
        let track = YouTubeSource::map_entry(&entry).unwrap();
        assert_eq!(track.duration_secs, 212);
        assert_eq!(track.artist, "Ch");
    }

    #[test]
    fn skips_entries_without_ids() {
        assert!(YouTubeSource::map_entry(&json!({"title": "No id"})).is_none());
    }
}
