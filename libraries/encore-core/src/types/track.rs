//! Canonical track model produced by platform backends

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// External source a track was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Aggregated catalog API (Spotify / Apple Music / SoundCloud links).
    Catalog,
    /// YouTube and YouTube Music.
    YouTube,
    /// JioSaavn.
    JioSaavn,
    /// File forwarded in-chat, no external catalog behind it.
    Telegram,
}

impl Platform {
    /// Stable lowercase tag used in wire payloads and callback data.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::YouTube => "youtube",
            Self::JioSaavn => "jiosaavn",
            Self::Telegram => "telegram",
        }
    }

    /// Reconstruct the canonical share URL for a track id on this platform.
    ///
    /// JioSaavn ids carry a `title/id` slug; the title half is normalized
    /// the way the site expects (lowercase, punctuation stripped, spaces to
    /// dashes). Telegram media has no URL.
    pub fn track_url(&self, track_id: &str) -> String {
        match self {
            Self::Catalog => format!("https://open.spotify.com/track/{track_id}"),
            Self::YouTube => format!("https://youtube.com/watch?v={track_id}"),
            Self::JioSaavn => match track_id.rsplit_once('/') {
                Some((title, id)) => {
                    let slug: String = title
                        .to_lowercase()
                        .chars()
                        .filter(|c| !matches!(c, '(' | ')' | '"' | '\'' | ','))
                        .map(|c| if c == ' ' { '-' } else { c })
                        .collect();
                    format!("https://www.jiosaavn.com/song/{slug}/{id}")
                }
                None => String::new(),
            },
            Self::Telegram => String::new(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable resolved track.
///
/// Produced by a [`crate::traits::MediaSource`]; never mutated after
/// creation. The `locator` is an opaque content URL understood only by the
/// backend that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    /// Opaque platform-scoped identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Artist name.
    pub artist: String,

    /// Album name, empty when the source has none.
    pub album: String,

    /// Duration in whole seconds; 0 when the source does not report one.
    pub duration_secs: u32,

    /// Cover art URL, empty when the source has none.
    pub cover: String,

    /// Lyrics reference, when the source provides one.
    pub lyrics: Option<String>,

    /// Release year; 0 when unknown.
    pub year: u32,

    /// Source platform tag.
    pub platform: Platform,

    /// Content/download locator (CDN URL or equivalent), opaque.
    pub locator: String,

    /// Payload decryption key passthrough, when the source uses one.
    pub key: Option<String>,
}

impl TrackInfo {
    /// Create a track with the required fields; everything else defaults
    /// to empty/unknown.
    pub fn new(id: impl Into<String>, name: impl Into<String>, platform: Platform) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            artist: String::new(),
            album: String::new(),
            duration_secs: 0,
            cover: String::new(),
            lyrics: None,
            year: 0,
            platform,
            locator: String::new(),
            key: None,
        }
    }
}

/// Ordered result of a single resolution call.
///
/// Insertion order is the source's search/playlist order and is
/// semantically meaningful: it is the display order, and the first element
/// is the default pick. An *empty* set means the source answered with zero
/// results; "source unreachable" is `None` at the backend boundary, never
/// an empty `PlatformTracks`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformTracks {
    /// Tracks in source order.
    pub tracks: Vec<TrackInfo>,
}

impl PlatformTracks {
    /// Wrap an ordered track list.
    pub fn new(tracks: Vec<TrackInfo>) -> Self {
        Self { tracks }
    }

    /// Default pick: the first track in source order.
    pub fn first(&self) -> Option<&TrackInfo> {
        self.tracks.first()
    }

    /// Number of tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// True when the source answered with zero results.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl IntoIterator for PlatformTracks {
    type Item = TrackInfo;
    type IntoIter = std::vec::IntoIter<TrackInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.into_iter()
    }
}

/// A track sitting in a chat's queue.
///
/// `TrackInfo` plus request metadata. Created on enqueue; only the playback
/// controller mutates it (loop counter decrement, media path assignment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedTrack {
    /// Resolved track this entry plays.
    pub track: TrackInfo,

    /// Display name of the requesting user.
    pub requested_by: String,

    /// Remaining repeats for this entry; 0 = play once.
    pub loop_count: u32,

    /// Local media path once fetched, `None` until then.
    pub media_path: Option<PathBuf>,
}

impl QueuedTrack {
    /// Create a queue entry for a resolved track.
    pub fn new(track: TrackInfo, requested_by: impl Into<String>) -> Self {
        Self {
            track,
            requested_by: requested_by.into(),
            loop_count: 0,
            media_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_tags_are_lowercase() {
        assert_eq!(Platform::YouTube.as_str(), "youtube");
        assert_eq!(Platform::JioSaavn.to_string(), "jiosaavn");
    }

    #[test]
    fn youtube_track_url() {
        assert_eq!(
            Platform::YouTube.track_url("abc123"),
            "https://youtube.com/watch?v=abc123"
        );
    }

    #[test]
    fn jiosaavn_track_url_rebuilds_slug() {
        let url = Platform::JioSaavn.track_url("Tum Hi Ho (Reprise)/OgwVXyFo");
        assert_eq!(url, "https://www.jiosaavn.com/song/tum-hi-ho-reprise/OgwVXyFo");
    }

    #[test]
    fn jiosaavn_track_url_without_slug_is_empty() {
        assert_eq!(Platform::JioSaavn.track_url("noslash"), "");
    }

    #[test]
    fn telegram_has_no_track_url() {
        assert_eq!(Platform::Telegram.track_url("whatever"), "");
    }

    #[test]
    fn platform_tracks_default_pick_is_first() {
        let tracks = PlatformTracks::new(vec![
            TrackInfo::new("1", "First", Platform::YouTube),
            TrackInfo::new("2", "Second", Platform::YouTube),
        ]);
        assert_eq!(tracks.first().unwrap().id, "1");
        assert_eq!(tracks.len(), 2);
    }

    #[test]
    fn queued_track_starts_unfetched() {
        let queued = QueuedTrack::new(TrackInfo::new("1", "Song", Platform::Catalog), "alice");
        assert_eq!(queued.loop_count, 0);
        assert!(queued.media_path.is_none());
        assert_eq!(queued.requested_by, "alice");
    }
}
