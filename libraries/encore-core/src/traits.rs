//! Core traits for Encore
//!
//! `MediaSource` is the seam every external music platform sits behind;
//! `VoiceEngine` and `SettingsStore` are the interfaces the core needs from
//! its host-bot collaborators.

use crate::error::EngineError;
use crate::types::{ChatId, PlatformTracks, PlayMode, Platform, TrackInfo};
use async_trait::async_trait;
use std::path::PathBuf;

/// One external music platform behind a fixed capability surface.
///
/// Every network or parsing failure inside an implementation is caught at
/// this boundary and converted to `None`; callers only ever see
/// optionality, never partial or malformed external payloads. `None` means
/// "source unreachable or malformed", which is distinct from a `Some` with
/// zero tracks ("legitimately nothing found").
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Platform this backend owns.
    fn platform(&self) -> Platform;

    /// Pure syntactic check whether this backend owns the URL shape.
    /// Must not perform network I/O.
    fn is_valid(&self, url: &str) -> bool;

    /// Resolve a URL already classified as owned by this backend into
    /// one-or-many tracks. Playlist-shaped URLs yield all member tracks in
    /// playlist order.
    async fn resolve(&self, url: &str) -> Option<PlatformTracks>;

    /// Free-text lookup, bounded result count, ordered by the source's
    /// relevance ranking.
    async fn search(&self, text: &str) -> Option<PlatformTracks>;

    /// Single-track metadata fetch by opaque platform id, used when a
    /// prior search result is selected later.
    async fn track_by_id(&self, id: &str) -> Option<TrackInfo>;

    /// Resolve/download the streamable payload for a track. May hit the
    /// network and cache locally; failure is `None`, never a panic or an
    /// error escaping this boundary.
    async fn fetch_media(&self, track: &TrackInfo) -> Option<PathBuf>;

    /// Related-track suggestions. Backends without the capability keep
    /// the default.
    async fn recommendations(&self) -> Option<PlatformTracks> {
        None
    }
}

/// External voice-streaming engine, one active stream per chat at most.
///
/// All methods may suspend and may fail; the playback controller is the
/// only caller and catches every failure.
#[async_trait]
pub trait VoiceEngine: Send + Sync {
    /// Attach and start streaming `media` into the chat's voice call.
    async fn start(&self, chat: ChatId, media: &std::path::Path) -> Result<(), EngineError>;

    /// Tear down the chat's stream.
    async fn end(&self, chat: ChatId) -> Result<(), EngineError>;

    /// Pause the running stream.
    async fn pause(&self, chat: ChatId) -> Result<(), EngineError>;

    /// Resume a paused stream.
    async fn resume(&self, chat: ChatId) -> Result<(), EngineError>;

    /// Mute the stream without pausing it.
    async fn mute(&self, chat: ChatId) -> Result<(), EngineError>;

    /// Undo [`VoiceEngine::mute`].
    async fn unmute(&self, chat: ChatId) -> Result<(), EngineError>;

    /// Jump to an absolute position within the current track.
    async fn seek(
        &self,
        chat: ChatId,
        target_secs: u32,
        total_secs: u32,
    ) -> Result<(), EngineError>;

    /// Set stream volume in percent.
    async fn change_volume(&self, chat: ChatId, percent: u32) -> Result<(), EngineError>;

    /// Set stream speed factor.
    async fn change_speed(&self, chat: ChatId, factor: f64) -> Result<(), EngineError>;

    /// Elapsed play time of the current stream, in whole seconds.
    async fn played_time(&self, chat: ChatId) -> Result<u32, EngineError>;
}

/// Persistent per-chat settings the core consumes.
///
/// Storage itself is the host bot's concern; the core only reads the play
/// mode when deciding what to do with search results.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Current play mode for a chat.
    async fn play_mode(&self, chat: ChatId) -> PlayMode;

    /// Persist a chat's play mode.
    async fn set_play_mode(&self, chat: ChatId, mode: PlayMode);
}
