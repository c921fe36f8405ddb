//! Encore Core
//!
//! Platform-agnostic types and traits shared by every Encore crate.
//!
//! This crate defines:
//! - **Domain Types**: `TrackInfo`, `PlatformTracks`, `QueuedTrack`, `ChatId`
//! - **Core Traits**: `MediaSource` (platform backends), `VoiceEngine` and
//!   `SettingsStore` (host-bot collaborators)
//! - **Error Handling**: `EngineError` for voice-engine failures
//!
//! # Example
//!
//! ```rust
//! use encore_core::types::{ChatId, Platform, TrackInfo};
//!
//! let track = TrackInfo::new("dQw4w9WgXcQ", "Some Song", Platform::YouTube);
//! let chat = ChatId::new(-1001234567890);
//! assert_eq!(track.platform.track_url(&track.id), "https://youtube.com/watch?v=dQw4w9WgXcQ");
//! assert_eq!(chat.get(), -1001234567890);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use error::EngineError;
pub use traits::{MediaSource, SettingsStore, VoiceEngine};
pub use types::{
    ChatId, PlatformTracks, PlayMode, PlayerState, Platform, QueuedTrack, TrackInfo,
};
