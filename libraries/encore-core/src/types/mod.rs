mod chat;
mod track;

pub use chat::{ChatId, PlayMode, PlayerState};
pub use track::{PlatformTracks, Platform, QueuedTrack, TrackInfo};
