//! Chat-scoped value types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat identifier.
///
/// Group voice calls live in chats with negative 64-bit ids; the type is
/// deliberately opaque so nothing outside the host bot interprets the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(i64);

impl ChatId {
    /// Wrap a raw chat id.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw id.
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Playback state of one chat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    /// No stream attached to the voice engine.
    #[default]
    Idle,

    /// A stream is attached and running.
    Playing,

    /// A stream is attached and paused.
    Paused,
}

/// How resolved search results are handled for a chat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayMode {
    /// Auto-play the first hit.
    #[default]
    First,

    /// Present a choice list and wait for a selection.
    Choose,
}

impl PlayMode {
    /// Decode the stored `{0,1}` setting; anything else falls back to
    /// [`PlayMode::First`].
    pub fn from_stored(value: u8) -> Self {
        match value {
            1 => Self::Choose,
            _ => Self::First,
        }
    }

    /// Encode for the settings store.
    pub fn to_stored(self) -> u8 {
        match self {
            Self::First => 0,
            Self::Choose => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_id_roundtrip() {
        let id = ChatId::new(-1001234567890);
        assert_eq!(id.get(), -1001234567890);
        assert_eq!(id.to_string(), "-1001234567890");
    }

    #[test]
    fn play_mode_stored_encoding() {
        assert_eq!(PlayMode::from_stored(0), PlayMode::First);
        assert_eq!(PlayMode::from_stored(1), PlayMode::Choose);
        assert_eq!(PlayMode::from_stored(7), PlayMode::First);
        assert_eq!(PlayMode::Choose.to_stored(), 1);
    }

    #[test]
    fn default_state_is_idle() {
        assert_eq!(PlayerState::default(), PlayerState::Idle);
    }
}
