//! Error types shared across Encore crates

use thiserror::Error;

/// Failure raised by a [`crate::traits::VoiceEngine`] implementation.
///
/// The engine is an external collaborator; all we can carry across the
/// boundary is its message. The playback controller logs the detail and
/// surfaces a typed wrapper to its own callers.
#[derive(Debug, Clone, Error)]
#[error("voice engine error: {message}")]
pub struct EngineError {
    /// Message reported by the engine.
    pub message: String,
}

impl EngineError {
    /// Wrap an engine failure message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for EngineError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for EngineError {
    fn from(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}
