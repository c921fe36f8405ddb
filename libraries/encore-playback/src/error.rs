//! Playback error taxonomy

use encore_core::error::EngineError;
use encore_core::types::PlayerState;
use thiserror::Error;

/// Failures surfaced by the queue cache and the playback controller.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Metadata resolved but the playable payload could not be fetched.
    /// Playback does not start and chat state is unchanged.
    #[error("playable media could not be fetched")]
    MediaUnavailable,

    /// Operation requested against a chat state that does not support it.
    /// A user-facing rejection, not a system error.
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the chat was in.
        state: PlayerState,
    },

    /// Parameter outside contractual bounds. Raised before any engine
    /// call is made.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// 1-based queue index outside the queue.
    #[error("index {index} out of range for queue of {len}")]
    IndexOutOfRange {
        /// Requested 1-based index.
        index: usize,
        /// Queue length at the time of the call.
        len: usize,
    },

    /// Operation needs a queued track and the queue is empty.
    #[error("queue is empty")]
    QueueEmpty,

    /// The voice engine raised during an otherwise-valid operation. Chat
    /// state is rolled back to what it was before the call.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Result alias for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
