//! Encore Playback
//!
//! Per-chat playback state: the ordered track queue, the session cache
//! partitioned by chat id, and the [`PlayerSession`] controller that drives
//! the external voice engine and reconciles its outcome back into the
//! cache.
//!
//! Concurrency model: the cache is fully partitioned by chat. Queue
//! mutations for one chat are linearized behind a per-chat lock that is
//! never held across a network or engine await; in-flight operations detect
//! a supersede (stop/clear while they were suspended) through the chat
//! entry's epoch and discard their result instead of committing.

#![forbid(unsafe_code)]

pub mod cache;
pub mod controller;
pub mod error;
pub mod limits;
pub mod queue;

pub use cache::{AdvanceCommit, ChatCache, ChatSnapshot};
pub use controller::{PlayOutcome, PlayerSession};
pub use error::{PlaybackError, Result};
pub use queue::ChatQueue;
