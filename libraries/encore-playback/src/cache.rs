//! Chat-partitioned session cache
//!
//! One entry per chat holding the queue, player state, and stream scalars.
//! The outer map is behind a briefly-held `RwLock`; each entry has its own
//! `Mutex`, so mutations for one chat never block another chat.
//!
//! Every entry carries an epoch drawn from a process-wide counter at
//! creation time. `clear` evicts the entry, so a controller operation that
//! snapshotted the epoch before suspending can detect on resume that the
//! chat was stopped underneath it and discard its result.

use crate::error::{PlaybackError, Result};
use crate::queue::ChatQueue;
use encore_core::types::{ChatId, PlayerState, QueuedTrack};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Mutable per-chat state. Lives behind the entry lock; only this module
/// touches it directly.
#[derive(Debug)]
struct ChatState {
    queue: ChatQueue,
    state: PlayerState,
    active: bool,
    epoch: u64,
    muted: bool,
    volume: u32,
    speed: f64,
}

impl ChatState {
    fn new(epoch: u64) -> Self {
        Self {
            queue: ChatQueue::new(),
            state: PlayerState::Idle,
            active: false,
            epoch,
            muted: false,
            volume: 100,
            speed: 1.0,
        }
    }
}

/// Read-only view of one chat's state.
#[derive(Debug, Clone)]
pub struct ChatSnapshot {
    /// Queue contents in play order.
    pub queue: Vec<QueuedTrack>,
    /// Player state.
    pub state: PlayerState,
    /// Whether a stream is attached to the voice engine.
    pub active: bool,
    /// Whether the stream is muted.
    pub muted: bool,
    /// Volume percent.
    pub volume: u32,
    /// Speed factor.
    pub speed: f64,
}

/// Outcome of committing a queue advance after the replacement stream is
/// already up.
#[derive(Debug, PartialEq)]
pub enum AdvanceCommit {
    /// New head committed and now playing.
    Head(QueuedTrack),
    /// The advance emptied the queue; caller tears the stream down.
    Exhausted,
    /// The chat was stopped or its queue changed while the caller was
    /// suspended; nothing was committed.
    Superseded,
}

/// Process-wide store of per-chat playback state.
///
/// Entries are created on first use and evicted by [`ChatCache::clear`].
/// Absent entries read as idle and empty.
#[derive(Debug, Default)]
pub struct ChatCache {
    chats: RwLock<HashMap<ChatId, Arc<Mutex<ChatState>>>>,
    generation: AtomicU64,
}

impl ChatCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    async fn existing(&self, chat: ChatId) -> Option<Arc<Mutex<ChatState>>> {
        self.chats.read().await.get(&chat).cloned()
    }

    async fn entry(&self, chat: ChatId) -> Arc<Mutex<ChatState>> {
        if let Some(entry) = self.existing(chat).await {
            return entry;
        }
        let mut map = self.chats.write().await;
        map.entry(chat)
            .or_insert_with(|| {
                let epoch = self.generation.fetch_add(1, Ordering::Relaxed);
                debug!(chat = %chat, epoch, "creating chat entry");
                Arc::new(Mutex::new(ChatState::new(epoch)))
            })
            .clone()
    }

    /// Ensure an entry exists and return its epoch.
    pub async fn open(&self, chat: ChatId) -> u64 {
        self.entry(chat).await.lock().await.epoch
    }

    /// Epoch of an existing entry, `None` when the chat has no entry.
    pub async fn epoch_of(&self, chat: ChatId) -> Option<u64> {
        match self.existing(chat).await {
            Some(entry) => Some(entry.lock().await.epoch),
            None => None,
        }
    }

    /// Whether a stream is attached to this chat.
    pub async fn is_active(&self, chat: ChatId) -> bool {
        match self.existing(chat).await {
            Some(entry) => entry.lock().await.active,
            None => false,
        }
    }

    /// Player state; absent chats are idle.
    pub async fn state(&self, chat: ChatId) -> PlayerState {
        match self.existing(chat).await {
            Some(entry) => entry.lock().await.state,
            None => PlayerState::Idle,
        }
    }

    /// Set the player state on an existing entry.
    pub async fn set_state(&self, chat: ChatId, state: PlayerState) {
        if let Some(entry) = self.existing(chat).await {
            entry.lock().await.state = state;
        }
    }

    /// Mark a stream attached.
    pub async fn mark_active(&self, chat: ChatId) {
        self.entry(chat).await.lock().await.active = true;
    }

    /// Mark the stream detached without touching the queue.
    pub async fn mark_inactive(&self, chat: ChatId) {
        if let Some(entry) = self.existing(chat).await {
            entry.lock().await.active = false;
        }
    }

    /// Queue contents in play order; empty for absent chats.
    pub async fn get_queue(&self, chat: ChatId) -> Vec<QueuedTrack> {
        match self.existing(chat).await {
            Some(entry) => entry.lock().await.queue.tracks(),
            None => Vec::new(),
        }
    }

    /// Currently playing entry (queue head).
    pub async fn get_current(&self, chat: ChatId) -> Option<QueuedTrack> {
        let entry = self.existing(chat).await?;
        let state = entry.lock().await;
        state.queue.current().cloned()
    }

    /// Number of queued entries.
    pub async fn count(&self, chat: ChatId) -> usize {
        match self.existing(chat).await {
            Some(entry) => entry.lock().await.queue.len(),
            None => 0,
        }
    }

    /// Append a track, returning its 1-based queue position.
    pub async fn enqueue(&self, chat: ChatId, track: QueuedTrack) -> usize {
        self.entry(chat).await.lock().await.queue.push(track)
    }

    /// Remove the entry at a 1-based index. The second return value is
    /// true when the removed entry was the head of an active chat, in
    /// which case the caller restarts playback with the new head.
    pub async fn remove_at(&self, chat: ChatId, index: usize) -> Result<(QueuedTrack, bool)> {
        let entry = self
            .existing(chat)
            .await
            .ok_or(PlaybackError::IndexOutOfRange { index, len: 0 })?;
        let mut state = entry.lock().await;
        let removed = state.queue.remove_at(index)?;
        Ok((removed, index == 1 && state.active))
    }

    /// Set the loop counter on the current head.
    pub async fn set_loop_count(&self, chat: ChatId, count: u32) -> Result<()> {
        let entry = self.existing(chat).await.ok_or(PlaybackError::QueueEmpty)?;
        let mut state = entry.lock().await;
        state.queue.set_loop(count)
    }

    /// Evict the chat entry entirely. In-flight operations that
    /// snapshotted the old epoch will find it gone (or replaced with a
    /// fresh epoch) and discard their results.
    pub async fn clear(&self, chat: ChatId) {
        if self.chats.write().await.remove(&chat).is_some() {
            debug!(chat = %chat, "cleared chat entry");
        }
    }

    /// Chats that currently have a stream attached.
    pub async fn active_chats(&self) -> Vec<ChatId> {
        let entries: Vec<(ChatId, Arc<Mutex<ChatState>>)> = self
            .chats
            .read()
            .await
            .iter()
            .map(|(chat, entry)| (*chat, entry.clone()))
            .collect();

        let mut active = Vec::new();
        for (chat, entry) in entries {
            if entry.lock().await.active {
                active.push(chat);
            }
        }
        active
    }

    /// Read-only view of one chat.
    pub async fn snapshot(&self, chat: ChatId) -> Option<ChatSnapshot> {
        let entry = self.existing(chat).await?;
        let state = entry.lock().await;
        Some(ChatSnapshot {
            queue: state.queue.tracks(),
            state: state.state,
            active: state.active,
            muted: state.muted,
            volume: state.volume,
            speed: state.speed,
        })
    }

    /// Record the muted flag after a successful engine call.
    pub async fn set_muted(&self, chat: ChatId, muted: bool) {
        if let Some(entry) = self.existing(chat).await {
            entry.lock().await.muted = muted;
        }
    }

    /// Record the volume scalar after a successful engine call.
    pub async fn set_volume_scalar(&self, chat: ChatId, percent: u32) {
        if let Some(entry) = self.existing(chat).await {
            entry.lock().await.volume = percent;
        }
    }

    /// Record the speed scalar after a successful engine call.
    pub async fn set_speed_scalar(&self, chat: ChatId, factor: f64) {
        if let Some(entry) = self.existing(chat).await {
            entry.lock().await.speed = factor;
        }
    }

    /// The entry that would be head after an advance, plus the epoch to
    /// commit against. `None` means an advance would exhaust the queue.
    pub async fn peek_advance(&self, chat: ChatId) -> (Option<QueuedTrack>, u64) {
        match self.existing(chat).await {
            Some(entry) => {
                let state = entry.lock().await;
                (state.queue.peek_advance().cloned(), state.epoch)
            }
            None => (None, 0),
        }
    }

    /// Atomically apply a queue advance after the replacement stream was
    /// started. Refuses to commit when the chat was stopped (epoch moved)
    /// or the queue changed so the successor is no longer `expected_id`.
    pub async fn commit_advance(
        &self,
        chat: ChatId,
        expected_epoch: u64,
        expected_id: &str,
        media: PathBuf,
    ) -> AdvanceCommit {
        let Some(entry) = self.existing(chat).await else {
            return AdvanceCommit::Superseded;
        };
        let mut state = entry.lock().await;
        if state.epoch != expected_epoch {
            return AdvanceCommit::Superseded;
        }

        match state.queue.peek_advance() {
            Some(next) if next.track.id == expected_id => {
                state.queue.advance();
                state.queue.set_head_media(expected_id, media);
                state.state = PlayerState::Playing;
                state.active = true;
                state
                    .queue
                    .current()
                    .cloned()
                    .map_or(AdvanceCommit::Exhausted, AdvanceCommit::Head)
            }
            Some(_) => AdvanceCommit::Superseded,
            None => {
                state.queue.advance();
                state.state = PlayerState::Idle;
                state.active = false;
                AdvanceCommit::Exhausted
            }
        }
    }

    /// Candidate state for removing the streaming head: the head, its
    /// successor (the would-be new head), and the epoch to commit
    /// against. `None` when the chat has no entry or no head.
    pub async fn peek_remove_head(
        &self,
        chat: ChatId,
    ) -> Option<(QueuedTrack, Option<QueuedTrack>, u64)> {
        let entry = self.existing(chat).await?;
        let state = entry.lock().await;
        let head = state.queue.current().cloned()?;
        Some((head, state.queue.second().cloned(), state.epoch))
    }

    /// Atomically remove the streaming head after its successor's stream
    /// was started. Refuses when the chat was stopped (epoch moved) or
    /// the queue changed so head/successor are no longer the expected
    /// tracks. Returns the removed head.
    pub async fn commit_remove_head(
        &self,
        chat: ChatId,
        expected_epoch: u64,
        expected_head_id: &str,
        expected_next_id: &str,
        media: PathBuf,
    ) -> Option<QueuedTrack> {
        let entry = self.existing(chat).await?;
        let mut state = entry.lock().await;
        if state.epoch != expected_epoch {
            return None;
        }
        let unchanged = state.queue.current().is_some_and(|h| h.track.id == expected_head_id)
            && state.queue.second().is_some_and(|n| n.track.id == expected_next_id);
        if !unchanged {
            return None;
        }
        let removed = state.queue.remove_at(1).ok()?;
        state.queue.set_head_media(expected_next_id, media);
        state.state = PlayerState::Playing;
        state.active = true;
        Some(removed)
    }

    /// Drop the chat entry if it holds nothing: empty queue, idle, no
    /// stream. Keeps a failed first play from leaving a permanent entry.
    pub async fn evict_if_empty(&self, chat: ChatId) {
        let mut map = self.chats.write().await;
        let Some(entry) = map.get(&chat).cloned() else {
            return;
        };
        let empty = {
            let state = entry.lock().await;
            state.queue.is_empty() && state.state == PlayerState::Idle && !state.active
        };
        if empty {
            map.remove(&chat);
        }
    }

    /// Atomically commit the first play into an idle chat after its
    /// stream was started. Returns the committed head, or `None` when the
    /// chat was stopped or started by someone else while the caller was
    /// suspended.
    pub async fn commit_play(
        &self,
        chat: ChatId,
        expected_epoch: u64,
        track: QueuedTrack,
    ) -> Option<QueuedTrack> {
        let entry = self.existing(chat).await?;
        let mut state = entry.lock().await;
        if state.epoch != expected_epoch || state.state != PlayerState::Idle {
            return None;
        }
        state.queue.push(track);
        state.state = PlayerState::Playing;
        state.active = true;
        state.queue.current().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_core::types::{Platform, TrackInfo};

    fn entry(id: &str) -> QueuedTrack {
        QueuedTrack::new(TrackInfo::new(id, format!("Track {id}"), Platform::YouTube), "alice")
    }

    #[tokio::test]
    async fn chats_are_isolated() {
        let cache = ChatCache::new();
        let a = ChatId::new(-100);
        let b = ChatId::new(-200);

        cache.enqueue(a, entry("a1")).await;
        cache.enqueue(a, entry("a2")).await;
        cache.enqueue(b, entry("b1")).await;

        cache.clear(a).await;
        assert!(cache.get_queue(a).await.is_empty());
        assert_eq!(cache.count(b).await, 1);
        assert_eq!(cache.get_current(b).await.unwrap().track.id, "b1");
    }

    #[tokio::test]
    async fn enqueue_reports_one_based_position() {
        let cache = ChatCache::new();
        let chat = ChatId::new(-100);

        assert_eq!(cache.enqueue(chat, entry("t1")).await, 1);
        assert_eq!(cache.enqueue(chat, entry("t2")).await, 2);
    }

    #[tokio::test]
    async fn absent_chats_read_as_idle_and_empty() {
        let cache = ChatCache::new();
        let chat = ChatId::new(-1);

        assert!(!cache.is_active(chat).await);
        assert_eq!(cache.state(chat).await, PlayerState::Idle);
        assert!(cache.get_queue(chat).await.is_empty());
        assert!(cache.get_current(chat).await.is_none());
        assert!(cache.epoch_of(chat).await.is_none());
    }

    #[tokio::test]
    async fn clear_moves_the_epoch() {
        let cache = ChatCache::new();
        let chat = ChatId::new(-100);

        let before = cache.open(chat).await;
        cache.clear(chat).await;
        let after = cache.open(chat).await;
        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn commit_play_refuses_stale_epoch() {
        let cache = ChatCache::new();
        let chat = ChatId::new(-100);

        let epoch = cache.open(chat).await;
        cache.clear(chat).await;
        cache.open(chat).await;

        assert!(cache.commit_play(chat, epoch, entry("t1")).await.is_none());
        assert!(cache.get_queue(chat).await.is_empty());
    }

    #[tokio::test]
    async fn commit_play_refuses_non_idle_chat() {
        let cache = ChatCache::new();
        let chat = ChatId::new(-100);

        let epoch = cache.open(chat).await;
        cache.commit_play(chat, epoch, entry("t1")).await.unwrap();
        assert!(cache.commit_play(chat, epoch, entry("t2")).await.is_none());
        assert_eq!(cache.count(chat).await, 1);
    }

    #[tokio::test]
    async fn commit_advance_refuses_changed_successor() {
        let cache = ChatCache::new();
        let chat = ChatId::new(-100);

        cache.enqueue(chat, entry("t1")).await;
        cache.enqueue(chat, entry("t2")).await;
        let (next, epoch) = cache.peek_advance(chat).await;
        assert_eq!(next.unwrap().track.id, "t2");

        // t2 disappears while the caller is fetching its media.
        cache.remove_at(chat, 2).await.unwrap();
        assert_eq!(
            cache
                .commit_advance(chat, epoch, "t2", "/tmp/t2.mp3".into())
                .await,
            AdvanceCommit::Superseded
        );
        assert_eq!(cache.count(chat).await, 1);
    }

    #[tokio::test]
    async fn commit_advance_promotes_successor() {
        let cache = ChatCache::new();
        let chat = ChatId::new(-100);

        cache.enqueue(chat, entry("t1")).await;
        cache.enqueue(chat, entry("t2")).await;
        let (_, epoch) = cache.peek_advance(chat).await;

        match cache
            .commit_advance(chat, epoch, "t2", "/tmp/t2.mp3".into())
            .await
        {
            AdvanceCommit::Head(head) => {
                assert_eq!(head.track.id, "t2");
                assert_eq!(head.media_path.as_deref(), Some(std::path::Path::new("/tmp/t2.mp3")));
            }
            other => panic!("expected committed head, got {other:?}"),
        }
        assert_eq!(cache.state(chat).await, PlayerState::Playing);
    }

    #[tokio::test]
    async fn set_loop_count_updates_the_head() {
        let cache = ChatCache::new();
        let chat = ChatId::new(-100);

        assert!(cache.set_loop_count(chat, 2).await.is_err());

        cache.enqueue(chat, entry("t1")).await;
        cache.set_loop_count(chat, 2).await.unwrap();
        assert_eq!(cache.get_current(chat).await.unwrap().loop_count, 2);
    }

    #[tokio::test]
    async fn commit_remove_head_requires_unchanged_queue() {
        let cache = ChatCache::new();
        let chat = ChatId::new(-100);

        cache.enqueue(chat, entry("t1")).await;
        cache.enqueue(chat, entry("t2")).await;
        cache.mark_active(chat).await;
        let (head, next, epoch) = cache.peek_remove_head(chat).await.unwrap();
        assert_eq!(head.track.id, "t1");
        let next = next.unwrap();

        // The successor disappears while its stream was coming up.
        cache.remove_at(chat, 2).await.unwrap();
        assert!(cache
            .commit_remove_head(chat, epoch, &head.track.id, &next.track.id, "/tmp/t2.mp3".into())
            .await
            .is_none());
        assert_eq!(cache.get_current(chat).await.unwrap().track.id, "t1");

        cache.enqueue(chat, entry("t2")).await;
        let removed = cache
            .commit_remove_head(chat, epoch, "t1", "t2", "/tmp/t2.mp3".into())
            .await
            .unwrap();
        assert_eq!(removed.track.id, "t1");
        let current = cache.get_current(chat).await.unwrap();
        assert_eq!(current.track.id, "t2");
        assert_eq!(current.media_path.as_deref(), Some(std::path::Path::new("/tmp/t2.mp3")));
    }

    #[tokio::test]
    async fn evict_if_empty_drops_only_unused_entries() {
        let cache = ChatCache::new();
        let chat = ChatId::new(-100);

        cache.open(chat).await;
        cache.evict_if_empty(chat).await;
        assert!(cache.epoch_of(chat).await.is_none());

        cache.enqueue(chat, entry("t1")).await;
        cache.evict_if_empty(chat).await;
        assert_eq!(cache.count(chat).await, 1);
    }

    #[tokio::test]
    async fn active_chats_lists_only_attached_streams() {
        let cache = ChatCache::new();
        let a = ChatId::new(-100);
        let b = ChatId::new(-200);

        cache.enqueue(a, entry("a1")).await;
        cache.enqueue(b, entry("b1")).await;
        cache.mark_active(a).await;

        assert_eq!(cache.active_chats().await, vec![a]);
    }
}
