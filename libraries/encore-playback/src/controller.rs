//! Playback session controller
//!
//! Sole owner of the voice-engine stream lifecycle. Drives the per-chat
//! state machine `Idle -> Playing -> {Paused, Idle}` and reconciles every
//! engine outcome back into the [`ChatCache`].
//!
//! Every operation fetches first and commits the queue mutation
//! atomically afterwards; no chat lock is held across a network or engine
//! await. After any await the controller re-checks the chat's epoch and
//! discards its result if the chat was stopped in the meantime.

use crate::cache::{AdvanceCommit, ChatCache};
use crate::error::{PlaybackError, Result};
use crate::limits;
use encore_core::traits::VoiceEngine;
use encore_core::types::{ChatId, PlayerState, QueuedTrack, TrackInfo};
use encore_sources::SourceResolver;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What happened to a [`PlayerSession::play`] request.
#[derive(Debug, PartialEq)]
pub enum PlayOutcome {
    /// Chat was idle; the track is now streaming.
    Started(QueuedTrack),
    /// Chat was already playing; the track waits at this 1-based position.
    Queued {
        /// 1-based queue position of the new entry.
        position: usize,
    },
    /// The chat was stopped while media was being fetched; nothing was
    /// queued or started.
    Superseded,
}

/// Per-process playback controller over all chats.
pub struct PlayerSession {
    cache: Arc<ChatCache>,
    engine: Arc<dyn VoiceEngine>,
    resolver: Arc<SourceResolver>,
}

impl PlayerSession {
    /// Wire the controller to its collaborators.
    pub fn new(
        cache: Arc<ChatCache>,
        engine: Arc<dyn VoiceEngine>,
        resolver: Arc<SourceResolver>,
    ) -> Self {
        Self {
            cache,
            engine,
            resolver,
        }
    }

    /// Shared chat cache, for read-side consumers (queue listings, status
    /// displays).
    pub fn cache(&self) -> &Arc<ChatCache> {
        &self.cache
    }

    async fn fetch_media(&self, track: &TrackInfo) -> Result<PathBuf> {
        let backend = self
            .resolver
            .backend_for(track.platform)
            .ok_or(PlaybackError::MediaUnavailable)?;
        backend
            .fetch_media(track)
            .await
            .ok_or(PlaybackError::MediaUnavailable)
    }

    async fn media_for(&self, entry: &QueuedTrack) -> Result<PathBuf> {
        match &entry.media_path {
            Some(path) => Ok(path.clone()),
            None => self.fetch_media(&entry.track).await,
        }
    }

    /// Play a resolved track in a chat, or append it to the running queue.
    ///
    /// Idle chat: fetch media, start the stream, then commit the queue
    /// entry; a media or engine failure leaves the chat idle and the queue
    /// untouched. Active chat: append immediately, no fetch (media is
    /// fetched when the entry reaches the head).
    pub async fn play(
        &self,
        chat: ChatId,
        track: TrackInfo,
        requester: &str,
    ) -> Result<PlayOutcome> {
        let mut entry = QueuedTrack::new(track, requester);

        if self.cache.is_active(chat).await {
            let position = self.cache.enqueue(chat, entry).await;
            debug!(chat = %chat, position, "track queued");
            return Ok(PlayOutcome::Queued { position });
        }

        let epoch = self.cache.open(chat).await;
        let media = match self.fetch_media(&entry.track).await {
            Ok(media) => media,
            Err(err) => {
                self.cache.evict_if_empty(chat).await;
                return Err(err);
            }
        };

        if self.cache.epoch_of(chat).await != Some(epoch) {
            debug!(chat = %chat, "chat stopped during media fetch, discarding");
            return Ok(PlayOutcome::Superseded);
        }

        entry.media_path = Some(media.clone());

        // Another play for this chat may have won the idle slot while we
        // were fetching; its stream stays up and we queue behind it.
        if self.cache.state(chat).await != PlayerState::Idle {
            let position = self.cache.enqueue(chat, entry).await;
            debug!(chat = %chat, position, "lost idle race, track queued");
            return Ok(PlayOutcome::Queued { position });
        }

        if let Err(err) = self.engine.start(chat, &media).await {
            error!(chat = %chat, error = %err, "engine failed to start stream");
            self.cache.evict_if_empty(chat).await;
            return Err(err.into());
        }

        match self.cache.commit_play(chat, epoch, entry.clone()).await {
            Some(head) => {
                info!(chat = %chat, track = %head.track.name, "playback started");
                Ok(PlayOutcome::Started(head))
            }
            None if self.cache.epoch_of(chat).await == Some(epoch) => {
                // Raced between start and commit; the other stream won.
                let position = self.cache.enqueue(chat, entry).await;
                Ok(PlayOutcome::Queued { position })
            }
            None => {
                // Stopped between start and commit; take the stream down.
                if let Err(err) = self.engine.end(chat).await {
                    warn!(chat = %chat, error = %err, "teardown after supersede failed");
                }
                Ok(PlayOutcome::Superseded)
            }
        }
    }

    /// Move to the next queue entry, honoring the head's loop counter.
    ///
    /// Returns the new head, or `None` when nothing is left to play (the
    /// stream is torn down and the chat entry evicted). The pop and
    /// re-enqueue commit only after the replacement stream is up, so an
    /// engine failure leaves the queue exactly as it was.
    pub async fn advance(&self, chat: ChatId) -> Result<Option<QueuedTrack>> {
        let (next, epoch) = self.cache.peek_advance(chat).await;
        let Some(next) = next else {
            debug!(chat = %chat, "queue exhausted");
            self.teardown(chat).await;
            return Ok(None);
        };

        let media = self.media_for(&next).await?;
        if self.cache.epoch_of(chat).await != Some(epoch) {
            debug!(chat = %chat, "chat stopped during media fetch, discarding");
            return Ok(None);
        }

        self.engine.start(chat, &media).await.map_err(|err| {
            error!(chat = %chat, error = %err, "engine failed to start next stream");
            err
        })?;

        match self
            .cache
            .commit_advance(chat, epoch, &next.track.id, media)
            .await
        {
            AdvanceCommit::Head(head) => {
                info!(chat = %chat, track = %head.track.name, "advanced to next track");
                Ok(Some(head))
            }
            AdvanceCommit::Exhausted => {
                self.teardown(chat).await;
                Ok(None)
            }
            AdvanceCommit::Superseded => {
                if let Err(err) = self.engine.end(chat).await {
                    warn!(chat = %chat, error = %err, "teardown after supersede failed");
                }
                Ok(None)
            }
        }
    }

    /// Pause the running stream. Valid only while `Playing`.
    pub async fn pause(&self, chat: ChatId) -> Result<()> {
        let state = self.cache.state(chat).await;
        if state != PlayerState::Playing {
            return Err(PlaybackError::InvalidState {
                operation: "pause",
                state,
            });
        }
        self.engine.pause(chat).await.map_err(|err| {
            error!(chat = %chat, error = %err, "engine pause failed");
            err
        })?;
        self.cache.set_state(chat, PlayerState::Paused).await;
        Ok(())
    }

    /// Resume a paused stream. Valid only while `Paused`.
    pub async fn resume(&self, chat: ChatId) -> Result<()> {
        let state = self.cache.state(chat).await;
        if state != PlayerState::Paused {
            return Err(PlaybackError::InvalidState {
                operation: "resume",
                state,
            });
        }
        self.engine.resume(chat).await.map_err(|err| {
            error!(chat = %chat, error = %err, "engine resume failed");
            err
        })?;
        self.cache.set_state(chat, PlayerState::Playing).await;
        Ok(())
    }

    /// Mute the stream without pausing it.
    pub async fn mute(&self, chat: ChatId) -> Result<()> {
        self.require_attached(chat, "mute").await?;
        self.engine.mute(chat).await?;
        self.cache.set_muted(chat, true).await;
        Ok(())
    }

    /// Undo [`PlayerSession::mute`].
    pub async fn unmute(&self, chat: ChatId) -> Result<()> {
        self.require_attached(chat, "unmute").await?;
        self.engine.unmute(chat).await?;
        self.cache.set_muted(chat, false).await;
        Ok(())
    }

    /// Jump forward by `delta_secs` within the current track. Returns the
    /// absolute target position.
    ///
    /// The delta threshold is checked before any engine call; the target
    /// bound is checked after reading the elapsed time but before seeking.
    pub async fn seek(&self, chat: ChatId, delta_secs: u32) -> Result<u32> {
        limits::check_seek_delta(delta_secs)?;

        let state = self.cache.state(chat).await;
        if state == PlayerState::Idle {
            return Err(PlaybackError::InvalidState {
                operation: "seek",
                state,
            });
        }
        let current = self
            .cache
            .get_current(chat)
            .await
            .ok_or(PlaybackError::QueueEmpty)?;
        let duration = current.track.duration_secs;

        let elapsed = self.engine.played_time(chat).await.map_err(|err| {
            error!(chat = %chat, error = %err, "engine elapsed-time query failed");
            err
        })?;
        let target = limits::seek_target(elapsed, delta_secs, duration)?;

        self.engine.seek(chat, target, duration).await.map_err(|err| {
            error!(chat = %chat, error = %err, "engine seek failed");
            err
        })?;
        Ok(target)
    }

    /// Set the stream speed factor.
    pub async fn set_speed(&self, chat: ChatId, factor: f64) -> Result<()> {
        limits::check_speed(factor)?;
        self.require_attached(chat, "change speed").await?;
        self.engine.change_speed(chat, factor).await.map_err(|err| {
            error!(chat = %chat, error = %err, "engine speed change failed");
            err
        })?;
        self.cache.set_speed_scalar(chat, factor).await;
        Ok(())
    }

    /// Set the stream volume in percent.
    pub async fn set_volume(&self, chat: ChatId, percent: u32) -> Result<()> {
        limits::check_volume(percent)?;
        self.require_attached(chat, "change volume").await?;
        self.engine
            .change_volume(chat, percent)
            .await
            .map_err(|err| {
                error!(chat = %chat, error = %err, "engine volume change failed");
                err
            })?;
        self.cache.set_volume_scalar(chat, percent).await;
        Ok(())
    }

    /// Set the loop counter on the current head.
    pub async fn set_loop(&self, chat: ChatId, count: u32) -> Result<()> {
        self.cache.set_loop_count(chat, count).await
    }

    /// Remove the 1-based queue entry. Removing the head of an active
    /// chat restarts playback with the new head, or tears the stream down
    /// when nothing is left.
    ///
    /// A head removal commits only after the successor's stream is up, so
    /// a media or engine failure leaves the queue exactly as it was.
    pub async fn remove_track(&self, chat: ChatId, index: usize) -> Result<QueuedTrack> {
        // Entries behind the head, and any entry of a detached chat, come
        // out without touching the engine.
        if index != 1 || !self.cache.is_active(chat).await {
            let (removed, _) = self.cache.remove_at(chat, index).await?;
            debug!(chat = %chat, index, track = %removed.track.name, "removed queue entry");
            return Ok(removed);
        }

        let Some((head, successor, epoch)) = self.cache.peek_remove_head(chat).await else {
            return Err(PlaybackError::IndexOutOfRange { index, len: 0 });
        };

        let Some(next) = successor else {
            let (removed, _) = self.cache.remove_at(chat, 1).await?;
            debug!(chat = %chat, track = %removed.track.name, "removed last track");
            self.teardown(chat).await;
            return Ok(removed);
        };

        let media = self.media_for(&next).await?;
        self.engine.start(chat, &media).await.map_err(|err| {
            error!(chat = %chat, error = %err, "engine failed to start replacement stream");
            err
        })?;

        match self
            .cache
            .commit_remove_head(chat, epoch, &head.track.id, &next.track.id, media)
            .await
        {
            Some(removed) => {
                debug!(chat = %chat, track = %removed.track.name, "removed streaming head");
                Ok(removed)
            }
            None => {
                // Chat stopped or queue changed while the replacement was
                // coming up; the stream has no committed head behind it.
                if let Err(err) = self.engine.end(chat).await {
                    warn!(chat = %chat, error = %err, "teardown after supersede failed");
                }
                Err(PlaybackError::IndexOutOfRange { index, len: 0 })
            }
        }
    }

    /// Force-stop regardless of state: stream down, queue gone, idle.
    pub async fn end(&self, chat: ChatId) -> Result<()> {
        self.teardown(chat).await;
        info!(chat = %chat, "playback ended");
        Ok(())
    }

    async fn require_attached(&self, chat: ChatId, operation: &'static str) -> Result<()> {
        let state = self.cache.state(chat).await;
        if state == PlayerState::Idle {
            return Err(PlaybackError::InvalidState { operation, state });
        }
        Ok(())
    }

    /// Stream down and chat entry evicted. Engine refusal is logged, not
    /// surfaced; the cache is cleared either way.
    async fn teardown(&self, chat: ChatId) {
        if self.cache.is_active(chat).await {
            if let Err(err) = self.engine.end(chat).await {
                warn!(chat = %chat, error = %err, "engine teardown failed");
            }
        }
        self.cache.clear(chat).await;
    }
}
