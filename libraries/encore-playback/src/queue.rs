//! Ordered per-chat track queue
//!
//! The head is the currently playing entry. Advancement honors the head's
//! loop counter: a positive counter re-enqueues the head at the tail with
//! the counter decremented instead of discarding it.

use crate::error::{PlaybackError, Result};
use encore_core::types::QueuedTrack;
use std::collections::VecDeque;
use std::path::PathBuf;

/// One chat's ordered queue. Not synchronized; the cache wraps it in a
/// per-chat lock.
#[derive(Debug, Default)]
pub struct ChatQueue {
    items: VecDeque<QueuedTrack>,
}

impl ChatQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued entries, head included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append at the tail, returning the entry's 1-based position.
    pub fn push(&mut self, entry: QueuedTrack) -> usize {
        self.items.push_back(entry);
        self.items.len()
    }

    /// Currently playing entry (the head).
    pub fn current(&self) -> Option<&QueuedTrack> {
        self.items.front()
    }

    /// Entry directly behind the head.
    pub fn second(&self) -> Option<&QueuedTrack> {
        self.items.get(1)
    }

    /// Queue contents in play order.
    pub fn tracks(&self) -> Vec<QueuedTrack> {
        self.items.iter().cloned().collect()
    }

    /// Remove the entry at a 1-based index.
    pub fn remove_at(&mut self, index: usize) -> Result<QueuedTrack> {
        if index == 0 {
            return Err(PlaybackError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        self.items
            .remove(index - 1)
            .ok_or(PlaybackError::IndexOutOfRange {
                index,
                len: self.items.len(),
            })
    }

    /// Set the loop counter on the head.
    pub fn set_loop(&mut self, count: u32) -> Result<()> {
        let head = self.items.front_mut().ok_or(PlaybackError::QueueEmpty)?;
        head.loop_count = count;
        Ok(())
    }

    /// Attach the fetched media path to the head, if the head is still the
    /// expected track.
    pub fn set_head_media(&mut self, track_id: &str, path: PathBuf) -> bool {
        match self.items.front_mut() {
            Some(head) if head.track.id == track_id => {
                head.media_path = Some(path);
                true
            }
            _ => false,
        }
    }

    /// The entry that would be head after one [`ChatQueue::advance`],
    /// without mutating. `None` means an advance would exhaust the queue.
    pub fn peek_advance(&self) -> Option<&QueuedTrack> {
        match self.items.len() {
            0 => None,
            // A looping head comes straight back as its own successor.
            1 => self.items.front().filter(|head| head.loop_count > 0),
            _ => self.items.get(1),
        }
    }

    /// Pop the head, re-enqueueing it at the tail with a decremented
    /// counter when it still has loops left. Returns the popped entry.
    pub fn advance(&mut self) -> Option<QueuedTrack> {
        let popped = self.items.pop_front()?;
        if popped.loop_count > 0 {
            let mut again = popped.clone();
            again.loop_count -= 1;
            self.items.push_back(again);
        }
        Some(popped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_core::types::{Platform, TrackInfo};

    fn entry(id: &str) -> QueuedTrack {
        QueuedTrack::new(TrackInfo::new(id, format!("Track {id}"), Platform::YouTube), "alice")
    }

    #[test]
    fn push_preserves_fifo_order() {
        let mut queue = ChatQueue::new();
        assert_eq!(queue.push(entry("t1")), 1);
        assert_eq!(queue.push(entry("t2")), 2);
        assert_eq!(queue.push(entry("t3")), 3);

        let ids: Vec<String> = queue.tracks().into_iter().map(|e| e.track.id).collect();
        assert_eq!(ids, ["t1", "t2", "t3"]);
        assert_eq!(queue.current().unwrap().track.id, "t1");
    }

    #[test]
    fn remove_head_shifts_queue() {
        let mut queue = ChatQueue::new();
        queue.push(entry("t1"));
        queue.push(entry("t2"));
        queue.push(entry("t3"));

        let removed = queue.remove_at(1).unwrap();
        assert_eq!(removed.track.id, "t1");
        let ids: Vec<String> = queue.tracks().into_iter().map(|e| e.track.id).collect();
        assert_eq!(ids, ["t2", "t3"]);
    }

    #[test]
    fn remove_at_is_one_based() {
        let mut queue = ChatQueue::new();
        queue.push(entry("t1"));
        queue.push(entry("t2"));

        assert!(matches!(
            queue.remove_at(0),
            Err(PlaybackError::IndexOutOfRange { index: 0, len: 2 })
        ));
        assert!(matches!(
            queue.remove_at(3),
            Err(PlaybackError::IndexOutOfRange { index: 3, len: 2 })
        ));
        assert_eq!(queue.remove_at(2).unwrap().track.id, "t2");
    }

    #[test]
    fn loop_counter_reenqueues_with_decrement() {
        let mut queue = ChatQueue::new();
        queue.push(entry("t1"));
        queue.set_loop(2).unwrap();

        let popped = queue.advance().unwrap();
        assert_eq!(popped.loop_count, 2);
        assert_eq!(queue.current().unwrap().loop_count, 1);

        queue.advance().unwrap();
        assert_eq!(queue.current().unwrap().loop_count, 0);

        // Counter spent: the third advance discards the entry.
        queue.advance().unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn set_loop_on_empty_queue_fails() {
        let mut queue = ChatQueue::new();
        assert!(matches!(queue.set_loop(2), Err(PlaybackError::QueueEmpty)));
    }

    #[test]
    fn peek_advance_previews_successor() {
        let mut queue = ChatQueue::new();
        assert!(queue.peek_advance().is_none());

        queue.push(entry("t1"));
        assert!(queue.peek_advance().is_none());

        queue.set_loop(1).unwrap();
        assert_eq!(queue.peek_advance().unwrap().track.id, "t1");

        queue.push(entry("t2"));
        assert_eq!(queue.peek_advance().unwrap().track.id, "t2");
    }

    #[test]
    fn head_media_attaches_only_to_expected_track() {
        let mut queue = ChatQueue::new();
        queue.push(entry("t1"));

        assert!(!queue.set_head_media("t9", "/tmp/t9.mp3".into()));
        assert!(queue.set_head_media("t1", "/tmp/t1.mp3".into()));
        assert_eq!(
            queue.current().unwrap().media_path.as_deref(),
            Some(std::path::Path::new("/tmp/t1.mp3"))
        );
    }
}
