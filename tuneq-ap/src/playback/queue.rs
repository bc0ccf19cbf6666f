//! Track queue
//!
//! Pending tracks in play order plus an append-only history of tracks that
//! have started playing. "Previous track" works by moving history entries
//! back to the front of the pending list.

use crate::error::{Error, Result};
use rand::seq::SliceRandom;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Locator of one compressed-audio file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Track {
    path: PathBuf,
}

impl Track {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name shown on the player page
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// One enqueued occurrence of a track.
///
/// The same file can be queued more than once; the entry id tells the copies
/// apart when the engine checks whether a preloaded slot still matches the
/// queue head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: Uuid,
    pub track: Track,
}

impl QueueEntry {
    pub fn new(track: Track) -> Self {
        Self {
            id: Uuid::new_v4(),
            track,
        }
    }
}

/// Pending tracks (FIFO) and play history.
#[derive(Debug, Default)]
pub struct TrackQueue {
    pending: VecDeque<QueueEntry>,
    history: Vec<QueueEntry>,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `tracks` in the given order, or shuffled when `shuffle` is set.
    ///
    /// The shuffle is a Fisher-Yates pass with a freshly seeded thread RNG.
    pub fn enqueue_many(&mut self, tracks: Vec<Track>, shuffle: bool) {
        let mut entries: Vec<QueueEntry> = tracks.into_iter().map(QueueEntry::new).collect();
        if shuffle {
            entries.shuffle(&mut rand::thread_rng());
        }
        debug!("Enqueued {} tracks (shuffle={})", entries.len(), shuffle);
        self.pending.extend(entries);
    }

    /// Remove the head of the pending list and record it in history.
    ///
    /// # Errors
    /// `EmptyQueue` when nothing is pending.
    pub fn dequeue(&mut self) -> Result<QueueEntry> {
        let entry = self.pending.pop_front().ok_or(Error::EmptyQueue)?;
        self.record_history(entry.clone());
        Ok(entry)
    }

    /// Drop the head of the pending list without recording it.
    ///
    /// Used when the head turned out to be unplayable before it started.
    pub fn discard_head(&mut self) -> Option<QueueEntry> {
        self.pending.pop_front()
    }

    pub fn record_history(&mut self, entry: QueueEntry) {
        self.history.push(entry);
    }

    /// Move history back onto the front of the pending list.
    ///
    /// Near the start of the current track (`current_position <
    /// threshold_frames`) the two most recent history entries go back, so the
    /// track before the current one plays next. Otherwise only the most recent
    /// entry goes back, restarting the current track. With a short history
    /// only the entries that exist are moved.
    ///
    /// Returns the number of entries moved.
    pub fn rewind(&mut self, threshold_frames: usize, current_position: usize) -> usize {
        let wanted = if current_position < threshold_frames { 2 } else { 1 };
        let count = wanted.min(self.history.len());

        // Popped newest-first; pushing each to the front restores play order
        for _ in 0..count {
            if let Some(entry) = self.history.pop() {
                self.pending.push_front(entry);
            }
        }

        debug!("Rewind moved {} history entries back to pending", count);
        count
    }

    /// Next pending entry without removing it
    pub fn peek(&self) -> Option<&QueueEntry> {
        self.pending.front()
    }

    /// Up to `limit` pending entries, head first
    pub fn upcoming(&self, limit: usize) -> impl Iterator<Item = &QueueEntry> {
        self.pending.iter().take(limit)
    }

    pub fn history(&self) -> &[QueueEntry] {
        &self.history
    }

    pub fn pending(&self) -> impl Iterator<Item = &QueueEntry> {
        self.pending.iter()
    }

    /// Forget pending tracks and history
    pub fn clear(&mut self) {
        self.pending.clear();
        self.history.clear();
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
