//! Background preload of the next track
//!
//! The preloader decodes the queue head on the blocking pool while the
//! current track plays. Its result lands in a [`Handoff`] shared with the
//! engine. When the engine asked to advance before the decode finished
//! (`pending_advance`), the preload task submits the new slot to the sink
//! itself and leaves it in [`NextSlot::Promoted`] so the control loop can
//! finish the queue bookkeeping exactly once.
//!
//! Every spawn bumps the handoff generation. A task whose generation is no
//! longer current drops its result without touching the handoff.

use crate::audio::decoder::TrackDecoder;
use crate::audio::output::AudioSink;
use crate::playback::controls::PlaybackControls;
use crate::playback::queue::QueueEntry;
use crate::playback::slot::Slot;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// State of the next slot
#[derive(Debug, Default)]
pub enum NextSlot {
    #[default]
    Absent,
    /// Decode in flight for this queue entry
    Preloading { entry_id: Uuid },
    /// Decoded and waiting for promotion
    Ready(Arc<Slot>),
    /// Already submitted to the sink by the preload task; bookkeeping pending
    Promoted(Arc<Slot>),
    /// Decode failed; the entry has not been removed from the queue yet
    Failed { entry_id: Uuid, error: String },
}

impl NextSlot {
    /// Queue entry this state refers to
    pub fn entry_id(&self) -> Option<Uuid> {
        match self {
            NextSlot::Absent => None,
            NextSlot::Preloading { entry_id } | NextSlot::Failed { entry_id, .. } => Some(*entry_id),
            NextSlot::Ready(slot) | NextSlot::Promoted(slot) => Some(slot.entry().id),
        }
    }

    /// Promoted or failed: something the control loop still has to act on
    pub fn is_settled(&self) -> bool {
        matches!(self, NextSlot::Promoted(_) | NextSlot::Failed { .. })
    }
}

/// Next-slot state and the pending-advance flag, guarded together.
#[derive(Debug, Default)]
pub struct Handoff {
    pub next: NextSlot,
    pub pending_advance: bool,
    generation: u64,
}

impl Handoff {
    /// Forget the next slot and invalidate any preload in flight
    pub fn reset(&mut self) {
        self.generation += 1;
        self.next = NextSlot::Absent;
        self.pending_advance = false;
    }

    /// Take the next slot if it is promoted or failed, leaving `Absent`
    pub fn take_settled(&mut self) -> Option<NextSlot> {
        if self.next.is_settled() {
            Some(std::mem::take(&mut self.next))
        } else {
            None
        }
    }
}

/// Sent to the control loop when a preload finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadNotice {
    Ready { entry_id: Uuid },
    Promoted { entry_id: Uuid },
    Failed { entry_id: Uuid },
}

/// Spawns preload tasks and owns the shared handoff.
pub struct Preloader {
    decoder: Arc<dyn TrackDecoder>,
    sink: Arc<dyn AudioSink>,
    controls: Arc<PlaybackControls>,
    handoff: Arc<Mutex<Handoff>>,
    notices: mpsc::UnboundedSender<PreloadNotice>,
}

impl Preloader {
    pub fn new(
        decoder: Arc<dyn TrackDecoder>,
        sink: Arc<dyn AudioSink>,
        controls: Arc<PlaybackControls>,
        notices: mpsc::UnboundedSender<PreloadNotice>,
    ) -> Self {
        Self {
            decoder,
            sink,
            controls,
            handoff: Arc::new(Mutex::new(Handoff::default())),
            notices,
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Handoff> {
        lock_handoff(&self.handoff)
    }

    /// Whether the next slot is decoded and waiting
    pub fn is_ready(&self) -> bool {
        matches!(self.lock().next, NextSlot::Ready(_))
    }

    /// Start decoding `entry` in the background.
    ///
    /// Supersedes any preload in flight. The pending-advance flag is kept so
    /// a restarted preload still completes a deferred advance.
    pub fn spawn(&self, entry: QueueEntry) {
        let generation = {
            let mut handoff = self.lock();
            handoff.generation += 1;
            handoff.next = NextSlot::Preloading { entry_id: entry.id };
            handoff.generation
        };

        debug!(
            "Preloading {} (entry {}, generation {})",
            entry.track.display_name(),
            entry.id,
            generation
        );

        let decoder = Arc::clone(&self.decoder);
        let sink = Arc::clone(&self.sink);
        let controls = Arc::clone(&self.controls);
        let handoff = Arc::clone(&self.handoff);
        let notices = self.notices.clone();

        tokio::task::spawn_blocking(move || {
            let result = decoder.decode(entry.track.path());
            let entry_id = entry.id;

            let mut guard = lock_handoff(&handoff);
            if guard.generation != generation {
                debug!("Discarding stale preload of entry {}", entry_id);
                return;
            }

            let notice = match result {
                Ok(buffer) => {
                    let slot = Arc::new(Slot::new(entry, buffer, controls.clone()));
                    if guard.pending_advance {
                        guard.pending_advance = false;
                        controls.set_paused(false);
                        sink.submit(Arc::clone(&slot));
                        info!("Deferred advance: now playing {}", slot.entry().track.display_name());
                        guard.next = NextSlot::Promoted(slot);
                        PreloadNotice::Promoted { entry_id }
                    } else {
                        debug!("Preload ready: {}", slot.entry().track.display_name());
                        guard.next = NextSlot::Ready(slot);
                        PreloadNotice::Ready { entry_id }
                    }
                }
                Err(e) => {
                    warn!("Preload of {} failed: {}", entry.track.display_name(), e);
                    guard.next = NextSlot::Failed {
                        entry_id,
                        error: e.to_string(),
                    };
                    PreloadNotice::Failed { entry_id }
                }
            };
            drop(guard);

            if notices.send(notice).is_err() {
                debug!("Control loop gone, preload notice dropped");
            }
        });
    }
}

fn lock_handoff(handoff: &Mutex<Handoff>) -> MutexGuard<'_, Handoff> {
    handoff.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
