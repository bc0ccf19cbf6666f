//! Playback engine
//!
//! Orchestrates decode → slot → sink for the current track and keeps the next
//! track preloading in the background. The engine is driven entirely by the
//! control loop: every method runs on the loop's task, and the only other
//! writers of engine state are the preload task (through the [`Handoff`]) and
//! the render callback (slot position).
//!
//! [`Handoff`]: crate::playback::preload::Handoff

use crate::audio::decoder::TrackDecoder;
use crate::audio::output::AudioSink;
use crate::error::{Error, Result};
use crate::playback::controls::{PlaybackControls, VolumeSettings};
use crate::playback::preload::{NextSlot, PreloadNotice, Preloader};
use crate::playback::queue::TrackQueue;
use crate::playback::slot::Slot;
use crate::playback::state::EngineState;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Step sizes and thresholds for engine commands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub seek_step_secs: u64,
    pub volume_step: f64,
    /// Below this position, rewind goes back to the previous track
    pub rewind_threshold_secs: u64,
    pub volume: VolumeSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            seek_step_secs: 10,
            volume_step: 0.1,
            rewind_threshold_secs: 10,
            volume: VolumeSettings::default(),
        }
    }
}

pub struct PlaybackEngine {
    decoder: Arc<dyn TrackDecoder>,
    sink: Arc<dyn AudioSink>,
    controls: Arc<PlaybackControls>,
    settings: EngineSettings,
    preloader: Preloader,
    current: Option<Arc<Slot>>,
    state: EngineState,
}

impl PlaybackEngine {
    /// Create an engine and the channel its preload notices arrive on.
    ///
    /// The sink must already be initialized.
    pub fn new(
        decoder: Arc<dyn TrackDecoder>,
        sink: Arc<dyn AudioSink>,
        settings: EngineSettings,
    ) -> (Self, mpsc::UnboundedReceiver<PreloadNotice>) {
        let controls = Arc::new(PlaybackControls::new(settings.volume));
        Self::with_controls(decoder, sink, settings, controls)
    }

    /// Like [`PlaybackEngine::new`] but keeps existing volume state, so volume
    /// survives a return to playlist selection.
    pub fn with_controls(
        decoder: Arc<dyn TrackDecoder>,
        sink: Arc<dyn AudioSink>,
        settings: EngineSettings,
        controls: Arc<PlaybackControls>,
    ) -> (Self, mpsc::UnboundedReceiver<PreloadNotice>) {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let preloader = Preloader::new(
            Arc::clone(&decoder),
            Arc::clone(&sink),
            Arc::clone(&controls),
            notice_tx,
        );

        let engine = Self {
            decoder,
            sink,
            controls,
            settings,
            preloader,
            current: None,
            state: EngineState::Idle,
        };
        (engine, notice_rx)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn controls(&self) -> &Arc<PlaybackControls> {
        &self.controls
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Slot currently submitted to the sink (from the control loop's view)
    pub fn current(&self) -> Option<&Arc<Slot>> {
        self.current.as_ref()
    }

    /// Non-blocking check for a decoded next slot
    pub fn is_next_ready(&self) -> bool {
        self.preloader.is_ready()
    }

    /// Load the queue head and start playing.
    ///
    /// An empty queue goes straight to `Stopped`.
    pub fn start(&mut self, queue: &mut TrackQueue) -> Result<()> {
        if queue.is_empty() {
            info!("Nothing to play");
            self.state = EngineState::Stopped;
            return Ok(());
        }
        self.load_head(queue)
    }

    /// Periodic check: finish deferred promotions and auto-advance at the end
    /// of the current track.
    pub fn tick(&mut self, queue: &mut TrackQueue) -> Result<EngineState> {
        self.settle(queue, false)?;

        if let Some(reason) = self.current.as_ref().and_then(|slot| slot.failure()) {
            error!("Current track failed while playing: {}", reason);
            self.stop();
            return Err(Error::DecodeFailure(reason));
        }

        let finished = self.current.as_ref().map_or(false, |slot| slot.is_finished());
        if self.state == EngineState::Playing && finished {
            debug!("Current track finished");
            self.advance(queue)?;
        }

        Ok(self.state)
    }

    /// Move on to the next track now
    pub fn skip(&mut self, queue: &mut TrackQueue) -> Result<()> {
        self.settle(queue, false)?;
        match self.state {
            EngineState::Advancing => {
                debug!("Skip ignored, advance already pending");
                Ok(())
            }
            EngineState::Stopped | EngineState::Idle => Ok(()),
            _ => {
                info!("Skipping to next track");
                self.advance(queue)
            }
        }
    }

    /// Go back in history.
    ///
    /// Restarts the current track, or plays the previous one when the
    /// current position is below the rewind threshold. The next-slot preload
    /// is left running.
    pub fn rewind(&mut self, queue: &mut TrackQueue) -> Result<()> {
        self.settle(queue, true)?;

        let (position, threshold) = match self.current.as_ref() {
            Some(slot) => {
                let threshold_secs = self.settings.rewind_threshold_secs;
                (slot.position(), slot.format().frames_for_secs(threshold_secs))
            }
            None => (0, 0),
        };

        self.current = None;
        self.sink.clear();

        let moved = queue.rewind(threshold, position);
        info!("Rewind: {} history entries requeued", moved);

        if queue.is_empty() {
            self.finish_queue();
            return Ok(());
        }
        self.load_head(queue)
    }

    /// Seek the current track by `delta_secs`.
    ///
    /// A forward seek that would land at or past the end is ignored; a
    /// backward seek clamps to the start. Seeks are ignored while an advance
    /// is pending. Returns whether a seek happened.
    pub fn seek_by(&mut self, queue: &mut TrackQueue, delta_secs: i64) -> Result<bool> {
        self.settle(queue, false)?;
        if self.state == EngineState::Advancing {
            debug!("Seek ignored, advance pending");
            return Ok(false);
        }
        let Some(slot) = self.current.as_ref() else {
            return Ok(false);
        };

        let previous = self.state;
        self.state = EngineState::Seeking;

        let delta = delta_secs * slot.format().sample_rate as i64;
        let target = slot.position() as i64 + delta;
        let applied = if delta > 0 && target >= slot.len() as i64 {
            debug!("Forward seek to {} past end ({}), ignored", target, slot.len());
            false
        } else {
            slot.seek(target);
            debug!("Seeked to frame {}", slot.position());
            true
        };

        self.state = previous;
        Ok(applied)
    }

    pub fn seek_forward(&mut self, queue: &mut TrackQueue) -> Result<bool> {
        self.seek_by(queue, self.settings.seek_step_secs as i64)
    }

    pub fn seek_backward(&mut self, queue: &mut TrackQueue) -> Result<bool> {
        self.seek_by(queue, -(self.settings.seek_step_secs as i64))
    }

    /// Flip pause, returning the new paused state
    pub fn toggle_pause(&mut self) -> bool {
        let paused = self.controls.toggle_pause();
        self.state = match self.state {
            EngineState::Playing | EngineState::Paused if paused => EngineState::Paused,
            EngineState::Playing | EngineState::Paused => EngineState::Playing,
            other => other,
        };
        info!("Playback {}", if paused { "paused" } else { "resumed" });
        paused
    }

    pub fn volume_up(&self) {
        self.controls.increase(self.settings.volume_step);
        debug!("Volume {:.1}", self.controls.volume());
    }

    pub fn volume_down(&self) {
        self.controls.decrease(self.settings.volume_step);
        debug!(
            "Volume {:.1} (silent={})",
            self.controls.volume(),
            self.controls.is_silent()
        );
    }

    /// React to a finished preload
    pub fn handle_preload_notice(
        &mut self,
        queue: &mut TrackQueue,
        notice: PreloadNotice,
    ) -> Result<()> {
        debug!("Preload notice: {:?}", notice);
        self.settle(queue, false)
    }

    /// Halt playback and forget both slots.
    ///
    /// The output device stays open; see [`PlaybackEngine::release_output`].
    pub fn stop(&mut self) {
        self.preloader.lock().reset();
        self.current = None;
        self.sink.clear();
        self.state = EngineState::Stopped;
        info!("Playback stopped");
    }

    /// Release the output device
    pub fn release_output(&self) {
        self.sink.release();
    }

    /// Apply a completed promotion or a failed preload.
    ///
    /// With `cancel_pending` the pending-advance flag is cleared under the
    /// same lock, so a promotion either happened already (and is applied
    /// here) or will not happen at all.
    fn settle(&mut self, queue: &mut TrackQueue, cancel_pending: bool) -> Result<()> {
        let (settled, pending_advance) = {
            let mut handoff = self.preloader.lock();
            if cancel_pending {
                handoff.pending_advance = false;
            }
            (handoff.take_settled(), handoff.pending_advance)
        };

        match settled {
            Some(NextSlot::Promoted(slot)) => {
                if queue.peek().map(|head| head.id) == Some(slot.entry().id) {
                    queue.dequeue()?;
                } else {
                    warn!("Promoted entry {} was not the queue head", slot.entry().id);
                    queue.record_history(slot.entry().clone());
                }
                info!("Now playing {}", slot.entry().track.display_name());
                // Previous current slot is released here, after the swap
                self.current = Some(slot);
                self.state = EngineState::Playing;
                self.ensure_preload(queue);
            }
            Some(NextSlot::Failed { entry_id, error }) => {
                if queue.peek().map(|head| head.id) == Some(entry_id) {
                    if let Some(entry) = queue.discard_head() {
                        warn!(
                            "Skipping unplayable track {}: {}",
                            entry.track.display_name(),
                            error
                        );
                    }
                }

                if queue.is_empty() {
                    if pending_advance {
                        self.preloader.lock().pending_advance = false;
                        self.finish_queue();
                    }
                } else {
                    self.ensure_preload(queue);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Promote the next track, defer until its preload completes, or load
    /// the queue head synchronously.
    fn advance(&mut self, queue: &mut TrackQueue) -> Result<()> {
        self.state = EngineState::Advancing;

        loop {
            let Some(head) = queue.peek().cloned() else {
                self.finish_queue();
                return Ok(());
            };

            let mut handoff = self.preloader.lock();
            let next = std::mem::take(&mut handoff.next);
            match next {
                NextSlot::Ready(slot) if slot.entry().id == head.id => {
                    drop(handoff);
                    queue.dequeue()?;
                    self.begin(slot);
                    self.ensure_preload(queue);
                    return Ok(());
                }
                NextSlot::Preloading { entry_id } if entry_id == head.id => {
                    handoff.next = NextSlot::Preloading { entry_id };
                    handoff.pending_advance = true;
                    debug!("Next track still decoding, advance deferred");
                    return Ok(());
                }
                settled @ (NextSlot::Promoted(_) | NextSlot::Failed { .. }) => {
                    // Raced with the preload task; apply its result and retry
                    handoff.next = settled;
                    drop(handoff);
                    self.settle(queue, false)?;
                    if self.state != EngineState::Advancing {
                        return Ok(());
                    }
                }
                other => {
                    // Stale or absent. A stale decode in flight is left alone;
                    // the preload spawned after loading supersedes it.
                    handoff.next = other;
                    drop(handoff);
                    return self.load_head(queue);
                }
            }
        }
    }

    /// Dequeue and decode the queue head as the current track.
    ///
    /// A decode failure here ends the session.
    fn load_head(&mut self, queue: &mut TrackQueue) -> Result<()> {
        self.state = EngineState::Loading;
        let entry = queue.dequeue()?;
        info!("Loading {}", entry.track.display_name());

        let buffer = match self.decoder.decode(entry.track.path()) {
            Ok(buffer) => buffer,
            Err(e) => {
                error!("Failed to load {}: {}", entry.track.display_name(), e);
                self.stop();
                return Err(e);
            }
        };

        let slot = Arc::new(Slot::new(entry, buffer, Arc::clone(&self.controls)));
        self.begin(slot);
        self.ensure_preload(queue);
        Ok(())
    }

    /// Make `slot` the current track
    fn begin(&mut self, slot: Arc<Slot>) {
        self.controls.set_paused(false);
        self.sink.submit(Arc::clone(&slot));
        info!(
            "Now playing {} ({} frames @ {}Hz)",
            slot.entry().track.display_name(),
            slot.len(),
            slot.format().sample_rate
        );
        self.current = Some(slot);
        self.state = EngineState::Playing;
    }

    /// Preload the queue head unless that is already under way
    fn ensure_preload(&self, queue: &TrackQueue) {
        let Some(head) = queue.peek() else {
            return;
        };

        let covered = {
            let handoff = self.preloader.lock();
            match &handoff.next {
                NextSlot::Preloading { entry_id } => *entry_id == head.id,
                NextSlot::Ready(slot) => slot.entry().id == head.id,
                _ => false,
            }
        };

        if !covered {
            self.preloader.spawn(head.clone());
        }
    }

    fn finish_queue(&mut self) {
        info!("Queue exhausted");
        self.current = None;
        self.sink.clear();
        self.state = EngineState::Stopped;
    }
}
