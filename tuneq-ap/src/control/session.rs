//! Playback session and its control loop
//!
//! A session owns the engine and the queue for one playlist. The loop
//! multiplexes three sources with `tokio::select!`:
//! - a fixed-period tick (auto-advance and status refresh)
//! - user commands
//! - preload completion notices
//!
//! Exactly one event is handled per iteration. Nothing in the loop waits on
//! a preload.

use crate::control::commands::Command;
use crate::error::{Error, Result};
use crate::playback::engine::PlaybackEngine;
use crate::playback::preload::PreloadNotice;
use crate::playback::queue::TrackQueue;
use crate::playback::state::{EngineState, StatusSnapshot};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Where status snapshots are drawn
pub trait StatusSurface {
    fn render(&mut self, snapshot: &StatusSnapshot) -> Result<()>;
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// User asked to pick another playlist
    ReturnToSelection,
    /// Every track has played
    QueueExhausted,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub tick_interval: Duration,
    /// Number of pending tracks listed in snapshots
    pub upcoming_preview: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            upcoming_preview: 5,
        }
    }
}

enum LoopEvent {
    Tick,
    Notice(PreloadNotice),
    Command(Option<Command>),
}

pub struct Session {
    engine: PlaybackEngine,
    queue: TrackQueue,
    notices: mpsc::UnboundedReceiver<PreloadNotice>,
    options: SessionOptions,
}

impl Session {
    pub fn new(
        engine: PlaybackEngine,
        notices: mpsc::UnboundedReceiver<PreloadNotice>,
        queue: TrackQueue,
        options: SessionOptions,
    ) -> Self {
        Self {
            engine,
            queue,
            notices,
            options,
        }
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn queue(&self) -> &TrackQueue {
        &self.queue
    }

    /// Start playing the queue head
    pub fn start(&mut self) -> Result<()> {
        self.engine.start(&mut self.queue)
    }

    /// Apply one command. Returns the outcome when the command ends the
    /// session.
    pub fn apply(&mut self, command: Command) -> Result<Option<SessionOutcome>> {
        debug!("Command: {}", command);
        match command {
            Command::TogglePause => {
                self.engine.toggle_pause();
            }
            Command::SeekForward => {
                self.engine.seek_forward(&mut self.queue)?;
            }
            Command::SeekBackward => {
                self.engine.seek_backward(&mut self.queue)?;
            }
            Command::VolumeUp => self.engine.volume_up(),
            Command::VolumeDown => self.engine.volume_down(),
            Command::Skip => {
                self.engine.skip(&mut self.queue)?;
                return Ok(self.exhausted());
            }
            Command::Rewind => {
                self.engine.rewind(&mut self.queue)?;
                return Ok(self.exhausted());
            }
            Command::ReturnToSelection => {
                self.engine.stop();
                self.queue.clear();
                return Ok(Some(SessionOutcome::ReturnToSelection));
            }
            Command::Quit => {
                self.engine.stop();
                return Ok(Some(SessionOutcome::Quit));
            }
        }
        Ok(None)
    }

    /// Auto-advance check
    pub fn tick(&mut self) -> Result<Option<SessionOutcome>> {
        self.engine.tick(&mut self.queue)?;
        Ok(self.exhausted())
    }

    pub fn handle_notice(&mut self, notice: PreloadNotice) -> Result<Option<SessionOutcome>> {
        self.engine.handle_preload_notice(&mut self.queue, notice)?;
        Ok(self.exhausted())
    }

    fn exhausted(&self) -> Option<SessionOutcome> {
        (self.engine.state() == EngineState::Stopped).then_some(SessionOutcome::QueueExhausted)
    }

    /// Current status, read without blocking on the render path or preload
    pub fn snapshot(&self) -> StatusSnapshot {
        let controls = self.engine.controls();
        let current = self.engine.current();

        StatusSnapshot {
            state: self.engine.state(),
            entry_id: current.map(|slot| slot.entry().id),
            track_name: current.map(|slot| slot.entry().track.display_name()),
            position_frames: current.map_or(0, |slot| slot.position()),
            total_frames: current.map_or(0, |slot| slot.len()),
            sample_rate: current.map_or(0, |slot| slot.format().sample_rate),
            volume_percent: controls.volume_percent(),
            paused: controls.is_paused(),
            silent: controls.is_silent(),
            next_ready: self.engine.is_next_ready(),
            upcoming: self
                .queue
                .upcoming(self.options.upcoming_preview)
                .map(|entry| entry.track.display_name())
                .collect(),
        }
    }

    /// Run the control loop until the session ends.
    ///
    /// The session must have been started. A closed command channel counts
    /// as quit. On error the output device is released before returning.
    pub async fn run(
        &mut self,
        commands: &mut mpsc::UnboundedReceiver<Command>,
        surface: &mut dyn StatusSurface,
    ) -> Result<SessionOutcome> {
        if let Some(outcome) = self.exhausted() {
            return Ok(outcome);
        }

        let mut ticker = tokio::time::interval(self.options.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        if let Err(e) = surface.render(&self.snapshot()) {
            return Err(self.abort(e));
        }

        loop {
            let event = tokio::select! {
                _ = ticker.tick() => LoopEvent::Tick,
                Some(notice) = self.notices.recv() => LoopEvent::Notice(notice),
                command = commands.recv() => LoopEvent::Command(command),
            };

            let step = match event {
                LoopEvent::Tick => self.tick(),
                LoopEvent::Notice(notice) => self.handle_notice(notice),
                LoopEvent::Command(Some(command)) => self.apply(command),
                LoopEvent::Command(None) => {
                    info!("Command channel closed");
                    self.engine.stop();
                    Ok(Some(SessionOutcome::Quit))
                }
            };
            let step = match step {
                Ok(None) => surface.render(&self.snapshot()).map(|()| None),
                other => other,
            };

            match step {
                Ok(Some(outcome)) => {
                    info!("Session ended: {:?}", outcome);
                    return Ok(outcome);
                }
                Ok(None) => {}
                Err(e) => return Err(self.abort(e)),
            }
        }
    }

    /// Stop playback and release the device after a fatal error
    fn abort(&mut self, e: Error) -> Error {
        error!("Session failed: {}", e);
        self.engine.stop();
        self.engine.release_output();
        e
    }
}
