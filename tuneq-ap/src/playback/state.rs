//! Playback state and status snapshots

use uuid::Uuid;

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Nothing loaded yet
    Idle,
    /// Decoding the current track synchronously
    Loading,
    Playing,
    Paused,
    /// Applying a seek on the current slot
    Seeking,
    /// Waiting for the next track to become current
    Advancing,
    /// Queue exhausted or playback halted
    Stopped,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Idle => write!(f, "idle"),
            EngineState::Loading => write!(f, "loading"),
            EngineState::Playing => write!(f, "playing"),
            EngineState::Paused => write!(f, "paused"),
            EngineState::Seeking => write!(f, "seeking"),
            EngineState::Advancing => write!(f, "advancing"),
            EngineState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Point-in-time view of the session for the status surface.
///
/// Built without waiting on the render path or on preload.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub state: EngineState,
    /// Queue entry of the current track
    pub entry_id: Option<Uuid>,
    /// File name of the current track
    pub track_name: Option<String>,
    pub position_frames: usize,
    pub total_frames: usize,
    pub sample_rate: u32,
    /// Volume as a display percentage
    pub volume_percent: f64,
    pub paused: bool,
    pub silent: bool,
    /// Whether the next track is decoded and waiting
    pub next_ready: bool,
    /// File names of the next few pending tracks, head first
    pub upcoming: Vec<String>,
}

impl StatusSnapshot {
    pub fn position_secs(&self) -> u64 {
        tuneq_common::human_time::frames_to_secs(self.position_frames, self.sample_rate)
    }

    pub fn total_secs(&self) -> u64 {
        tuneq_common::human_time::frames_to_secs(self.total_frames, self.sample_rate)
    }
}
