//! Playback core: positioning, volume/pause control, the track queue and the
//! engine that moves tracks from the queue to the audio sink.

pub mod controls;
pub mod engine;
pub mod positioner;
pub mod preload;
pub mod queue;
pub mod slot;
pub mod state;

pub use controls::{Controller, PlaybackControls, VolumeSettings};
pub use engine::{EngineSettings, PlaybackEngine};
pub use positioner::{PositionHandle, Positioner};
pub use preload::PreloadNotice;
pub use queue::{QueueEntry, Track, TrackQueue};
pub use slot::Slot;
pub use state::{EngineState, StatusSnapshot};
