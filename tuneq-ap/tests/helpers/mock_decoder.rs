//! In-memory decoder for engine tests

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use tuneq_ap::audio::{SampleBuffer, TrackDecoder, TrackFormat};
use tuneq_ap::playback::Track;
use tuneq_ap::{Error, Result};

/// Blocks a decode until opened
#[derive(Clone, Default)]
pub struct Gate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    pub fn open(&self) {
        let (open, cvar) = &*self.inner;
        *open.lock().unwrap() = true;
        cvar.notify_all();
    }

    fn wait(&self) {
        let (open, cvar) = &*self.inner;
        let mut guard = open.lock().unwrap();
        while !*guard {
            guard = cvar.wait(guard).unwrap();
        }
    }
}

enum MockTrack {
    /// Buffer of `frames` frames whose samples all equal `value`
    Tone { frames: usize, value: f32 },
    Broken,
}

/// Decoder serving tracks registered up front.
///
/// Paths that were never registered decode as `ResourceUnavailable`.
#[derive(Default)]
pub struct MockDecoder {
    tracks: Mutex<HashMap<PathBuf, MockTrack>>,
    gates: Mutex<HashMap<PathBuf, Gate>>,
    decodes: Mutex<HashMap<PathBuf, usize>>,
}

impl MockDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn path(name: &str) -> PathBuf {
        PathBuf::from(format!("/mock/{}.mp3", name))
    }

    /// Register a playable track of `frames` frames at [`super::TEST_RATE`]
    pub fn add(&self, name: &str, frames: usize) -> Track {
        self.add_tone(name, frames, 0.5)
    }

    pub fn add_tone(&self, name: &str, frames: usize, value: f32) -> Track {
        let path = Self::path(name);
        self.tracks
            .lock()
            .unwrap()
            .insert(path.clone(), MockTrack::Tone { frames, value });
        Track::new(path)
    }

    /// Register a track that fails to decode
    pub fn add_broken(&self, name: &str) -> Track {
        let path = Self::path(name);
        self.tracks.lock().unwrap().insert(path.clone(), MockTrack::Broken);
        Track::new(path)
    }

    /// Make decodes of `track` wait until the returned gate opens
    pub fn gate(&self, track: &Track) -> Gate {
        let gate = Gate::default();
        self.gates
            .lock()
            .unwrap()
            .insert(track.path().to_path_buf(), gate.clone());
        gate
    }

    /// Number of decodes started for `track`
    pub fn decode_count(&self, track: &Track) -> usize {
        self.decodes
            .lock()
            .unwrap()
            .get(track.path())
            .copied()
            .unwrap_or(0)
    }
}

impl TrackDecoder for MockDecoder {
    fn decode(&self, path: &Path) -> Result<SampleBuffer> {
        *self
            .decodes
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_insert(0) += 1;

        let gate = self.gates.lock().unwrap().get(path).cloned();
        if let Some(gate) = gate {
            gate.wait();
        }

        let tracks = self.tracks.lock().unwrap();
        match tracks.get(path) {
            Some(MockTrack::Tone { frames, value }) => Ok(SampleBuffer::constant(
                *frames,
                *value,
                TrackFormat::new(super::TEST_RATE, 2),
            )),
            Some(MockTrack::Broken) => Err(Error::DecodeFailure(format!(
                "corrupt data in {}",
                path.display()
            ))),
            None => Err(Error::ResourceUnavailable(format!(
                "no such file {}",
                path.display()
            ))),
        }
    }
}
