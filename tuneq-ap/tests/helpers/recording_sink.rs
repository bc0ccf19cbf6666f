//! Audio sink that renders on demand

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tuneq_ap::audio::{AudioFrame, AudioSink, OutputRouter};
use tuneq_ap::playback::Slot;
use tuneq_ap::Result;
use uuid::Uuid;

/// Stands in for the device: tests pull frames with [`RecordingSink::render`].
#[derive(Default)]
pub struct RecordingSink {
    router: OutputRouter,
    submissions: Mutex<Vec<Uuid>>,
    clears: AtomicUsize,
    released: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pull `frames` frames as the device callback would
    pub fn render(&self, frames: usize) -> Vec<AudioFrame> {
        let mut out = vec![AudioFrame::zero(); frames];
        for chunk in out.chunks_mut(256) {
            self.router.render(chunk);
        }
        out
    }

    /// Entry id of the slot being played
    pub fn current_entry(&self) -> Option<Uuid> {
        self.router.current().map(|slot| slot.entry().id)
    }

    pub fn current(&self) -> Option<Arc<Slot>> {
        self.router.current()
    }

    /// Entry ids in submission order
    pub fn submissions(&self) -> Vec<Uuid> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl AudioSink for RecordingSink {
    fn init(&self, sample_rate: u32, _buffer_frames: u32) -> Result<u32> {
        Ok(sample_rate)
    }

    fn submit(&self, slot: Arc<Slot>) {
        self.submissions.lock().unwrap().push(slot.entry().id);
        self.router.submit(slot);
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.router.clear();
    }

    fn release(&self) {
        self.router.clear();
        self.released.store(true, Ordering::SeqCst);
    }
}
