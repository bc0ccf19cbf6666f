//! Audio output using cpal
//!
//! The device callback pulls frames from an [`OutputRouter`], which holds the
//! currently submitted playback slot behind an atomic reference. Swapping the
//! slot never blocks the callback, and the previous slot is freed only once
//! the callback has let go of it.

use crate::audio::types::{fill_silence, AudioFrame};
use crate::error::{Error, Result};
use crate::playback::slot::Slot;
use arc_swap::ArcSwapOption;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Audio output sink consumed by the playback engine.
pub trait AudioSink: Send + Sync {
    /// Open the output at (ideally) `sample_rate` with `buffer_frames` frames
    /// per callback. Returns the rate actually in use.
    fn init(&self, sample_rate: u32, buffer_frames: u32) -> Result<u32>;

    /// Make `slot` the stream being played, replacing any previous one.
    fn submit(&self, slot: Arc<Slot>);

    /// Stop whatever is playing. Must be called before a new stream is
    /// submitted when the old one must not be heard again.
    fn clear(&self);

    /// Release the output device. The sink is unusable afterwards.
    fn release(&self);
}

/// Routes device callbacks to the current slot.
#[derive(Default)]
pub struct OutputRouter {
    current: ArcSwapOption<Slot>,
}

impl OutputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill `frames` from the current slot, or with silence when nothing is
    /// submitted.
    pub fn render(&self, frames: &mut [AudioFrame]) {
        let current = self.current.load();
        match current.as_ref() {
            Some(slot) => slot.render(frames),
            None => fill_silence(frames),
        }
    }

    /// Atomically replace the current slot
    pub fn submit(&self, slot: Arc<Slot>) {
        self.current.store(Some(slot));
    }

    pub fn clear(&self) {
        self.current.store(None);
    }

    /// Slot the callback is reading from
    pub fn current(&self) -> Option<Arc<Slot>> {
        self.current.load_full()
    }
}

/// Keeps the cpal stream alive on its own thread.
///
/// cpal::Stream is not Send, so it is created on a dedicated thread that
/// parks until the sink is released.
struct OutputWorker {
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// [`AudioSink`] backed by the system audio device.
pub struct CpalSink {
    router: Arc<OutputRouter>,
    device_name: Option<String>,
    worker: Mutex<Option<OutputWorker>>,
}

impl CpalSink {
    /// Sink for the named device (None = system default)
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            router: Arc::new(OutputRouter::new()),
            device_name,
            worker: Mutex::new(None),
        }
    }

    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        AudioOutput::list_devices()
    }

    fn lock_worker(&self) -> std::sync::MutexGuard<'_, Option<OutputWorker>> {
        self.worker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AudioSink for CpalSink {
    fn init(&self, sample_rate: u32, buffer_frames: u32) -> Result<u32> {
        let mut worker = self.lock_worker();
        if worker.is_some() {
            return Err(Error::InvalidState("Audio output already initialized".to_string()));
        }

        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32>>();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);
        let router = Arc::clone(&self.router);
        let device_name = self.device_name.clone();

        let handle = std::thread::Builder::new()
            .name("tuneq-audio-out".to_string())
            .spawn(move || {
                // Create audio output (must be done on non-async thread for cpal)
                let mut output = match AudioOutput::open(device_name, sample_rate, buffer_frames) {
                    Ok(output) => output,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                if let Err(e) = output.start(router) {
                    let _ = ready_tx.send(Err(e));
                    return;
                }

                let _ = ready_tx.send(Ok(output.sample_rate()));

                // Keep audio output alive until released
                while !shutdown_clone.load(Ordering::Acquire) {
                    std::thread::sleep(Duration::from_millis(50));
                }

                if let Err(e) = output.stop() {
                    warn!("Failed to stop audio stream cleanly: {}", e);
                }
                info!("Audio output thread exiting");
            })
            .map_err(|e| Error::AudioOutput(format!("Failed to spawn output thread: {}", e)))?;

        let actual_rate = ready_rx
            .recv()
            .map_err(|_| Error::AudioOutput("Audio output thread exited early".to_string()))??;

        *worker = Some(OutputWorker { shutdown, handle });
        Ok(actual_rate)
    }

    fn submit(&self, slot: Arc<Slot>) {
        self.router.submit(slot);
    }

    fn clear(&self) {
        self.router.clear();
    }

    fn release(&self) {
        self.router.clear();
        if let Some(worker) = self.lock_worker().take() {
            worker.shutdown.store(true, Ordering::Release);
            if worker.handle.join().is_err() {
                error!("Audio output thread panicked");
            }
            info!("Audio output released");
        }
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.release();
    }
}

/// Audio output manager using cpal.
struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
}

impl AudioOutput {
    fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open audio device for output.
    ///
    /// Falls back to the default device when the requested one is missing.
    fn open(device_name: Option<String>, sample_rate: u32, buffer_frames: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name.as_ref() {
            Some(name) => {
                let mut devices = host.output_devices().map_err(|e| {
                    Error::AudioOutput(format!("Failed to enumerate devices: {}", e))
                })?;

                match devices.find(|d| d.name().ok().as_ref() == Some(name)) {
                    Some(dev) => {
                        info!("Found requested audio device: {}", name);
                        dev
                    }
                    None => {
                        warn!(
                            "Requested device '{}' not found, falling back to default device",
                            name
                        );
                        host.default_output_device().ok_or_else(|| {
                            Error::AudioOutput(format!(
                                "Device '{}' not found and no default device available",
                                name
                            ))
                        })?
                    }
                }
            }
            None => host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?,
        };

        info!(
            "Using audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let (mut config, sample_format) = Self::best_config(&device, sample_rate)?;
        if buffer_frames > 0 {
            config.buffer_size = cpal::BufferSize::Fixed(buffer_frames);
        }

        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}, buffer_size={:?}",
            config.sample_rate.0, config.channels, sample_format, config.buffer_size
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
        })
    }

    /// Prefer stereo f32 at the requested rate, otherwise the device default.
    fn best_config(device: &Device, sample_rate: u32) -> Result<(StreamConfig, SampleFormat)> {
        let mut supported_configs = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?;

        let preferred = supported_configs.find(|config| {
            config.channels() == 2
                && config.min_sample_rate().0 <= sample_rate
                && config.max_sample_rate().0 >= sample_rate
                && config.sample_format() == SampleFormat::F32
        });

        if let Some(supported_config) = preferred {
            let sample_format = supported_config.sample_format();
            let config = supported_config
                .with_sample_rate(cpal::SampleRate(sample_rate))
                .config();
            return Ok((config, sample_format));
        }

        warn!(
            "Device does not support {}Hz stereo f32, using its default config",
            sample_rate
        );
        let supported_config = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;

        Ok((supported_config.config(), supported_config.sample_format()))
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Start the stream, pulling frames from `router`.
    fn start(&mut self, router: Arc<OutputRouter>) -> Result<()> {
        info!("Starting audio stream");

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(router, |s| s)?,
            SampleFormat::I16 => self.build_stream::<i16>(router, |s| (s * i16::MAX as f32) as i16)?,
            SampleFormat::U16 => self.build_stream::<u16>(router, |s| ((s + 1.0) * 32767.5) as u16)?,
            sample_format => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);
        info!("Audio stream started");
        Ok(())
    }

    fn build_stream<T>(&self, router: Arc<OutputRouter>, convert: fn(f32) -> T) -> Result<Stream>
    where
        T: cpal::SizedSample + Send + 'static,
    {
        let channels = self.config.channels as usize;
        let mut scratch: Vec<AudioFrame> = Vec::with_capacity(4096);

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let frame_count = data.len() / channels;
                    scratch.resize(frame_count, AudioFrame::zero());
                    router.render(&mut scratch);

                    for (out, frame) in data.chunks_mut(channels).zip(scratch.iter_mut()) {
                        frame.clamp();
                        out[0] = convert(frame.left);
                        if channels > 1 {
                            out[1] = convert(frame.right);
                        }
                        // Extra device channels stay silent
                        for extra in out.iter_mut().skip(2) {
                            *extra = convert(0.0);
                        }
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    /// Pause the stream and drop it.
    fn stop(&mut self) -> Result<()> {
        info!("Stopping audio stream");

        if let Some(stream) = self.stream.take() {
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_renders_silence_when_empty() {
        let router = OutputRouter::new();
        let mut frames = [AudioFrame::from_stereo(0.3, 0.3); 4];
        router.render(&mut frames);
        assert!(frames.iter().all(|f| *f == AudioFrame::zero()));
        assert!(router.current().is_none());
    }
}
