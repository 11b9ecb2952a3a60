use anyhow::Result;
use std::path::Path;
use tracing::debug;

use crate::session::{EventSender, PlaybackId, RecordingId};

/// Raw captured audio (16-bit PCM, little endian, interleaved)
///
/// Chunks are handed to the waveform renderer as they arrive and never
/// stored by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub bytes: Vec<u8>,
}

impl AudioChunk {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn from_samples(samples: &[i16]) -> Self {
        Self {
            bytes: samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Lifecycle state reported by a capture engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Started,
    Stopped,
}

/// Configuration for capture engines
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Length of each delivered chunk in milliseconds
    pub buffer_duration_ms: u64,
    /// Minimum spacing between elapsed-time ticks
    pub tick_interval_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            buffer_duration_ms: 100,
            tick_interval_ms: 100,
        }
    }
}

impl CaptureConfig {
    /// Interleaved samples in one buffer
    pub fn samples_per_buffer(&self) -> usize {
        (self.sample_rate as u64 * self.buffer_duration_ms / 1000) as usize * self.channels as usize
    }
}

/// Audio capture engine
///
/// `start` returns once capture is running. From then on the engine posts
/// chunks, elapsed ticks and state changes through the `EventSender`, tagged
/// with the recording id it was started with.
#[async_trait::async_trait]
pub trait CaptureEngine: Send {
    /// Start capturing into `destination`
    async fn start(
        &mut self,
        recording: RecordingId,
        destination: &Path,
        events: EventSender,
    ) -> Result<()>;

    /// Stop capturing and finalize the destination file
    async fn stop(&mut self) -> Result<()>;

    /// Check if the engine is currently capturing
    fn is_capturing(&self) -> bool;

    /// Engine name for logging
    fn name(&self) -> &str;
}

/// Audio playback engine (a single-file transport)
///
/// `open` must not wait for decoding: it returns as soon as preparation is
/// under way and reports the duration (or failure) later through
/// `EventSender::prepared`. Natural end of media is reported through
/// `EventSender::completed`.
#[async_trait::async_trait]
pub trait PlaybackEngine: Send {
    /// Begin preparing `path` for playback
    async fn open(&mut self, playback: PlaybackId, path: &Path, events: EventSender) -> Result<()>;

    /// Start or resume output
    async fn play(&mut self) -> Result<()>;

    /// Pause output, keeping the position
    async fn pause(&mut self) -> Result<()>;

    /// Move the transport to an absolute position
    async fn seek_to(&mut self, position_ms: u64) -> Result<()>;

    /// Stop and release the loaded file
    async fn reset(&mut self) -> Result<()>;

    fn current_position_ms(&self) -> u64;

    fn is_playing(&self) -> bool;

    /// Engine name for logging
    fn name(&self) -> &str;
}

/// Consumer of live chunk bytes (the waveform view)
pub trait WaveformRenderer: Send {
    fn update(&mut self, bytes: &[u8]);

    fn clear(&mut self);
}

/// Consumer of the formatted timer text
pub trait DisplaySink: Send {
    fn show_timer(&mut self, text: &str);
}

/// Waveform renderer that only counts what it was given
#[derive(Debug, Default)]
pub struct NullWaveform {
    pub bytes_seen: usize,
}

impl WaveformRenderer for NullWaveform {
    fn update(&mut self, bytes: &[u8]) {
        self.bytes_seen += bytes.len();
    }

    fn clear(&mut self) {
        self.bytes_seen = 0;
    }
}

/// Display sink that writes timer updates to the log
#[derive(Debug, Default)]
pub struct LogDisplay;

impl DisplaySink for LogDisplay {
    fn show_timer(&mut self, text: &str) {
        debug!("Timer: {}", text);
    }
}
