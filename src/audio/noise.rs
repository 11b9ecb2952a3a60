// Synthetic capture engine
//
// Produces low-level white noise in fixed-size buffers on a tokio interval,
// writes it to a WAV file, and reports every buffer as a chunk plus elapsed
// ticks. Stands in for a microphone when no device is available (demos and
// tests).

use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::engine::{AudioChunk, CaptureConfig, CaptureEngine, CaptureState};
use crate::session::{EventSender, RecordingId};

/// Peak amplitude of generated noise
const NOISE_AMPLITUDE: i16 = 2048;

pub struct NoiseCaptureEngine {
    config: CaptureConfig,
    capturing: Arc<AtomicBool>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<u64>>>,
}

impl NoiseCaptureEngine {
    pub fn new(config: CaptureConfig) -> Self {
        info!(
            "Noise capture engine initialized ({}Hz, {} channels, {}ms buffers)",
            config.sample_rate, config.channels, config.buffer_duration_ms
        );

        Self {
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            task: None,
        }
    }

    /// Collect a capture task that ended on its own
    async fn reap_finished(&mut self) {
        self.stop_tx = None;
        let Some(task) = self.task.take() else {
            return;
        };

        match task.await {
            Ok(Ok(captured_ms)) => debug!("Reaped finished capture task ({}ms)", captured_ms),
            Ok(Err(e)) => warn!("Previous capture ended with an error: {:#}", e),
            Err(e) => warn!("Previous capture task panicked: {}", e),
        }
    }
}

#[async_trait::async_trait]
impl CaptureEngine for NoiseCaptureEngine {
    async fn start(
        &mut self,
        recording: RecordingId,
        destination: &Path,
        events: EventSender,
    ) -> Result<()> {
        if self.capturing.load(Ordering::SeqCst) {
            bail!("Already capturing");
        }
        self.reap_finished().await;

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("Failed to create recordings directory")?;
            }
        }

        let writer = WavChunkWriter::create(destination, &self.config)?;
        let (stop_tx, stop_rx) = oneshot::channel();

        self.capturing.store(true, Ordering::SeqCst);
        events.capture_state(recording, CaptureState::Started);

        info!("Noise capture started: {} -> {}", recording, destination.display());

        let task = tokio::spawn(run_capture(
            recording,
            self.config.clone(),
            writer,
            events,
            stop_rx,
            Arc::clone(&self.capturing),
        ));

        self.stop_tx = Some(stop_tx);
        self.task = Some(task);

        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing.swap(false, Ordering::SeqCst) {
            self.reap_finished().await;
            return Ok(());
        }

        info!("Stopping noise capture");

        if let Some(stop_tx) = self.stop_tx.take() {
            // Task may already have exited on a write error
            let _ = stop_tx.send(());
        }

        if let Some(task) = self.task.take() {
            let captured_ms = task.await.context("Capture task panicked")??;
            info!("Noise capture stopped after {}ms", captured_ms);
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "Noise generator"
    }
}

async fn run_capture(
    recording: RecordingId,
    config: CaptureConfig,
    mut writer: WavChunkWriter,
    events: EventSender,
    mut stop_rx: oneshot::Receiver<()>,
    capturing: Arc<AtomicBool>,
) -> Result<u64> {
    let mut interval = tokio::time::interval(Duration::from_millis(config.buffer_duration_ms.max(1)));
    // First tick completes immediately; a buffer is only ready one period later
    interval.tick().await;

    let mut noise = NoiseSource::new(recording.0);
    let mut buffer = vec![0i16; config.samples_per_buffer()];
    let mut elapsed_ms = 0u64;
    let mut last_tick_ms = 0u64;
    let mut result = Ok(());

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = interval.tick() => {}
        }

        noise.fill(&mut buffer);
        if let Err(e) = writer.write_samples(&buffer) {
            error!("Noise capture write failed: {:#}", e);
            result = Err(e);
            break;
        }

        elapsed_ms += config.buffer_duration_ms;
        events.chunk(recording, AudioChunk::from_samples(&buffer));

        if elapsed_ms - last_tick_ms >= config.tick_interval_ms {
            events.tick(recording, elapsed_ms);
            last_tick_ms = elapsed_ms;
        }
    }

    let finished = writer.finish();
    // Cleared before Stopped goes out so the next start is accepted
    capturing.store(false, Ordering::SeqCst);
    events.capture_state(recording, CaptureState::Stopped);

    result?;
    finished?;
    Ok(elapsed_ms)
}

/// xorshift32 noise generator
struct NoiseSource {
    state: u32,
}

impl NoiseSource {
    fn new(seed: u64) -> Self {
        // xorshift must never be seeded with zero
        let state = (seed as u32 ^ 0x9E37_79B9) | 1;
        Self { state }
    }

    fn next_sample(&mut self) -> i16 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        ((x >> 16) as i16 as i32 * NOISE_AMPLITUDE as i32 / i16::MAX as i32) as i16
    }

    fn fill(&mut self, buffer: &mut [i16]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }
}

/// Writes captured buffers to a WAV file
struct WavChunkWriter {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    path: PathBuf,
}

impl WavChunkWriter {
    fn create(path: &Path, config: &CaptureConfig) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: config.channels,
            sample_rate: config.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        Ok(Self {
            writer: Some(writer),
            path: path.to_path_buf(),
        })
    }

    fn write_samples(&mut self, samples: &[i16]) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            for &sample in samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
        }

        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .with_context(|| format!("Failed to finalize WAV file: {:?}", self.path))?;
        }

        Ok(())
    }
}

impl Drop for WavChunkWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}
