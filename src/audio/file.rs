use anyhow::{bail, Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use tracing::info;

/// Header information of a recorded WAV file
#[derive(Debug, Clone)]
pub struct AudioFile {
    pub path: PathBuf,
    pub duration_ms: u64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Frames per channel
    pub frame_count: u32,
}

impl AudioFile {
    /// Read the WAV header without decoding samples
    pub fn probe(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Probing audio file: {}", path.display());

        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

        let spec = reader.spec();
        if spec.sample_rate == 0 || spec.channels == 0 {
            bail!(
                "Invalid WAV header in {}: {}Hz, {} channels",
                path.display(),
                spec.sample_rate,
                spec.channels
            );
        }

        let frame_count = reader.duration();
        let duration_ms = frame_count as u64 * 1000 / spec.sample_rate as u64;

        info!(
            "Audio file probed: {}ms, {}Hz, {} channels, {} frames",
            duration_ms, spec.sample_rate, spec.channels, frame_count
        );

        Ok(Self {
            path: path.to_path_buf(),
            duration_ms,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            frame_count,
        })
    }
}
