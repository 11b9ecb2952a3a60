use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

use crate::audio::CaptureConfig;
use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub recorder: RecorderConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct RecorderConfig {
    pub recordings_path: String,
    pub file_name: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_duration_ms: u64,
    pub tick_interval_ms: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Where recordings are written
    pub fn destination(&self) -> PathBuf {
        PathBuf::from(&self.recorder.recordings_path).join(&self.recorder.file_name)
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
            buffer_duration_ms: self.audio.buffer_duration_ms,
            tick_interval_ms: self.audio.tick_interval_ms,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::with_destination(self.destination())
    }
}
