use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use super::controls::ControlPanel;

/// What the recorder is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// No recording
    Empty,
    Recording,
    /// Recording finished, playback paused or not started
    Recorded,
    /// Play requested, waiting for the engine to prepare the file
    Preparing,
    Playing,
}

/// Read-only view of the session for the UI layer
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub mode: SessionMode,

    /// Formatted timer text (`mm:ss` or `mm:ss/mm:ss`)
    pub timer: String,

    /// Elapsed time of the open or last recording
    pub recorded_ms: u64,

    /// Seek bar position, 0 to 100
    pub percent: u8,

    pub position_ms: u64,

    /// Known once the file has been prepared
    pub total_duration_ms: Option<u64>,

    pub prepared: bool,

    pub recording_path: Option<PathBuf>,

    pub controls: ControlPanel,

    /// Last failure reported by an engine callback
    pub last_error: Option<String>,

    pub taken_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn is_capture_active(&self) -> bool {
        self.mode == SessionMode::Recording
    }

    pub fn is_playback_active(&self) -> bool {
        matches!(self.mode, SessionMode::Preparing | SessionMode::Playing)
    }
}
