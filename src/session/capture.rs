use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::error::SessionError;
use super::event::{EventSender, RecordingId};
use super::timer::{format_mm_ss, DisplayTimer};
use crate::audio::{AudioChunk, CaptureEngine, WaveformRenderer};

/// One recording pass
#[derive(Debug, Clone, Serialize)]
pub struct Recording {
    #[serde(skip)]
    pub id: RecordingId,
    pub path: PathBuf,
    /// Last elapsed tick; frozen as the duration on stop
    pub elapsed_ms: u64,
    pub completed: bool,
    pub started_at: DateTime<Utc>,
}

/// Completion event of a recording pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinishedRecording {
    pub path: PathBuf,
    pub duration_ms: u64,
}

impl FinishedRecording {
    pub fn duration_formatted(&self) -> String {
        format_mm_ss(self.duration_ms / 1000)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureStatus {
    Idle,
    Recording,
    Finished,
}

/// Capture session: `Idle -> Recording -> Finished`
///
/// Owns the Recording for its whole life. Engine callbacks tagged with
/// another recording id, or arriving once the pass is over, are dropped.
pub struct CaptureSession {
    recording: Recording,
    status: CaptureStatus,
}

impl CaptureSession {
    pub fn new(id: RecordingId, destination: impl Into<PathBuf>) -> Self {
        Self {
            recording: Recording {
                id,
                path: destination.into(),
                elapsed_ms: 0,
                completed: false,
                started_at: Utc::now(),
            },
            status: CaptureStatus::Idle,
        }
    }

    pub fn id(&self) -> RecordingId {
        self.recording.id
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn is_recording(&self) -> bool {
        self.status == CaptureStatus::Recording
    }

    pub fn is_finished(&self) -> bool {
        self.status == CaptureStatus::Finished
    }

    /// The completed recording, once the pass is over
    pub fn finished(&self) -> Option<FinishedRecording> {
        self.is_finished().then(|| FinishedRecording {
            path: self.recording.path.clone(),
            duration_ms: self.recording.elapsed_ms,
        })
    }

    /// Reset the destination and start the engine
    pub async fn start(
        &mut self,
        engine: &mut dyn CaptureEngine,
        events: EventSender,
    ) -> Result<(), SessionError> {
        if self.is_recording() {
            return Err(SessionError::AlreadyRecording);
        }

        reset_destination(&self.recording.path).await?;

        engine
            .start(self.recording.id, &self.recording.path, events)
            .await
            .map_err(SessionError::engine)?;

        self.recording.elapsed_ms = 0;
        self.recording.completed = false;
        self.recording.started_at = Utc::now();
        self.status = CaptureStatus::Recording;

        info!(
            "Recording {} started with {} -> {}",
            self.recording.id,
            engine.name(),
            self.recording.path.display()
        );

        Ok(())
    }

    /// Forward chunk bytes to the waveform; returns whether it was accepted
    pub fn on_chunk(
        &self,
        id: RecordingId,
        chunk: &AudioChunk,
        waveform: &mut dyn WaveformRenderer,
    ) -> bool {
        if !self.accepts(id) {
            return false;
        }
        waveform.update(&chunk.bytes);
        true
    }

    /// Record an elapsed tick and return the elapsed-only timer
    pub fn on_tick(&mut self, id: RecordingId, elapsed_ms: u64) -> Option<DisplayTimer> {
        if !self.accepts(id) {
            debug!("Dropping tick {}ms for {}", elapsed_ms, id);
            return None;
        }

        if elapsed_ms < self.recording.elapsed_ms {
            warn!(
                "Tick went backwards for {}: {}ms after {}ms",
                id, elapsed_ms, self.recording.elapsed_ms
            );
        }

        self.recording.elapsed_ms = elapsed_ms;
        Some(DisplayTimer::elapsed(elapsed_ms))
    }

    /// Stop the engine and finalize the recording
    ///
    /// Returns the completion event exactly once; later calls are no-ops.
    pub async fn stop(&mut self, engine: &mut dyn CaptureEngine) -> Option<FinishedRecording> {
        if !self.is_recording() {
            return None;
        }

        if let Err(e) = engine.stop().await {
            warn!("Capture engine failed to stop cleanly: {:#}", e);
        }

        self.finalize()
    }

    /// The engine ended capture on its own
    pub fn on_engine_stopped(&mut self, id: RecordingId) -> Option<FinishedRecording> {
        if !self.accepts(id) {
            return None;
        }

        warn!("Capture engine stopped {} without a stop request", id);
        self.finalize()
    }

    /// Stop the engine without completing the recording
    pub async fn abort(&mut self, engine: &mut dyn CaptureEngine) {
        if !self.is_recording() {
            return;
        }

        if let Err(e) = engine.stop().await {
            warn!("Capture engine failed to stop cleanly: {:#}", e);
        }

        self.status = CaptureStatus::Idle;
        info!("Recording {} aborted", self.recording.id);
    }

    fn accepts(&self, id: RecordingId) -> bool {
        self.is_recording() && id == self.recording.id
    }

    fn finalize(&mut self) -> Option<FinishedRecording> {
        self.status = CaptureStatus::Finished;
        self.recording.completed = true;

        let finished = self.finished();
        info!(
            "Recording {} finished: {} ({}ms)",
            self.recording.id,
            self.recording.path.display(),
            self.recording.elapsed_ms
        );
        finished
    }
}

/// Remove a previous recording at `path`, if any
async fn reset_destination(path: &Path) -> Result<(), SessionError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed previous recording at {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SessionError::Engine(format!(
            "Failed to reset {}: {}",
            path.display(),
            e
        ))),
    }
}
