use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::error::SessionError;
use super::snapshot::SessionSnapshot;
use crate::audio::{AudioChunk, CaptureState};

/// Identifies one recording pass
///
/// Capture events carry the id of the pass that produced them so the
/// controller can drop events that outlive their recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordingId(pub u64);

/// Identifies one playback session (one prepared transport)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackId(pub u64);

impl std::fmt::Display for RecordingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rec-{}", self.0)
    }
}

impl std::fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "play-{}", self.0)
    }
}

/// A user intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Record,
    Stop,
    Play,
    Pause,
    Delete,
    /// Seek bar moved. Only user-originated seeks are acted on.
    Seek { percent: i32, user_originated: bool },
}

pub type IntentReply = oneshot::Sender<Result<(), SessionError>>;

/// Everything the session controller reacts to
///
/// All events are drained by a single task, so handlers never run
/// concurrently.
#[derive(Debug)]
pub enum SessionEvent {
    Intent {
        intent: Intent,
        reply: Option<IntentReply>,
    },
    Snapshot(oneshot::Sender<SessionSnapshot>),

    // Capture engine callbacks
    Chunk {
        recording: RecordingId,
        chunk: AudioChunk,
    },
    Tick {
        recording: RecordingId,
        elapsed_ms: u64,
    },
    CaptureStateChanged {
        recording: RecordingId,
        state: CaptureState,
    },

    // Playback engine callbacks
    Prepared {
        playback: PlaybackId,
        result: Result<u64, String>,
    },
    PlaybackCompleted {
        playback: PlaybackId,
    },

    /// Deferred progress poller firing
    ProgressTick {
        playback: PlaybackId,
        generation: u64,
    },

    Shutdown,
}

/// Handle engines and schedulers use to call back into the controller
///
/// Sending never blocks. Events sent after the runtime has shut down are
/// dropped.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSender {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Post an event; returns false if the runtime is gone
    pub fn send(&self, event: SessionEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(e) => {
                debug!("Session runtime closed, dropping event: {:?}", e.0);
                false
            }
        }
    }

    pub fn chunk(&self, recording: RecordingId, chunk: AudioChunk) -> bool {
        self.send(SessionEvent::Chunk { recording, chunk })
    }

    pub fn tick(&self, recording: RecordingId, elapsed_ms: u64) -> bool {
        self.send(SessionEvent::Tick {
            recording,
            elapsed_ms,
        })
    }

    pub fn capture_state(&self, recording: RecordingId, state: CaptureState) -> bool {
        self.send(SessionEvent::CaptureStateChanged { recording, state })
    }

    /// Report the outcome of `PlaybackEngine::open`
    pub fn prepared(&self, playback: PlaybackId, result: anyhow::Result<u64>) -> bool {
        self.send(SessionEvent::Prepared {
            playback,
            result: result.map_err(|e| format!("{:#}", e)),
        })
    }

    pub fn completed(&self, playback: PlaybackId) -> bool {
        self.send(SessionEvent::PlaybackCompleted { playback })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
