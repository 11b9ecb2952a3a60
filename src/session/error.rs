/// Errors surfaced to the caller of a session intent
///
/// Every variant is recoverable: the controller keeps its last good state
/// and the UI layer decides what to show.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Capture session already has an open recording
    #[error("A recording is already in progress")]
    AlreadyRecording,

    /// Another session is live and blocks this intent
    #[error("Recorder is busy")]
    Busy,

    /// Playback requested before the file was prepared
    #[error("Playback session is not prepared")]
    NotPrepared,

    /// The playback engine could not open or decode the recording
    #[error("Failed to prepare recording for playback: {0}")]
    PrepareError(String),

    /// Intent needs a recording and there is none
    #[error("No recording available")]
    NoRecording,

    /// Transport call failed outside of preparation
    #[error("Audio engine error: {0}")]
    Engine(String),

    /// The session runtime has shut down
    #[error("Session runtime is closed")]
    Closed,
}

impl SessionError {
    pub(crate) fn engine(err: anyhow::Error) -> Self {
        Self::Engine(format!("{:#}", err))
    }

    pub(crate) fn prepare(err: anyhow::Error) -> Self {
        Self::PrepareError(format!("{:#}", err))
    }
}
