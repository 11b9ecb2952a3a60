pub mod audio;
pub mod config;
pub mod session;

pub use audio::{
    AudioChunk, AudioFile, CaptureConfig, CaptureEngine, CaptureState, DisplaySink,
    NoiseCaptureEngine, PlaybackEngine, WavPlaybackEngine, WaveformRenderer,
};
pub use config::Config;
pub use session::{
    ControlPanel, DisplayTimer, FinishedRecording, Intent, PlaybackState, RecordingObserver,
    SessionConfig, SessionController, SessionError, SessionHandle, SessionMode, SessionRuntime,
    SessionSnapshot,
};
