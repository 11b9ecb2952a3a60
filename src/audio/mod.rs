pub mod engine;
pub mod file;
pub mod noise;
pub mod playback;

pub use engine::{
    AudioChunk, CaptureConfig, CaptureEngine, CaptureState, DisplaySink, LogDisplay, NullWaveform,
    PlaybackEngine, WaveformRenderer,
};
pub use file::AudioFile;
pub use noise::NoiseCaptureEngine;
pub use playback::WavPlaybackEngine;
