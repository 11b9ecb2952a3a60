use std::path::Path;

use super::capture::FinishedRecording;

/// Listener for recording lifecycle events
///
/// Closures taking `&FinishedRecording` subscribe directly.
pub trait RecordingObserver: Send {
    /// A recording pass completed; fires exactly once per recording
    fn on_recording_finished(&self, recording: &FinishedRecording);

    /// The recording at `path` was deleted by the user
    /// Removing the file is up to the observer.
    fn on_recording_discarded(&self, _path: &Path) {}
}

impl<F> RecordingObserver for F
where
    F: Fn(&FinishedRecording) + Send,
{
    fn on_recording_finished(&self, recording: &FinishedRecording) {
        self(recording)
    }
}
