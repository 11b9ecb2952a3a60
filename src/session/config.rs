use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a recorder session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier, used in logs
    pub session_id: String,

    /// File every recording pass writes to
    /// Starting a new recording deletes whatever is there.
    pub destination: PathBuf,

    /// Floor for the progress poller cadence
    /// Recordings shorter than 100ms would otherwise poll with a zero delay.
    pub min_poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("recorder-{}", uuid::Uuid::new_v4()),
            destination: std::env::temp_dir().join("record.wav"),
            min_poll_interval: Duration::from_millis(1),
        }
    }
}

impl SessionConfig {
    pub fn with_destination(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            ..Self::default()
        }
    }
}
