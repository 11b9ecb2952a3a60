//! Recorder session management
//!
//! This module provides the `SessionController` state machine and the pieces
//! it is built from:
//! - `CaptureSession`: one recording pass fed by chunk and tick callbacks
//! - `PlaybackSession`: one prepared transport with a progress poller
//! - `SessionRuntime`: single-task event loop driving the controller
//! - Display timer, control layout and snapshots for the UI layer

mod capture;
mod config;
mod controller;
mod controls;
mod error;
mod event;
mod observer;
mod playback;
mod poller;
mod runtime;
mod snapshot;
mod timer;

pub use capture::{CaptureSession, FinishedRecording, Recording};
pub use config::SessionConfig;
pub use controller::SessionController;
pub use controls::ControlPanel;
pub use error::SessionError;
pub use event::{EventSender, Intent, IntentReply, PlaybackId, RecordingId, SessionEvent};
pub use observer::RecordingObserver;
pub use playback::{PlaybackSession, PlaybackState};
pub use poller::{ProgressPoller, Scheduler, TokioScheduler};
pub use runtime::{SessionHandle, SessionRuntime};
pub use snapshot::{SessionMode, SessionSnapshot};
pub use timer::{format_mm_ss, DisplayTimer};
