// Scripted engines and a manual scheduler for driving the controller
// deterministically from tests.

#![allow(dead_code)]

use anyhow::{bail, Result};
use audio_recorder::audio::{CaptureEngine, DisplaySink, PlaybackEngine, WaveformRenderer};
use audio_recorder::session::{
    EventSender, FinishedRecording, PlaybackId, RecordingId, RecordingObserver, Scheduler,
    SessionConfig, SessionController, SessionEvent,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

#[derive(Debug, Default)]
pub struct CaptureLog {
    pub starts: Vec<(RecordingId, PathBuf)>,
    pub stops: usize,
    pub capturing: bool,
    pub fail_start: bool,
}

pub struct FakeCaptureEngine {
    pub log: Arc<Mutex<CaptureLog>>,
}

#[async_trait::async_trait]
impl CaptureEngine for FakeCaptureEngine {
    async fn start(&mut self, recording: RecordingId, destination: &Path, _events: EventSender) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        if log.fail_start {
            bail!("microphone unavailable");
        }
        if log.capturing {
            bail!("Already capturing");
        }
        log.starts.push((recording, destination.to_path_buf()));
        log.capturing = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.stops += 1;
        log.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.log.lock().unwrap().capturing
    }

    fn name(&self) -> &str {
        "fake capture"
    }
}

#[derive(Debug, Default)]
pub struct PlaybackLog {
    pub opens: Vec<(PlaybackId, PathBuf)>,
    pub plays: usize,
    pub pauses: usize,
    pub seeks: Vec<u64>,
    pub resets: usize,
    pub playing: bool,
    pub position_ms: u64,
    pub fail_open: bool,
}

pub struct FakePlaybackEngine {
    pub log: Arc<Mutex<PlaybackLog>>,
}

#[async_trait::async_trait]
impl PlaybackEngine for FakePlaybackEngine {
    async fn open(&mut self, playback: PlaybackId, path: &Path, _events: EventSender) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        if log.fail_open {
            bail!("file is locked");
        }
        log.opens.push((playback, path.to_path_buf()));
        Ok(())
    }

    async fn play(&mut self) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.plays += 1;
        log.playing = true;
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.pauses += 1;
        log.playing = false;
        Ok(())
    }

    async fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.seeks.push(position_ms);
        log.position_ms = position_ms;
        Ok(())
    }

    async fn reset(&mut self) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.resets += 1;
        log.playing = false;
        log.position_ms = 0;
        Ok(())
    }

    fn current_position_ms(&self) -> u64 {
        self.log.lock().unwrap().position_ms
    }

    fn is_playing(&self) -> bool {
        self.log.lock().unwrap().playing
    }

    fn name(&self) -> &str {
        "fake playback"
    }
}

/// Holds scheduled events until the test fires them
#[derive(Default)]
pub struct ManualScheduler {
    pub pending: Mutex<Vec<(Duration, SessionEvent)>>,
}

impl ManualScheduler {
    pub fn take(&self) -> Vec<(Duration, SessionEvent)> {
        std::mem::take(&mut *self.pending.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, event: SessionEvent) {
        self.pending.lock().unwrap().push((delay, event));
    }
}

pub struct RecordingDisplay {
    pub shown: Arc<Mutex<Vec<String>>>,
}

impl DisplaySink for RecordingDisplay {
    fn show_timer(&mut self, text: &str) {
        self.shown.lock().unwrap().push(text.to_string());
    }
}

pub struct CountingWaveform {
    pub bytes: Arc<Mutex<usize>>,
}

impl WaveformRenderer for CountingWaveform {
    fn update(&mut self, bytes: &[u8]) {
        *self.bytes.lock().unwrap() += bytes.len();
    }

    fn clear(&mut self) {
        *self.bytes.lock().unwrap() = 0;
    }
}

#[derive(Clone, Default)]
pub struct ObserverLog {
    pub finished: Arc<Mutex<Vec<FinishedRecording>>>,
    pub discarded: Arc<Mutex<Vec<PathBuf>>>,
}

impl RecordingObserver for ObserverLog {
    fn on_recording_finished(&self, recording: &FinishedRecording) {
        self.finished.lock().unwrap().push(recording.clone());
    }

    fn on_recording_discarded(&self, path: &Path) {
        self.discarded.lock().unwrap().push(path.to_path_buf());
    }
}

pub struct Harness {
    pub controller: SessionController,
    pub capture: Arc<Mutex<CaptureLog>>,
    pub playback: Arc<Mutex<PlaybackLog>>,
    pub scheduler: Arc<ManualScheduler>,
    pub observers: ObserverLog,
    pub shown: Arc<Mutex<Vec<String>>>,
    pub waveform_bytes: Arc<Mutex<usize>>,
    pub inbox: mpsc::UnboundedReceiver<SessionEvent>,
    pub destination: PathBuf,
    _dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("record.wav");

        let capture = Arc::new(Mutex::new(CaptureLog::default()));
        let playback = Arc::new(Mutex::new(PlaybackLog::default()));
        let scheduler = Arc::new(ManualScheduler::default());
        let shown = Arc::new(Mutex::new(Vec::new()));
        let waveform_bytes = Arc::new(Mutex::new(0));
        let observers = ObserverLog::default();

        let (events, inbox) = EventSender::channel();
        let mut controller = SessionController::new(
            SessionConfig::with_destination(&destination),
            Box::new(FakeCaptureEngine {
                log: Arc::clone(&capture),
            }),
            Box::new(FakePlaybackEngine {
                log: Arc::clone(&playback),
            }),
            events,
        )
        .with_scheduler(scheduler.clone())
        .with_display(Box::new(RecordingDisplay {
            shown: Arc::clone(&shown),
        }))
        .with_waveform(Box::new(CountingWaveform {
            bytes: Arc::clone(&waveform_bytes),
        }));
        controller.subscribe(observers.clone());

        Self {
            controller,
            capture,
            playback,
            scheduler,
            observers,
            shown,
            waveform_bytes,
            inbox,
            destination,
            _dir: dir,
        }
    }

    pub fn recording_id(&self) -> RecordingId {
        self.capture.lock().unwrap().starts.last().unwrap().0
    }

    pub fn timer(&self) -> String {
        self.controller.timer().text()
    }

    /// Record, tick up to `duration_ms`, stop
    pub async fn record_for(&mut self, duration_ms: u64) {
        self.controller.on_record_intent().await.unwrap();
        let id = self.recording_id();
        let mut elapsed = 0;
        while elapsed < duration_ms {
            elapsed = (elapsed + 1000).min(duration_ms);
            self.controller.on_tick(id, elapsed);
        }
        self.controller.on_stop_intent().await.unwrap();
    }

    /// Deliver a successful prepare for the current playback session
    pub async fn prepared(&mut self, total_ms: u64) {
        let id = self.controller.playback_id().unwrap();
        self.controller.on_prepared(id, Ok(total_ms)).await;
    }

    /// Record, then play through a successful prepare
    pub async fn record_and_play(&mut self, duration_ms: u64) {
        self.record_for(duration_ms).await;
        self.controller.on_play_intent().await.unwrap();
        self.prepared(duration_ms).await;
    }

    /// Fire every scheduled event once; returns how many fired
    pub async fn fire_scheduled(&mut self) -> usize {
        let pending = self.scheduler.take();
        let count = pending.len();
        for (_, event) in pending {
            self.controller.handle(event).await;
        }
        count
    }

    pub fn percent(&self) -> u8 {
        self.controller.playback_state().map_or(0, |p| p.percent)
    }

    pub fn assert_single_live_session(&self) {
        assert!(
            !(self.controller.is_capture_active() && self.controller.is_playback_active()),
            "capture and playback must never be live together"
        );
    }
}
