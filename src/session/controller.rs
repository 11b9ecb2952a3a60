use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::capture::{CaptureSession, FinishedRecording, Recording};
use super::config::SessionConfig;
use super::controls::ControlPanel;
use super::error::SessionError;
use super::event::{EventSender, Intent, PlaybackId, RecordingId, SessionEvent};
use super::observer::RecordingObserver;
use super::playback::{PlaybackSession, PlaybackState};
use super::poller::{Scheduler, TokioScheduler};
use super::snapshot::{SessionMode, SessionSnapshot};
use super::timer::DisplayTimer;
use crate::audio::{
    AudioChunk, CaptureEngine, CaptureState, DisplaySink, LogDisplay, NullWaveform,
    PlaybackEngine, WaveformRenderer,
};

/// The recorder's state machine
///
/// Mediates between one capture session and one playback session so that
/// at most one of them is live, turns user intents into engine calls, and
/// owns the timer shown to the user.
///
/// Every method takes `&mut self`; the controller is meant to be driven by a
/// single task (see `SessionRuntime`), which is what keeps engine callbacks,
/// poller firings and intents from interleaving.
pub struct SessionController {
    config: SessionConfig,
    capture_engine: Box<dyn CaptureEngine>,
    playback_engine: Box<dyn PlaybackEngine>,
    waveform: Box<dyn WaveformRenderer>,
    display: Box<dyn DisplaySink>,
    scheduler: Arc<dyn Scheduler>,
    events: EventSender,
    observers: Vec<Box<dyn RecordingObserver>>,

    /// Session of the current recording; idle once the recording finished
    capture: Option<CaptureSession>,
    /// Transport for the current recording, created when recording stops
    playback: Option<PlaybackSession>,

    timer: DisplayTimer,
    controls: ControlPanel,
    last_error: Option<SessionError>,
    next_id: u64,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        capture_engine: Box<dyn CaptureEngine>,
        playback_engine: Box<dyn PlaybackEngine>,
        events: EventSender,
    ) -> Self {
        info!(
            "Creating recorder session {} ({} / {})",
            config.session_id,
            capture_engine.name(),
            playback_engine.name()
        );

        Self {
            config,
            capture_engine,
            playback_engine,
            waveform: Box::new(NullWaveform::default()),
            display: Box::new(LogDisplay),
            scheduler: Arc::new(TokioScheduler::new(events.clone())),
            events,
            observers: Vec::new(),
            capture: None,
            playback: None,
            timer: DisplayTimer::default(),
            controls: ControlPanel::empty(),
            last_error: None,
            next_id: 0,
        }
    }

    pub fn with_waveform(mut self, waveform: Box<dyn WaveformRenderer>) -> Self {
        self.waveform = waveform;
        self
    }

    pub fn with_display(mut self, display: Box<dyn DisplaySink>) -> Self {
        self.display = display;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Subscribe to recording lifecycle events
    pub fn subscribe(&mut self, observer: impl RecordingObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Handle one event; returns false once the session should shut down
    pub async fn handle(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Intent { intent, reply } => {
                let result = self.on_intent(intent).await;
                if let Some(reply) = reply {
                    // Caller may have stopped waiting
                    let _ = reply.send(result);
                }
            }
            SessionEvent::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            SessionEvent::Chunk { recording, chunk } => self.on_chunk(recording, &chunk),
            SessionEvent::Tick {
                recording,
                elapsed_ms,
            } => self.on_tick(recording, elapsed_ms),
            SessionEvent::CaptureStateChanged { recording, state } => {
                self.on_capture_state(recording, state)
            }
            SessionEvent::Prepared { playback, result } => self.on_prepared(playback, result).await,
            SessionEvent::PlaybackCompleted { playback } => {
                self.on_playback_completed(playback).await
            }
            SessionEvent::ProgressTick {
                playback,
                generation,
            } => self.on_progress_tick(playback, generation),
            SessionEvent::Shutdown => return false,
        }
        true
    }

    /// Run a user intent and update the control layout on success
    pub async fn on_intent(&mut self, intent: Intent) -> Result<(), SessionError> {
        let was_recording = self.is_capture_active();
        let result = match intent {
            Intent::Record => self.on_record_intent().await,
            Intent::Stop => self.on_stop_intent().await,
            Intent::Play => self.on_play_intent().await,
            Intent::Pause => self.on_pause_intent().await,
            Intent::Delete => self.on_delete_intent().await,
            Intent::Seek {
                percent,
                user_originated,
            } => self.on_seek_intent(percent, user_originated).await,
        };

        match &result {
            Ok(()) => {
                self.last_error = None;
                // A stop with nothing recording leaves the layout alone
                let layout = match intent {
                    Intent::Stop if !was_recording => None,
                    _ => ControlPanel::after(intent),
                };
                if let Some(controls) = layout {
                    self.controls = controls;
                }
            }
            Err(e) => {
                warn!("{:?} intent rejected: {}", intent, e);
                self.last_error = Some(e.clone());
            }
        }

        result
    }

    // ------------------------------------------------------------------
    // Intents
    // ------------------------------------------------------------------

    pub async fn on_record_intent(&mut self) -> Result<(), SessionError> {
        if self.is_capture_active() {
            return Err(SessionError::Busy);
        }

        // A new recording invalidates the previous transport
        if let Some(mut playback) = self.playback.take() {
            playback.teardown(self.playback_engine.as_mut()).await;
        }
        self.capture = None;
        self.waveform.clear();

        let id = RecordingId(self.allocate_id());
        let mut capture = CaptureSession::new(id, self.config.destination.clone());
        capture
            .start(self.capture_engine.as_mut(), self.events.clone())
            .await?;

        self.capture = Some(capture);
        self.set_timer(DisplayTimer::elapsed(0));
        Ok(())
    }

    pub async fn on_stop_intent(&mut self) -> Result<(), SessionError> {
        let Some(capture) = self.capture.as_mut() else {
            return Ok(());
        };

        if let Some(finished) = capture.stop(self.capture_engine.as_mut()).await {
            self.complete_recording(finished);
        }
        Ok(())
    }

    pub async fn on_play_intent(&mut self) -> Result<(), SessionError> {
        if self.is_capture_active() {
            return Err(SessionError::Busy);
        }

        let Some(finished) = self.capture.as_ref().and_then(|c| c.finished()) else {
            return Err(SessionError::NoRecording);
        };

        if self.playback.is_none() {
            self.playback = Some(self.new_playback(&finished));
        }

        let Some(playback) = self.playback.as_mut() else {
            return Err(SessionError::NoRecording);
        };

        if playback.is_prepared() {
            return playback
                .play(self.playback_engine.as_mut(), self.scheduler.as_ref())
                .await;
        }

        playback.set_play_when_prepared(true);
        if let Err(e) = playback
            .prepare(self.playback_engine.as_mut(), self.events.clone())
            .await
        {
            playback.set_play_when_prepared(false);
            return Err(e);
        }
        Ok(())
    }

    pub async fn on_pause_intent(&mut self) -> Result<(), SessionError> {
        match self.playback.as_mut() {
            Some(playback) => playback.pause(self.playback_engine.as_mut()).await,
            None => Ok(()),
        }
    }

    pub async fn on_delete_intent(&mut self) -> Result<(), SessionError> {
        if let Some(mut playback) = self.playback.take() {
            playback.teardown(self.playback_engine.as_mut()).await;
        }

        if let Some(mut capture) = self.capture.take() {
            capture.abort(self.capture_engine.as_mut()).await;
            let path = capture.recording().path.clone();
            info!("Recording {} deleted: {}", capture.id(), path.display());
            for observer in &self.observers {
                observer.on_recording_discarded(&path);
            }
        }

        self.waveform.clear();
        self.last_error = None;
        self.set_timer(DisplayTimer::default());
        Ok(())
    }

    /// Seek bar moved; programmatic moves are ignored
    pub async fn on_seek_intent(
        &mut self,
        percent: i32,
        user_originated: bool,
    ) -> Result<(), SessionError> {
        if !user_originated {
            debug!("Ignoring programmatic seek to {}%", percent);
            return Ok(());
        }

        let Some(playback) = self.playback.as_mut() else {
            debug!("Seek to {}% ignored: nothing to play", percent);
            return Ok(());
        };

        let timer = playback
            .seek(percent, self.playback_engine.as_mut())
            .await?;
        self.set_timer(timer);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Engine callbacks
    // ------------------------------------------------------------------

    pub fn on_chunk(&mut self, recording: RecordingId, chunk: &AudioChunk) {
        if let Some(capture) = self.capture.as_ref() {
            capture.on_chunk(recording, chunk, self.waveform.as_mut());
        }
    }

    pub fn on_tick(&mut self, recording: RecordingId, elapsed_ms: u64) {
        let timer = self
            .capture
            .as_mut()
            .and_then(|capture| capture.on_tick(recording, elapsed_ms));
        if let Some(timer) = timer {
            self.set_timer(timer);
        }
    }

    pub fn on_capture_state(&mut self, recording: RecordingId, state: CaptureState) {
        match state {
            CaptureState::Started => debug!("Capture engine reports {} started", recording),
            CaptureState::Stopped => {
                let finished = self
                    .capture
                    .as_mut()
                    .and_then(|capture| capture.on_engine_stopped(recording));
                if let Some(finished) = finished {
                    self.complete_recording(finished);
                    self.controls = ControlPanel::paused();
                }
            }
        }
    }

    pub async fn on_prepared(&mut self, id: PlaybackId, result: Result<u64, String>) {
        let Some(playback) = self.playback.as_mut().filter(|p| p.id() == id) else {
            debug!("Dropping prepare result for stale {}", id);
            return;
        };

        let play = match playback.on_prepared(result) {
            Ok(play) => play,
            Err(e) => {
                warn!("{} could not be prepared: {}", id, e);
                self.last_error = Some(e);
                self.controls = ControlPanel::paused();
                return;
            }
        };

        self.last_error = None;
        let timer = playback.timer();
        let started = if play {
            playback
                .play(self.playback_engine.as_mut(), self.scheduler.as_ref())
                .await
        } else {
            Ok(())
        };

        self.set_timer(timer);
        if let Err(e) = started {
            warn!("{} failed to start: {}", id, e);
            self.last_error = Some(e);
            self.controls = ControlPanel::paused();
        }
    }

    pub async fn on_playback_completed(&mut self, id: PlaybackId) {
        let Some(playback) = self.playback.as_mut().filter(|p| p.id() == id) else {
            debug!("Dropping completion for stale {}", id);
            return;
        };

        if !playback.is_playing() {
            debug!("Dropping completion for {}: not playing", id);
            return;
        }

        let timer = playback.on_completed(self.playback_engine.as_mut()).await;
        self.controls = ControlPanel::paused();
        self.set_timer(timer);
    }

    pub fn on_progress_tick(&mut self, id: PlaybackId, generation: u64) {
        let Some(playback) = self.playback.as_mut().filter(|p| p.id() == id) else {
            debug!("Dropping poller tick for stale {}", id);
            return;
        };

        if let Some(timer) = playback.on_progress_tick(
            generation,
            self.playback_engine.as_ref(),
            self.scheduler.as_ref(),
        ) {
            self.set_timer(timer);
        }
    }

    /// Stop whatever is live before the runtime exits
    pub async fn shutdown(&mut self) {
        if let Some(capture) = self.capture.as_mut() {
            if let Some(finished) = capture.stop(self.capture_engine.as_mut()).await {
                self.complete_recording(finished);
            }
        }
        if let Some(playback) = self.playback.as_mut() {
            if let Err(e) = playback.pause(self.playback_engine.as_mut()).await {
                warn!("Failed to pause playback on shutdown: {}", e);
            }
        }
        info!("Recorder session {} shut down", self.config.session_id);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn is_capture_active(&self) -> bool {
        self.capture.as_ref().is_some_and(|c| c.is_recording())
    }

    pub fn is_playback_active(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| p.is_active())
    }

    pub fn mode(&self) -> SessionMode {
        if self.is_capture_active() {
            return SessionMode::Recording;
        }
        match self.playback.as_ref() {
            Some(p) if p.is_playing() => SessionMode::Playing,
            Some(p) if p.is_active() => SessionMode::Preparing,
            _ if self.recording().is_some() => SessionMode::Recorded,
            _ => SessionMode::Empty,
        }
    }

    pub fn timer(&self) -> &DisplayTimer {
        &self.timer
    }

    pub fn controls(&self) -> ControlPanel {
        self.controls
    }

    /// Open or finished recording
    pub fn recording(&self) -> Option<&Recording> {
        self.capture
            .as_ref()
            .filter(|c| c.is_recording() || c.is_finished())
            .map(|c| c.recording())
    }

    pub fn playback_state(&self) -> Option<&PlaybackState> {
        self.playback.as_ref().map(|p| p.state())
    }

    pub fn playback_id(&self) -> Option<PlaybackId> {
        self.playback.as_ref().map(|p| p.id())
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let playback = self.playback_state();

        SessionSnapshot {
            session_id: self.config.session_id.clone(),
            mode: self.mode(),
            timer: self.timer.text(),
            recorded_ms: self.recording().map_or(0, |r| r.elapsed_ms),
            percent: playback.map_or(0, |p| p.percent),
            position_ms: playback.map_or(0, |p| p.position_ms),
            total_duration_ms: playback.filter(|p| p.prepared).map(|p| p.total_duration_ms),
            prepared: playback.is_some_and(|p| p.prepared),
            recording_path: self.recording().map(|r| r.path.clone()),
            controls: self.controls,
            last_error: self.last_error.as_ref().map(|e| e.to_string()),
            taken_at: Utc::now(),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn complete_recording(&mut self, finished: FinishedRecording) {
        for observer in &self.observers {
            observer.on_recording_finished(&finished);
        }

        // Pending transport starts at zero
        let playback = self.new_playback(&finished);
        self.set_timer(playback.timer());
        self.playback = Some(playback);
    }

    fn new_playback(&mut self, finished: &FinishedRecording) -> PlaybackSession {
        let id = PlaybackId(self.allocate_id());
        PlaybackSession::new(
            id,
            finished.path.clone(),
            finished.duration_ms,
            self.config.min_poll_interval,
        )
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn set_timer(&mut self, timer: DisplayTimer) {
        self.display.show_timer(&timer.text());
        self.timer = timer;
    }
}
