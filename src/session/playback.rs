use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::error::SessionError;
use super::event::{EventSender, PlaybackId, SessionEvent};
use super::poller::{ProgressPoller, Scheduler};
use super::timer::DisplayTimer;
use crate::audio::PlaybackEngine;

/// Transport state of one playback session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackState {
    pub prepared: bool,
    pub playing: bool,
    pub total_duration_ms: u64,
    /// Poller cadence and seek unit; fixed when the file is prepared
    pub ms_per_percent: u64,
    /// Seek bar position, 0 to 100
    pub percent: u8,
    pub position_ms: u64,
}

/// Playback session: `Unprepared -> Prepared(paused) <-> Prepared(playing)`
///
/// Preparation is asynchronous: `prepare` hands the file to the engine and
/// the outcome arrives later through `on_prepared`.
pub struct PlaybackSession {
    id: PlaybackId,
    path: PathBuf,
    /// Duration measured while recording; the seek reference until prepared
    recorded_duration_ms: u64,
    state: PlaybackState,
    preparing: bool,
    play_when_prepared: bool,
    poller: ProgressPoller,
    min_poll_interval: Duration,
}

impl PlaybackSession {
    pub fn new(
        id: PlaybackId,
        path: impl Into<PathBuf>,
        recorded_duration_ms: u64,
        min_poll_interval: Duration,
    ) -> Self {
        Self {
            id,
            path: path.into(),
            recorded_duration_ms,
            state: PlaybackState::default(),
            preparing: false,
            play_when_prepared: false,
            poller: ProgressPoller::new(min_poll_interval),
            min_poll_interval,
        }
    }

    pub fn id(&self) -> PlaybackId {
        self.id
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_prepared(&self) -> bool {
        self.state.prepared
    }

    pub fn is_playing(&self) -> bool {
        self.state.playing
    }

    /// Playing, or about to play once preparation finishes
    pub fn is_active(&self) -> bool {
        self.state.playing || (self.preparing && self.play_when_prepared)
    }

    /// Duration that percent positions are measured against
    pub fn reference_duration_ms(&self) -> u64 {
        if self.state.prepared {
            self.state.total_duration_ms
        } else {
            self.recorded_duration_ms
        }
    }

    /// Timer for the current position
    pub fn timer(&self) -> DisplayTimer {
        DisplayTimer::position(self.state.position_ms, self.reference_duration_ms())
    }

    /// Request playback as soon as preparation completes
    pub fn set_play_when_prepared(&mut self, play: bool) {
        self.play_when_prepared = play;
    }

    /// Hand the file to the engine; at most once per session
    pub async fn prepare(
        &mut self,
        engine: &mut dyn PlaybackEngine,
        events: EventSender,
    ) -> Result<(), SessionError> {
        if self.state.prepared || self.preparing {
            return Ok(());
        }

        engine
            .open(self.id, &self.path, events)
            .await
            .map_err(SessionError::prepare)?;

        self.preparing = true;
        info!("Preparing {} with {}", self.id, engine.name());
        Ok(())
    }

    /// Apply the engine's prepare result
    ///
    /// Returns whether playback should start now.
    pub fn on_prepared(&mut self, result: Result<u64, String>) -> Result<bool, SessionError> {
        self.preparing = false;
        let play = std::mem::take(&mut self.play_when_prepared);

        let total_duration_ms = result.map_err(SessionError::PrepareError)?;

        self.state.prepared = true;
        self.state.total_duration_ms = total_duration_ms;
        self.state.ms_per_percent = total_duration_ms / 100;
        self.state.position_ms = self.offset_for(self.state.percent);

        let cadence = Duration::from_millis(self.state.ms_per_percent).max(self.min_poll_interval);
        self.poller = ProgressPoller::new(cadence);

        info!(
            "{} prepared: {}ms total, polling every {:?}",
            self.id, total_duration_ms, cadence
        );

        Ok(play)
    }

    /// Seek to the current percent, start output and arm the poller
    pub async fn play(
        &mut self,
        engine: &mut dyn PlaybackEngine,
        scheduler: &dyn Scheduler,
    ) -> Result<(), SessionError> {
        if !self.state.prepared {
            return Err(SessionError::NotPrepared);
        }
        if self.state.playing {
            return Ok(());
        }

        let offset = self.offset_for(self.state.percent);
        engine.seek_to(offset).await.map_err(SessionError::engine)?;
        engine.play().await.map_err(SessionError::engine)?;

        self.state.playing = true;
        self.state.position_ms = offset;

        let generation = self.poller.arm();
        self.schedule_tick(generation, scheduler);

        info!("{} playing from {}% ({}ms)", self.id, self.state.percent, offset);
        Ok(())
    }

    /// Stop output and disarm the poller; no-op when not playing
    pub async fn pause(&mut self, engine: &mut dyn PlaybackEngine) -> Result<(), SessionError> {
        self.play_when_prepared = false;
        if !self.state.playing {
            return Ok(());
        }

        self.poller.disarm();
        self.state.playing = false;

        let paused = if engine.is_playing() {
            engine.pause().await.map_err(SessionError::engine)
        } else {
            Ok(())
        };
        self.state.position_ms = engine.current_position_ms();

        info!("{} paused at {}ms", self.id, self.state.position_ms);
        paused
    }

    /// Move to `percent` (clamped to 0..=100)
    ///
    /// Before preparation the move is visual only. Without a known duration
    /// there is nothing to measure against and the seek is dropped.
    pub async fn seek(
        &mut self,
        percent: i32,
        engine: &mut dyn PlaybackEngine,
    ) -> Result<DisplayTimer, SessionError> {
        if self.reference_duration_ms() == 0 {
            debug!("{} seek to {}% ignored: duration unknown", self.id, percent);
            return Ok(self.timer());
        }

        let percent = percent.clamp(0, 100) as u8;
        let offset = self.offset_for(percent);

        if self.state.prepared {
            engine.seek_to(offset).await.map_err(SessionError::engine)?;
        }

        self.state.percent = percent;
        self.state.position_ms = offset;
        debug!("{} seek to {}% ({}ms)", self.id, percent, offset);

        Ok(self.timer())
    }

    /// One poller firing
    ///
    /// Does nothing, and does not reschedule, unless `generation` is the live
    /// chain and the session is still playing.
    pub fn on_progress_tick(
        &mut self,
        generation: u64,
        engine: &dyn PlaybackEngine,
        scheduler: &dyn Scheduler,
    ) -> Option<DisplayTimer> {
        if !self.state.playing || !self.poller.is_current(generation) {
            debug!("Ignoring stale poller tick for {} (generation {})", self.id, generation);
            return None;
        }

        let mut timer = None;
        if self.state.percent as u64 * self.state.ms_per_percent < self.state.total_duration_ms {
            self.state.percent = (self.state.percent + 1).min(100);
            self.state.position_ms = engine.current_position_ms();
            timer = Some(DisplayTimer::position(
                self.state.position_ms,
                self.state.total_duration_ms,
            ));
        }

        self.schedule_tick(generation, scheduler);
        timer
    }

    /// Natural end of media: pause, then rewind to zero
    pub async fn on_completed(&mut self, engine: &mut dyn PlaybackEngine) -> DisplayTimer {
        if let Err(e) = self.pause(engine).await {
            warn!("Pause on completion failed for {}: {}", self.id, e);
        }

        self.state.percent = 0;
        self.state.position_ms = 0;
        if self.state.prepared {
            if let Err(e) = engine.seek_to(0).await {
                warn!("Rewind on completion failed for {}: {:#}", self.id, e);
            }
        }

        info!("{} completed", self.id);
        self.timer()
    }

    /// Release the engine; the session is unusable afterwards
    pub async fn teardown(&mut self, engine: &mut dyn PlaybackEngine) {
        self.poller.disarm();
        self.play_when_prepared = false;
        self.preparing = false;
        self.state = PlaybackState::default();

        if let Err(e) = engine.reset().await {
            warn!("Failed to reset {}: {:#}", engine.name(), e);
        }
        info!("{} torn down", self.id);
    }

    fn offset_for(&self, percent: u8) -> u64 {
        self.reference_duration_ms() * percent as u64 / 100
    }

    fn schedule_tick(&self, generation: u64, scheduler: &dyn Scheduler) {
        scheduler.schedule(
            self.poller.cadence(),
            SessionEvent::ProgressTick {
                playback: self.id,
                generation,
            },
        );
    }
}
