// Clock-driven playback engine for recorded WAV files
//
// Preparation probes the WAV header on a blocking task and reports the
// duration through the session's event channel. The transport itself is a
// monotonic clock: position = base offset + time since the last start,
// capped at the file duration. A timer task posts the completion event
// when the end of media is reached.

use anyhow::{bail, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::engine::PlaybackEngine;
use super::file::AudioFile;
use crate::session::{EventSender, PlaybackId};

pub struct WavPlaybackEngine {
    playback: Option<PlaybackId>,
    events: Option<EventSender>,
    prepared: Arc<AtomicBool>,
    duration_ms: Arc<AtomicU64>,
    /// Bumped when a pending completion becomes stale
    epoch: Arc<AtomicU64>,
    /// Bumped when a pending prepare result becomes stale
    open_epoch: Arc<AtomicU64>,
    base_position_ms: u64,
    started_at: Option<Instant>,
    completion_task: Option<JoinHandle<()>>,
}

impl WavPlaybackEngine {
    pub fn new() -> Self {
        Self {
            playback: None,
            events: None,
            prepared: Arc::new(AtomicBool::new(false)),
            duration_ms: Arc::new(AtomicU64::new(0)),
            epoch: Arc::new(AtomicU64::new(0)),
            open_epoch: Arc::new(AtomicU64::new(0)),
            base_position_ms: 0,
            started_at: None,
            completion_task: None,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms.load(Ordering::SeqCst)
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared.load(Ordering::SeqCst)
    }

    /// Fold a clock that ran past the end back into a paused position
    fn settle(&mut self) {
        if let Some(started_at) = self.started_at {
            let duration = self.duration_ms();
            let position = self.base_position_ms + started_at.elapsed().as_millis() as u64;
            if position >= duration {
                self.base_position_ms = duration;
                self.started_at = None;
            }
        }
    }

    fn cancel_completion(&mut self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.completion_task.take() {
            task.abort();
        }
    }

    fn schedule_completion(&mut self) {
        self.cancel_completion();

        let (Some(playback), Some(events)) = (self.playback, self.events.clone()) else {
            return;
        };

        let remaining = self.duration_ms().saturating_sub(self.base_position_ms);
        let epoch = Arc::clone(&self.epoch);
        let scheduled_epoch = epoch.load(Ordering::SeqCst);

        self.completion_task = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(remaining)).await;
            if epoch.load(Ordering::SeqCst) == scheduled_epoch {
                debug!("Playback reached end of media: {}", playback);
                events.completed(playback);
            }
        }));
    }
}

impl Default for WavPlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PlaybackEngine for WavPlaybackEngine {
    async fn open(&mut self, playback: PlaybackId, path: &Path, events: EventSender) -> Result<()> {
        self.reset().await?;

        info!("Preparing {} for playback: {}", playback, path.display());

        self.playback = Some(playback);
        self.events = Some(events.clone());

        let path = path.to_path_buf();
        let prepared = Arc::clone(&self.prepared);
        let duration_ms = Arc::clone(&self.duration_ms);
        let epoch = Arc::clone(&self.open_epoch);
        let open_epoch = epoch.load(Ordering::SeqCst);

        tokio::spawn(async move {
            let probed = tokio::task::spawn_blocking(move || AudioFile::probe(&path)).await;

            let result = match probed {
                Ok(Ok(file)) => Ok(file.duration_ms),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(anyhow::anyhow!("Probe task failed: {}", e)),
            };

            if epoch.load(Ordering::SeqCst) != open_epoch {
                debug!("Discarding stale prepare result for {}", playback);
                return;
            }

            if let Ok(duration) = result {
                duration_ms.store(duration, Ordering::SeqCst);
                prepared.store(true, Ordering::SeqCst);
            }

            events.prepared(playback, result);
        });

        Ok(())
    }

    async fn play(&mut self) -> Result<()> {
        if !self.is_prepared() {
            bail!("No file prepared for playback");
        }

        self.settle();
        if self.started_at.is_some() {
            return Ok(());
        }

        self.started_at = Some(Instant::now());
        self.schedule_completion();
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.settle();
        if let Some(started_at) = self.started_at.take() {
            let position = self.base_position_ms + started_at.elapsed().as_millis() as u64;
            self.base_position_ms = position.min(self.duration_ms());
        }
        self.cancel_completion();
        Ok(())
    }

    async fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        if !self.is_prepared() {
            warn!("Seek to {}ms ignored: no file prepared", position_ms);
            return Ok(());
        }

        self.settle();
        self.base_position_ms = position_ms.min(self.duration_ms());

        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
            self.schedule_completion();
        }

        Ok(())
    }

    async fn reset(&mut self) -> Result<()> {
        self.cancel_completion();
        self.open_epoch.fetch_add(1, Ordering::SeqCst);
        self.prepared.store(false, Ordering::SeqCst);
        self.duration_ms.store(0, Ordering::SeqCst);
        self.base_position_ms = 0;
        self.started_at = None;
        self.playback = None;
        self.events = None;
        Ok(())
    }

    fn current_position_ms(&self) -> u64 {
        match self.started_at {
            Some(started_at) => {
                let position = self.base_position_ms + started_at.elapsed().as_millis() as u64;
                position.min(self.duration_ms())
            }
            None => self.base_position_ms,
        }
    }

    fn is_playing(&self) -> bool {
        self.started_at.is_some() && self.current_position_ms() < self.duration_ms()
    }

    fn name(&self) -> &str {
        "WAV clock transport"
    }
}
