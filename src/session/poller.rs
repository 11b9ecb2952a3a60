use std::time::Duration;
use tracing::trace;

use super::event::{EventSender, SessionEvent};

/// Deferred delivery of session events
pub trait Scheduler: Send + Sync {
    /// Post `event` to the session after `delay`
    fn schedule(&self, delay: Duration, event: SessionEvent);
}

/// Scheduler backed by tokio timers
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    events: EventSender,
}

impl TokioScheduler {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, event: SessionEvent) {
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            events.send(event);
        });
    }
}

/// Liveness of the playback progress poller
///
/// The poller is a recurring deferred action, not a thread: every firing
/// carries the generation it was armed with and is honoured only while
/// that generation is still the live one. Disarming bumps the generation,
/// so firings already in flight turn into no-ops the moment `disarm`
/// returns.
#[derive(Debug, Clone)]
pub struct ProgressPoller {
    cadence: Duration,
    generation: u64,
    live: bool,
}

impl ProgressPoller {
    pub fn new(cadence: Duration) -> Self {
        Self {
            cadence,
            generation: 0,
            live: false,
        }
    }

    /// Start a new firing chain and return its generation
    pub fn arm(&mut self) -> u64 {
        self.generation += 1;
        self.live = true;
        trace!("Poller armed (generation {})", self.generation);
        self.generation
    }

    pub fn disarm(&mut self) {
        if self.live {
            trace!("Poller disarmed (generation {})", self.generation);
        }
        self.live = false;
        self.generation += 1;
    }

    /// Whether a firing from `generation` may do work
    pub fn is_current(&self, generation: u64) -> bool {
        self.live && generation == self.generation
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }
}
