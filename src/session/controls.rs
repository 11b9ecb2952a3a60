use serde::Serialize;

use super::event::Intent;

/// Visibility of the recorder's controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlPanel {
    pub record: bool,
    pub stop: bool,
    pub play: bool,
    pub pause: bool,
    pub delete: bool,
    pub waveform: bool,
    pub seek_bar: bool,
}

impl ControlPanel {
    const HIDDEN: Self = Self {
        record: false,
        stop: false,
        play: false,
        pause: false,
        delete: false,
        waveform: false,
        seek_bar: false,
    };

    /// Nothing recorded yet
    pub fn empty() -> Self {
        Self {
            record: true,
            waveform: true,
            ..Self::HIDDEN
        }
    }

    pub fn recording() -> Self {
        Self {
            stop: true,
            waveform: true,
            ..Self::HIDDEN
        }
    }

    /// A finished recording, not playing
    pub fn paused() -> Self {
        Self {
            play: true,
            delete: true,
            seek_bar: true,
            ..Self::HIDDEN
        }
    }

    pub fn playing() -> Self {
        Self {
            pause: true,
            delete: true,
            seek_bar: true,
            ..Self::HIDDEN
        }
    }

    /// Layout after `intent` succeeds; seeks leave the layout alone
    pub fn after(intent: Intent) -> Option<Self> {
        match intent {
            Intent::Record => Some(Self::recording()),
            Intent::Stop | Intent::Pause => Some(Self::paused()),
            Intent::Play => Some(Self::playing()),
            Intent::Delete => Some(Self::empty()),
            Intent::Seek { .. } => None,
        }
    }
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self::empty()
    }
}
