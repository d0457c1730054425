//! Control surface.
//!
//! Events are queued on a channel and drained by the player at the top of
//! each loop iteration, so they never interrupt a block in flight.

use crate::metrics::{PlaybackMetrics, PlaybackMetricsSnapshot};
use adagio_dsp::{EqPreset, PlaybackSpeed};
use crossbeam_channel::Sender;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Play,
    Pause,
    Resume,
    TogglePause,
    Stop,
    SetSpeed(PlaybackSpeed),
    SpeedUp,
    SpeedDown,
    SetEq(EqPreset),
    CycleEq,
    NextTrack,
    PreviousTrack,
    SelectTrack(usize),
    SeekForward,
    SeekBackward,
}

impl ControlEvent {
    /// Keyboard mapping used by the interactive player.
    ///
    /// `p` pause, `]`/`[` faster/slower, `e` next EQ preset, `.`/`,`
    /// next/previous track, `f`/`b` seek, `q` quit.
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            'p' | ' ' => Some(Self::TogglePause),
            ']' => Some(Self::SpeedUp),
            '[' => Some(Self::SpeedDown),
            'e' => Some(Self::CycleEq),
            '.' => Some(Self::NextTrack),
            ',' => Some(Self::PreviousTrack),
            'f' => Some(Self::SeekForward),
            'b' => Some(Self::SeekBackward),
            'q' => Some(Self::Stop),
            _ => None,
        }
    }
}

/// Cloneable handle for steering a running player.
#[derive(Clone)]
pub struct PlayerController {
    events: Sender<ControlEvent>,
    metrics: Arc<PlaybackMetrics>,
}

impl PlayerController {
    pub(crate) fn new(events: Sender<ControlEvent>, metrics: Arc<PlaybackMetrics>) -> Self {
        Self { events, metrics }
    }

    /// Queue an event. Returns false once the player is gone.
    pub fn send(&self, event: ControlEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn play(&self) -> &Self {
        self.send(ControlEvent::Play);
        self
    }

    pub fn pause(&self) -> &Self {
        self.send(ControlEvent::Pause);
        self
    }

    pub fn resume(&self) -> &Self {
        self.send(ControlEvent::Resume);
        self
    }

    pub fn toggle_pause(&self) -> &Self {
        self.send(ControlEvent::TogglePause);
        self
    }

    pub fn stop(&self) -> &Self {
        self.send(ControlEvent::Stop);
        self
    }

    pub fn speed(&self, speed: PlaybackSpeed) -> &Self {
        self.send(ControlEvent::SetSpeed(speed));
        self
    }

    pub fn faster(&self) -> &Self {
        self.send(ControlEvent::SpeedUp);
        self
    }

    pub fn slower(&self) -> &Self {
        self.send(ControlEvent::SpeedDown);
        self
    }

    pub fn eq(&self, preset: EqPreset) -> &Self {
        self.send(ControlEvent::SetEq(preset));
        self
    }

    pub fn cycle_eq(&self) -> &Self {
        self.send(ControlEvent::CycleEq);
        self
    }

    pub fn next_track(&self) -> &Self {
        self.send(ControlEvent::NextTrack);
        self
    }

    pub fn previous_track(&self) -> &Self {
        self.send(ControlEvent::PreviousTrack);
        self
    }

    pub fn select_track(&self, index: usize) -> &Self {
        self.send(ControlEvent::SelectTrack(index));
        self
    }

    pub fn seek_forward(&self) -> &Self {
        self.send(ControlEvent::SeekForward);
        self
    }

    pub fn seek_backward(&self) -> &Self {
        self.send(ControlEvent::SeekBackward);
        self
    }

    pub fn metrics(&self) -> PlaybackMetricsSnapshot {
        self.metrics.snapshot()
    }
}
