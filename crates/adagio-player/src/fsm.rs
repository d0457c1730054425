//! Playback state machine.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Stopped => "stopped",
            Self::Playing => "playing",
            Self::Paused => "paused",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Play,
    Pause,
    Resume,
    TogglePause,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Changed {
        from: PlaybackState,
        to: PlaybackState,
    },
}

impl Transition {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

#[derive(Debug, Default)]
pub struct PlaybackFsm {
    state: PlaybackState,
}

impl PlaybackFsm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn transition(&mut self, event: PlaybackEvent) -> Transition {
        use PlaybackEvent::*;
        use PlaybackState::*;

        let next = match (self.state, event) {
            (Stopped | Paused, Play) => Playing,
            (Playing, Pause | TogglePause) => Paused,
            (Paused, Resume | TogglePause) => Playing,
            (Playing | Paused, Stop) => Stopped,
            _ => return Transition::None,
        };

        let from = self.state;
        self.state = next;
        Transition::Changed { from, to: next }
    }
}
