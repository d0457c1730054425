//! Per-track playback context.
//!
//! Everything that must not survive a track change lives here: the source,
//! the time-stretch state and the resampler position. Dropping the session
//! releases all of it.

use crate::source::SampleSource;
use crate::Result;
use adagio_dsp::{TrackFormat, Varispeed, WsolaConfig, WsolaProcessor};
use tracing::{debug, info, warn};

pub struct TrackSession {
    index: usize,
    title: String,
    format: TrackFormat,
    source: Box<dyn SampleSource>,
    wsola: Option<WsolaProcessor>,
    varispeed: Varispeed,
    speed: f64,
    eq_bypass_logged: bool,
    finished: bool,
}

impl TrackSession {
    /// Build the session for a freshly opened track. Time stretching is only
    /// attempted for mono; a failure disables it for this track.
    pub fn open(
        index: usize,
        title: impl Into<String>,
        source: Box<dyn SampleSource>,
        wsola: &WsolaConfig,
        speed: f64,
    ) -> Self {
        let title = title.into();
        let format = source.format();

        let wsola = if format.supports_wsola() {
            match WsolaProcessor::new(*wsola, format, speed) {
                Ok(processor) => Some(processor),
                Err(e) => {
                    warn!(track = %title, error = %e, "time stretch disabled for track");
                    None
                }
            }
        } else {
            debug!(track = %title, %format, "time stretch unavailable, using resampler");
            None
        };

        info!(
            index,
            track = %title,
            %format,
            frames = source.total_frames(),
            "track loaded"
        );

        Self {
            index,
            title,
            format,
            source,
            wsola,
            varispeed: Varispeed::new(speed, format.channels as usize),
            speed,
            eq_bypass_logged: false,
            finished: false,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn format(&self) -> TrackFormat {
        self.format
    }

    pub fn source(&self) -> &dyn SampleSource {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> &mut dyn SampleSource {
        self.source.as_mut()
    }

    pub fn wsola(&self) -> Option<&WsolaProcessor> {
        self.wsola.as_ref()
    }

    pub(crate) fn wsola_mut(&mut self) -> Option<&mut WsolaProcessor> {
        self.wsola.as_mut()
    }

    pub(crate) fn varispeed_mut(&mut self) -> &mut Varispeed {
        &mut self.varispeed
    }

    pub fn varispeed(&self) -> &Varispeed {
        &self.varispeed
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn position(&self) -> u64 {
        self.source.position()
    }

    pub fn total_frames(&self) -> Option<u64> {
        self.source.total_frames()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn mark_finished(&mut self) {
        self.finished = true;
    }

    /// True the first time it is called for this track.
    pub(crate) fn take_eq_bypass_notice(&mut self) -> bool {
        !std::mem::replace(&mut self.eq_bypass_logged, true)
    }

    /// Apply a new speed. Buffered time-stretch input is kept.
    pub fn set_speed(&mut self, speed: f64) -> Result<()> {
        if let Some(wsola) = self.wsola.as_mut() {
            wsola.set_speed(speed)?;
        }
        self.varispeed.set_speed(speed);
        self.speed = speed;
        Ok(())
    }

    /// Move the read position by `frames`, clamped to the track. Returns the
    /// new position. Continuity is broken, so stretch state is dropped.
    pub fn seek_relative(&mut self, frames: i64) -> Result<u64> {
        let current = self.source.position();
        let mut target = current.saturating_add_signed(frames);
        if let Some(total) = self.source.total_frames() {
            target = target.min(total);
        }
        self.source.seek(target)?;
        self.reset_stretch();
        self.finished = false;
        debug!(from = current, to = target, "seek");
        Ok(self.source.position())
    }

    /// Emit whatever the speed stage still holds at end of track.
    pub fn flush_stretch(&mut self, output: &mut Vec<i16>) -> usize {
        match self.wsola.as_mut() {
            Some(wsola) => wsola.flush(output),
            None => self.varispeed.flush(output) * self.format.channels.max(1) as usize,
        }
    }

    pub fn reset_stretch(&mut self) {
        if let Some(wsola) = self.wsola.as_mut() {
            wsola.reset();
        }
        self.varispeed.reset();
    }
}

impl std::fmt::Debug for TrackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackSession")
            .field("index", &self.index)
            .field("title", &self.title)
            .field("format", &self.format)
            .field("position", &self.source.position())
            .field("wsola", &self.wsola.is_some())
            .field("speed", &self.speed)
            .finish()
    }
}
