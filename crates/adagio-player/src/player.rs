//! The playback loop.
//!
//! One block per [`Player::step`]: read, equalize, change speed, write.
//! Control events are drained at the top of each step. The loop is single
//! threaded; the only blocking point is the sink write.

use crate::config::PlayerConfig;
use crate::control::{ControlEvent, PlayerController};
use crate::fsm::{PlaybackEvent, PlaybackFsm, PlaybackState, Transition};
use crate::metrics::{PlaybackMetrics, PlaybackMetricsSnapshot};
use crate::playlist::{Playlist, TrackLoader};
use crate::session::TrackSession;
use crate::sink::AudioSink;
use crate::{Error, Result};
use adagio_dsp::{EqPreset, FirFilter, PlaybackSpeed, TrackFormat};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::collections::TryReserveError;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Frames handed to the sink this step.
    Played(usize),
    Paused,
    /// A new track was loaded; its first block comes next step.
    TrackChanged(usize),
    Stopped,
}

/// Point-in-time view of the player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub speed: PlaybackSpeed,
    pub eq: EqPreset,
    pub track_index: usize,
    pub track_count: usize,
    pub title: Option<String>,
    pub format: Option<TrackFormat>,
    pub position_frames: u64,
    pub total_frames: Option<u64>,
}

impl PlaybackStatus {
    pub fn position_seconds(&self) -> f64 {
        match self.format {
            Some(f) if f.sample_rate > 0 => self.position_frames as f64 / f.sample_rate as f64,
            _ => 0.0,
        }
    }
}

pub struct Player<S: AudioSink, L: TrackLoader> {
    config: PlayerConfig,
    playlist: Playlist,
    loader: L,
    sink: S,
    fsm: PlaybackFsm,
    session: Option<TrackSession>,
    fir: Option<FirFilter>,
    speed: PlaybackSpeed,
    eq: EqPreset,
    events_tx: Sender<ControlEvent>,
    events: Receiver<ControlEvent>,
    metrics: Arc<PlaybackMetrics>,
    filtered: Vec<i16>,
    stretched: Vec<i16>,
}

impl<S: AudioSink, L: TrackLoader> Player<S, L> {
    pub fn new(config: PlayerConfig, playlist: Playlist, loader: L, sink: S) -> Result<Self> {
        config.validate()?;

        // Built once; tracks only change its format and history
        let fir = match FirFilter::new(config.initial_eq, TrackFormat::default(), config.fir_taps)
        {
            Ok(fir) => Some(fir),
            Err(e) => {
                warn!(error = %e, "equalizer disabled");
                None
            }
        };

        let (events_tx, events) = crossbeam_channel::unbounded();
        Ok(Self {
            speed: config.initial_speed,
            eq: config.initial_eq,
            config,
            playlist,
            loader,
            sink,
            fsm: PlaybackFsm::new(),
            session: None,
            fir,
            events_tx,
            events,
            metrics: Arc::new(PlaybackMetrics::new()),
            filtered: Vec::new(),
            stretched: Vec::new(),
        })
    }

    pub fn controller(&self) -> PlayerController {
        PlayerController::new(self.events_tx.clone(), Arc::clone(&self.metrics))
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn state(&self) -> PlaybackState {
        self.fsm.state()
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed
    }

    pub fn eq(&self) -> EqPreset {
        self.eq
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn session(&self) -> Option<&TrackSession> {
        self.session.as_ref()
    }

    pub fn fir(&self) -> Option<&FirFilter> {
        self.fir.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn metrics(&self) -> PlaybackMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn status(&self) -> PlaybackStatus {
        let session = self.session.as_ref();
        PlaybackStatus {
            state: self.fsm.state(),
            speed: self.speed,
            eq: self.eq,
            track_index: self.playlist.current_index(),
            track_count: self.playlist.len(),
            title: session.map(|s| s.title().to_string()),
            format: session.map(|s| s.format()),
            position_frames: session.map_or(0, |s| s.position()),
            total_frames: session.and_then(|s| s.total_frames()),
        }
    }

    /// Start playback of the current track, or resume if paused.
    pub fn play(&mut self) -> Result<()> {
        if self.session.is_none() {
            self.load_track(self.playlist.current_index())?;
        }
        self.apply(PlaybackEvent::Play)
    }

    pub fn pause(&mut self) -> Result<()> {
        self.apply(PlaybackEvent::Pause)
    }

    pub fn resume(&mut self) -> Result<()> {
        self.apply(PlaybackEvent::Resume)
    }

    pub fn stop(&mut self) -> Result<()> {
        self.apply(PlaybackEvent::Stop)
    }

    fn apply(&mut self, event: PlaybackEvent) -> Result<()> {
        let Transition::Changed { from, to } = self.fsm.transition(event) else {
            return Ok(());
        };
        info!(%from, %to, "playback state changed");

        match (from, to) {
            (PlaybackState::Playing, PlaybackState::Paused) => {
                self.sink.set_paused(true)?;
                self.reset_fir();
            }
            (PlaybackState::Paused, PlaybackState::Playing) => {
                self.sink.set_paused(false)?;
                self.reset_fir();
            }
            (_, PlaybackState::Stopped) => {
                // Releases the source and stretch state
                self.session = None;
                self.reset_fir();
            }
            _ => {}
        }
        Ok(())
    }

    /// Play until stopped, then let the sink drain.
    pub fn run(&mut self) -> Result<()> {
        if self.fsm.state() == PlaybackState::Stopped {
            self.play()?;
        }

        let result = loop {
            match self.step() {
                Ok(StepOutcome::Stopped) => break Ok(()),
                Ok(_) => {}
                Err(e) => break Err(e),
            }
        };
        self.session = None;

        match result {
            Ok(()) => {
                self.sink.drain()?;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "playback aborted");
                Err(e)
            }
        }
    }

    /// One loop iteration.
    pub fn step(&mut self) -> Result<StepOutcome> {
        let changed = self.handle_pending_events()?;

        let state = self.fsm.state();
        if state == PlaybackState::Stopped {
            return Ok(StepOutcome::Stopped);
        }
        if let Some(index) = changed {
            return Ok(StepOutcome::TrackChanged(index));
        }

        match state {
            PlaybackState::Paused => {
                // Wake early if a control event arrives
                let changed = match self.events.recv_timeout(self.config.pause_poll()) {
                    Ok(event) => self.handle_event(event)?,
                    Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
                };
                return Ok(match (self.fsm.state(), changed) {
                    (PlaybackState::Stopped, _) => StepOutcome::Stopped,
                    (_, Some(index)) => StepOutcome::TrackChanged(index),
                    _ => StepOutcome::Paused,
                });
            }
            PlaybackState::Playing | PlaybackState::Stopped => {}
        }

        if self.session.is_none() {
            self.load_track(self.playlist.current_index())?;
        }
        let block = match self.session.as_mut() {
            Some(session) => session.source_mut().read_block(self.config.block_frames)?,
            None => None,
        };

        match block {
            Some(block) => {
                self.metrics.record_read(block.frames() as u64);
                let frames = self.process_block(&block.samples)?;
                Ok(StepOutcome::Played(frames))
            }
            None => self.finish_track(),
        }
    }

    /// Apply all queued control events. Returns the index of the last track
    /// loaded, if any.
    pub fn handle_pending_events(&mut self) -> Result<Option<usize>> {
        let mut changed = None;
        while let Ok(event) = self.events.try_recv() {
            if let Some(index) = self.handle_event(event)? {
                changed = Some(index);
            }
        }
        Ok(changed)
    }

    fn handle_event(&mut self, event: ControlEvent) -> Result<Option<usize>> {
        debug!(?event, "control event");
        match event {
            ControlEvent::Play => self.play()?,
            ControlEvent::Pause => self.pause()?,
            ControlEvent::Resume => self.resume()?,
            ControlEvent::TogglePause => self.apply(PlaybackEvent::TogglePause)?,
            ControlEvent::Stop => self.stop()?,
            ControlEvent::SetSpeed(speed) => self.set_speed(speed),
            ControlEvent::SpeedUp => self.set_speed(self.speed.faster()),
            ControlEvent::SpeedDown => self.set_speed(self.speed.slower()),
            ControlEvent::SetEq(preset) => self.set_eq(preset),
            ControlEvent::CycleEq => self.set_eq(self.eq.next()),
            ControlEvent::SeekForward => self.seek(self.config.seek_seconds as i64)?,
            ControlEvent::SeekBackward => self.seek(-(self.config.seek_seconds as i64))?,
            ControlEvent::NextTrack => {
                let previous = self.playlist.current_index();
                return match self.playlist.next() {
                    Some(index) => self.switch_track(index, previous),
                    None => {
                        debug!("no other track to skip to");
                        Ok(None)
                    }
                };
            }
            ControlEvent::PreviousTrack => {
                let previous = self.playlist.current_index();
                return match self.playlist.previous() {
                    Some(index) => self.switch_track(index, previous),
                    None => {
                        debug!("no other track to skip to");
                        Ok(None)
                    }
                };
            }
            ControlEvent::SelectTrack(index) => {
                let previous = self.playlist.current_index();
                if let Err(e) = self.playlist.select(index) {
                    warn!(error = %e, "track selection ignored");
                    return Ok(None);
                }
                return self.switch_track(index, previous);
            }
        }
        Ok(None)
    }

    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        if speed == self.speed {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = session.set_speed(speed.factor()) {
                warn!(error = %e, %speed, "speed change rejected");
                return;
            }
        }
        info!(from = %self.speed, to = %speed, "playback speed changed");
        self.speed = speed;
    }

    pub fn set_eq(&mut self, preset: EqPreset) {
        if let Some(fir) = self.fir.as_mut() {
            fir.set_preset(preset);
        }
        if preset != self.eq {
            info!(from = %self.eq, to = %preset, "equalizer preset changed");
        }
        self.eq = preset;
    }

    fn seek(&mut self, seconds: i64) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if !session.source().can_seek() {
            warn!(track = session.title(), "source cannot seek");
            return Ok(());
        }

        let step = session.format().frames_for_seconds(seconds.unsigned_abs() as f64) as i64;
        let position = session.seek_relative(if seconds < 0 { -step } else { step })?;
        info!(track = session.title(), position, "seeked");
        self.reset_fir();
        Ok(())
    }

    /// Load a track the listener asked for. On failure the previous
    /// selection is restored and playback carries on.
    fn switch_track(&mut self, index: usize, previous: usize) -> Result<Option<usize>> {
        if self.fsm.state() == PlaybackState::Stopped {
            return Ok(None);
        }
        match self.load_track(index) {
            Ok(()) => Ok(Some(index)),
            Err(e) => {
                error!(index, error = %e, "failed to load track");
                self.playlist.select(previous)?;
                Ok(None)
            }
        }
    }

    fn load_track(&mut self, index: usize) -> Result<()> {
        let track = self
            .playlist
            .get(index)
            .cloned()
            .ok_or(Error::TrackIndex {
                index,
                len: self.playlist.len(),
            })?;

        let source = self.loader.load(&track)?;
        let format = source.format();
        self.sink.configure(format)?;

        if let Some(fir) = self.fir.as_mut() {
            if format.supports_fir() {
                fir.set_format(format)?;
            } else {
                fir.reset();
            }
        }

        // Replacing the session drops the previous track's stretch state
        self.session = Some(TrackSession::open(
            index,
            track.title,
            source,
            &self.config.wsola,
            self.speed.factor(),
        ));
        self.metrics.record_track_started();
        Ok(())
    }

    fn finish_track(&mut self) -> Result<StepOutcome> {
        if let Some(session) = self.session.as_mut() {
            self.stretched.clear();
            session.flush_stretch(&mut self.stretched);
            let channels = session.format().channels as usize;
            write_all(
                &mut self.sink,
                &self.stretched,
                channels,
                self.config.max_underrun_retries,
                &self.metrics,
            )?;
            session.mark_finished();
            self.metrics.record_track_finished();
            info!(track = session.title(), "track finished");
        }

        match self.playlist.advance() {
            Some(index) => match self.load_track(index) {
                Ok(()) => Ok(StepOutcome::TrackChanged(index)),
                Err(e) => {
                    error!(index, error = %e, "failed to load next track");
                    self.stop()?;
                    Ok(StepOutcome::Stopped)
                }
            },
            None => {
                info!("end of playlist");
                self.stop()?;
                Ok(StepOutcome::Stopped)
            }
        }
    }

    /// Equalize, change speed, write. Returns frames written.
    fn process_block(&mut self, input: &[i16]) -> Result<usize> {
        let Some(session) = self.session.as_mut() else {
            return Ok(0);
        };
        let format = session.format();
        let channels = format.channels as usize;

        self.filtered.clear();
        let equalized: &[i16] = match self.fir.as_mut() {
            Some(fir) if format.supports_fir() => {
                let reserved = self.filtered.try_reserve(input.len());
                match run_stage(reserved, input, &mut self.filtered, |x, out| {
                    fir.process(x, out)
                }) {
                    Stage::Processed(samples) => samples,
                    Stage::Bypassed(samples) => {
                        warn!(samples = input.len(), "equalizer skipped, out of memory");
                        self.metrics.record_eq_bypass();
                        samples
                    }
                }
            }
            _ => {
                if session.take_eq_bypass_notice() {
                    warn!(track = session.title(), %format, "equalizer bypassed for track");
                }
                self.metrics.record_eq_bypass();
                input
            }
        };

        self.stretched.clear();
        let normal = self.speed.is_normal();
        let expected = (equalized.len() as f64 / self.speed.factor()).ceil() as usize
            + 2 * self.config.wsola.frame_len;
        let needs_stage = session.wsola().is_some() || !normal || session.varispeed().is_primed();
        let stretched: &[i16] = if needs_stage {
            let reserved = self.stretched.try_reserve(expected);
            match run_stage(reserved, equalized, &mut self.stretched, |x, out| {
                match session.wsola_mut() {
                    Some(wsola) => {
                        wsola.process(x, out);
                    }
                    None if normal => {
                        // Back at 1.0: play out the resampler's held frame first
                        session.varispeed_mut().flush(out);
                        out.extend_from_slice(x);
                    }
                    None => {
                        session.varispeed_mut().process(x, out);
                    }
                }
            }) {
                Stage::Processed(samples) => samples,
                Stage::Bypassed(samples) => {
                    warn!(samples = equalized.len(), "speed change skipped, out of memory");
                    self.metrics.record_stretch_bypass();
                    samples
                }
            }
        } else {
            equalized
        };

        write_all(
            &mut self.sink,
            stretched,
            channels,
            self.config.max_underrun_retries,
            &self.metrics,
        )
    }

    fn reset_fir(&mut self) {
        if let Some(fir) = self.fir.as_mut() {
            fir.reset();
        }
    }
}

/// Output of one pipeline stage for a block.
#[derive(Debug, PartialEq, Eq)]
enum Stage<'a> {
    Processed(&'a [i16]),
    /// Scratch space could not be reserved; the input passes through.
    Bypassed(&'a [i16]),
}

/// Run `stage` into `scratch` if its reservation succeeded.
fn run_stage<'a>(
    reserved: std::result::Result<(), TryReserveError>,
    input: &'a [i16],
    scratch: &'a mut Vec<i16>,
    stage: impl FnOnce(&[i16], &mut Vec<i16>),
) -> Stage<'a> {
    match reserved {
        Ok(()) => {
            stage(input, scratch);
            Stage::Processed(scratch)
        }
        Err(_) => Stage::Bypassed(input),
    }
}

/// Hand every whole frame of `samples` to the sink.
///
/// Underruns and would-block are recovered and the same frames retried.
/// More than `max_retries` consecutive recoveries without progress is an
/// [`Error::UnderrunStorm`]. Any other sink error is returned as is.
pub fn write_all<S: AudioSink + ?Sized>(
    sink: &mut S,
    samples: &[i16],
    channels: usize,
    max_retries: u32,
    metrics: &PlaybackMetrics,
) -> Result<usize> {
    let channels = channels.max(1);
    let whole = samples.len() - samples.len() % channels;
    let samples = &samples[..whole];

    let mut offset = 0;
    let mut stalled = 0u32;
    while offset < samples.len() {
        match sink.write(&samples[offset..]) {
            Ok(0) => {
                stalled += 1;
                if stalled > max_retries {
                    return Err(Error::UnderrunStorm {
                        retries: max_retries,
                    });
                }
                std::thread::yield_now();
            }
            Ok(frames) => {
                offset += frames * channels;
                stalled = 0;
                metrics.record_written(frames as u64);
            }
            Err(e) if e.is_recoverable() => {
                metrics.record_underrun();
                stalled += 1;
                if stalled > max_retries {
                    return Err(Error::UnderrunStorm {
                        retries: max_retries,
                    });
                }
                warn!(
                    error = %e,
                    pending = (samples.len() - offset) / channels,
                    "output underrun, recovering"
                );
                sink.recover()?;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(whole / channels)
}
