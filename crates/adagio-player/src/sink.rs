//! Audio sinks.
//!
//! A sink accepts interleaved frames and may accept fewer than offered.
//! Underruns and would-block conditions are recoverable: the caller invokes
//! [`AudioSink::recover`] and retries the same data.

use adagio_dsp::TrackFormat;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// Device ran dry and needs re-preparing.
    #[error("Output underrun")]
    Underrun,

    /// Device is temporarily not accepting data.
    #[error("Output would block")]
    WouldBlock,

    /// Unrecoverable device failure.
    #[error("Device failure: {0}")]
    Device(String),

    /// Sink was closed.
    #[error("Output closed")]
    Closed,
}

impl SinkError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Underrun | Self::WouldBlock)
    }
}

pub trait AudioSink {
    /// Prepare for a track's format. Called before its first block.
    fn configure(&mut self, format: TrackFormat) -> Result<(), SinkError>;

    /// Write interleaved samples. Returns the number of whole frames accepted.
    fn write(&mut self, samples: &[i16]) -> Result<usize, SinkError>;

    /// Re-prepare after an underrun.
    fn recover(&mut self) -> Result<(), SinkError>;

    fn set_paused(&mut self, _paused: bool) -> Result<(), SinkError> {
        Ok(())
    }

    /// Block until queued audio has played.
    fn drain(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn configure(&mut self, format: TrackFormat) -> Result<(), SinkError> {
        (**self).configure(format)
    }

    fn write(&mut self, samples: &[i16]) -> Result<usize, SinkError> {
        (**self).write(samples)
    }

    fn recover(&mut self) -> Result<(), SinkError> {
        (**self).recover()
    }

    fn set_paused(&mut self, paused: bool) -> Result<(), SinkError> {
        (**self).set_paused(paused)
    }

    fn drain(&mut self) -> Result<(), SinkError> {
        (**self).drain()
    }
}

/// Collects everything written. Scriptable failures for tests and offline
/// rendering.
#[derive(Debug, Default)]
pub struct MemorySink {
    samples: Vec<i16>,
    channels: usize,
    configured: Vec<TrackFormat>,
    max_frames_per_write: Option<usize>,
    underrun_at: Vec<usize>,
    would_block_at: Vec<usize>,
    fatal_at: Option<usize>,
    write_calls: usize,
    recoveries: usize,
    paused: bool,
    drained: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            channels: 1,
            ..Default::default()
        }
    }

    /// Accept at most `frames` per write call.
    pub fn with_max_frames_per_write(mut self, frames: usize) -> Self {
        self.max_frames_per_write = Some(frames.max(1));
        self
    }

    /// Fail the given write call (0-based) with an underrun.
    pub fn with_underrun_at(mut self, call: usize) -> Self {
        self.underrun_at.push(call);
        self
    }

    /// Fail the given write call (0-based) with would-block.
    pub fn with_would_block_at(mut self, call: usize) -> Self {
        self.would_block_at.push(call);
        self
    }

    /// Fail the given write call (0-based) and every later one fatally.
    pub fn with_fatal_error_at(mut self, call: usize) -> Self {
        self.fatal_at = Some(call);
        self
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    pub fn recoveries(&self) -> usize {
        self.recoveries
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls
    }

    pub fn configured_formats(&self) -> &[TrackFormat] {
        &self.configured
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn was_drained(&self) -> bool {
        self.drained
    }
}

impl AudioSink for MemorySink {
    fn configure(&mut self, format: TrackFormat) -> Result<(), SinkError> {
        self.channels = (format.channels as usize).max(1);
        self.configured.push(format);
        Ok(())
    }

    fn write(&mut self, samples: &[i16]) -> Result<usize, SinkError> {
        let call = self.write_calls;
        self.write_calls += 1;

        if self.fatal_at.is_some_and(|at| call >= at) {
            return Err(SinkError::Device("scripted failure".into()));
        }
        if self.underrun_at.contains(&call) {
            return Err(SinkError::Underrun);
        }
        if self.would_block_at.contains(&call) {
            return Err(SinkError::WouldBlock);
        }

        let channels = self.channels.max(1);
        let offered = samples.len() / channels;
        let frames = self
            .max_frames_per_write
            .map_or(offered, |max| offered.min(max));
        self.samples.extend_from_slice(&samples[..frames * channels]);
        Ok(frames)
    }

    fn recover(&mut self) -> Result<(), SinkError> {
        self.recoveries += 1;
        Ok(())
    }

    fn set_paused(&mut self, paused: bool) -> Result<(), SinkError> {
        self.paused = paused;
        Ok(())
    }

    fn drain(&mut self) -> Result<(), SinkError> {
        self.drained = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(SinkError::Underrun.is_recoverable());
        assert!(SinkError::WouldBlock.is_recoverable());
        assert!(!SinkError::Closed.is_recoverable());
        assert!(!SinkError::Device("gone".into()).is_recoverable());
    }

    #[test]
    fn test_memory_sink_partial_writes() {
        let mut sink = MemorySink::new().with_max_frames_per_write(3);
        sink.configure(TrackFormat::stereo(44100)).unwrap();

        let frames = sink.write(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]).unwrap();
        assert_eq!(frames, 3);
        assert_eq!(sink.samples(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_memory_sink_scripted_failures() {
        let mut sink = MemorySink::new()
            .with_underrun_at(1)
            .with_would_block_at(2)
            .with_fatal_error_at(4);
        sink.configure(TrackFormat::mono(8000)).unwrap();

        assert_eq!(sink.write(&[1]), Ok(1));
        assert_eq!(sink.write(&[2]), Err(SinkError::Underrun));
        assert_eq!(sink.write(&[2]), Err(SinkError::WouldBlock));
        assert_eq!(sink.write(&[2]), Ok(1));
        assert!(matches!(sink.write(&[3]), Err(SinkError::Device(_))));
        assert!(matches!(sink.write(&[3]), Err(SinkError::Device(_))));
        assert_eq!(sink.samples(), &[1, 2]);
        assert_eq!(sink.write_calls(), 6);
    }
}
