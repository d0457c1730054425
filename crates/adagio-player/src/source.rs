//! Sample sources.
//!
//! A source hands out interleaved 16-bit blocks of any size until it runs
//! dry. Container parsing stays behind [`SampleSource`]; the player only
//! sees blocks and a fixed [`TrackFormat`].

use crate::{Error, Result};
use adagio_dsp::{SampleBlock, TrackFormat};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tracing::{info, warn};

pub trait SampleSource: Send {
    fn format(&self) -> TrackFormat;

    /// Next block of at most `max_frames` frames, or `None` at end of track.
    fn read_block(&mut self, max_frames: usize) -> Result<Option<SampleBlock>>;

    /// Move the read position to `frame`, clamped to the end of the track.
    fn seek(&mut self, frame: u64) -> Result<()>;

    /// Current read position in frames.
    fn position(&self) -> u64;

    fn total_frames(&self) -> Option<u64>;

    fn can_seek(&self) -> bool {
        true
    }
}

impl SampleSource for Box<dyn SampleSource> {
    fn format(&self) -> TrackFormat {
        (**self).format()
    }

    fn read_block(&mut self, max_frames: usize) -> Result<Option<SampleBlock>> {
        (**self).read_block(max_frames)
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        (**self).seek(frame)
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn total_frames(&self) -> Option<u64> {
        (**self).total_frames()
    }

    fn can_seek(&self) -> bool {
        (**self).can_seek()
    }
}

/// Interleaved samples held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    samples: Vec<i16>,
    format: TrackFormat,
    position: u64,
    seekable: bool,
}

impl MemorySource {
    pub fn new(mut samples: Vec<i16>, format: TrackFormat) -> Self {
        let channels = (format.channels as usize).max(1);
        let whole = samples.len() - samples.len() % channels;
        if whole != samples.len() {
            warn!(
                dropped = samples.len() - whole,
                channels, "dropping trailing partial frame"
            );
            samples.truncate(whole);
        }
        Self {
            samples,
            format,
            position: 0,
            seekable: true,
        }
    }

    /// Behave like a stream that cannot seek.
    pub fn without_seek(mut self) -> Self {
        self.seekable = false;
        self
    }

    fn channels(&self) -> usize {
        (self.format.channels as usize).max(1)
    }

    fn frames(&self) -> u64 {
        (self.samples.len() / self.channels()) as u64
    }
}

impl SampleSource for MemorySource {
    fn format(&self) -> TrackFormat {
        self.format
    }

    fn read_block(&mut self, max_frames: usize) -> Result<Option<SampleBlock>> {
        let remaining = self.frames() - self.position;
        if remaining == 0 || max_frames == 0 {
            return Ok(None);
        }
        let frames = remaining.min(max_frames as u64) as usize;
        let ch = self.channels();
        let start = self.position as usize * ch;
        let samples = self.samples[start..start + frames * ch].to_vec();
        self.position += frames as u64;
        Ok(Some(SampleBlock::new(samples, self.format)))
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        if !self.seekable {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "source is not seekable",
            )));
        }
        self.position = frame.min(self.frames());
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn total_frames(&self) -> Option<u64> {
        Some(self.frames())
    }

    fn can_seek(&self) -> bool {
        self.seekable
    }
}

/// 16-bit integer PCM read from a WAV container.
pub struct WavSource<R: Read + Seek = BufReader<File>> {
    reader: hound::WavReader<R>,
    format: TrackFormat,
    total_frames: u64,
    position: u64,
}

impl WavSource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = hound::WavReader::open(path.as_ref())?;
        Self::from_reader(reader)
    }
}

impl<R: Read + Seek> WavSource<R> {
    pub fn new(reader: R) -> Result<Self> {
        Self::from_reader(hound::WavReader::new(reader)?)
    }

    fn from_reader(reader: hound::WavReader<R>) -> Result<Self> {
        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(Error::Dsp(adagio_dsp::Error::UnsupportedFormat(format!(
                "{}-bit {:?} WAV, need 16-bit integer PCM",
                spec.bits_per_sample, spec.sample_format
            ))));
        }
        if spec.channels == 0 {
            return Err(Error::Dsp(adagio_dsp::Error::UnsupportedFormat(
                "WAV declares zero channels".into(),
            )));
        }

        let format = TrackFormat::new(spec.sample_rate, spec.channels, spec.bits_per_sample);
        let total_frames = reader.duration() as u64;
        let partial = reader.len() as usize % spec.channels as usize;
        if partial != 0 {
            info!(partial, "WAV data ends with a partial frame, it will be ignored");
        }

        Ok(Self {
            reader,
            format,
            total_frames,
            position: 0,
        })
    }
}

impl<R: Read + Seek + Send> SampleSource for WavSource<R> {
    fn format(&self) -> TrackFormat {
        self.format
    }

    fn read_block(&mut self, max_frames: usize) -> Result<Option<SampleBlock>> {
        let remaining = self.total_frames.saturating_sub(self.position);
        if remaining == 0 || max_frames == 0 {
            return Ok(None);
        }

        let ch = self.format.channels as usize;
        let frames = remaining.min(max_frames as u64) as usize;
        let mut samples = Vec::with_capacity(frames * ch);
        for sample in self.reader.samples::<i16>().take(frames * ch) {
            samples.push(sample?);
        }

        let whole = samples.len() - samples.len() % ch;
        samples.truncate(whole);
        if samples.is_empty() {
            return Ok(None);
        }
        self.position += (whole / ch) as u64;
        Ok(Some(SampleBlock::new(samples, self.format)))
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        let target = frame.min(self.total_frames);
        let target = u32::try_from(target).unwrap_or(u32::MAX);
        self.reader.seek(target)?;
        self.position = target as u64;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn total_frames(&self) -> Option<u64> {
        Some(self.total_frames)
    }
}
