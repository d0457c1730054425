//! Track format and interleaved sample blocks.

use serde::{Deserialize, Serialize};

/// PCM format of a track. Fixed for the lifetime of the track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl Default for TrackFormat {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            bits_per_sample: 16,
        }
    }
}

impl TrackFormat {
    pub fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /// 16-bit mono at the given rate.
    pub fn mono(sample_rate: u32) -> Self {
        Self::new(sample_rate, 1, 16)
    }

    /// 16-bit stereo at the given rate.
    pub fn stereo(sample_rate: u32) -> Self {
        Self::new(sample_rate, 2, 16)
    }

    /// The FIR equalizer keeps one history line per channel and handles up to two.
    pub fn supports_fir(&self) -> bool {
        self.bits_per_sample == 16 && (1..=2).contains(&self.channels)
    }

    /// Time-scale modification is mono only.
    pub fn supports_wsola(&self) -> bool {
        self.bits_per_sample == 16 && self.channels == 1
    }

    /// Bytes per interleaved frame.
    pub fn block_align(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }

    /// Frames corresponding to a duration in seconds.
    pub fn frames_for_seconds(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.sample_rate as f64).round() as u64
    }
}

impl std::fmt::Display for TrackFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {}-bit",
            self.sample_rate, self.channels, self.bits_per_sample
        )
    }
}

/// Interleaved 16-bit samples tagged with their track format.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SampleBlock {
    pub samples: Vec<i16>,
    pub format: TrackFormat,
}

impl SampleBlock {
    pub fn new(samples: Vec<i16>, format: TrackFormat) -> Self {
        Self { samples, format }
    }

    /// Number of complete frames in the block.
    pub fn frames(&self) -> usize {
        match self.format.channels {
            0 => 0,
            ch => self.samples.len() / ch as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn channels(&self) -> usize {
        self.format.channels as usize
    }
}
