//! Time-stretch configuration and speed steps.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Discrete playback speeds offered to the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackSpeed {
    Half,
    #[default]
    Normal,
    OneAndHalf,
    Double,
}

impl PlaybackSpeed {
    /// All steps from slowest to fastest.
    pub const ALL: [PlaybackSpeed; 4] = [Self::Half, Self::Normal, Self::OneAndHalf, Self::Double];

    pub fn factor(self) -> f64 {
        match self {
            Self::Half => 0.5,
            Self::Normal => 1.0,
            Self::OneAndHalf => 1.5,
            Self::Double => 2.0,
        }
    }

    /// Step for an exact factor, if there is one.
    pub fn from_factor(factor: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| (s.factor() - factor).abs() < 1e-9)
    }

    /// Next faster step, saturating at 2.0x.
    pub fn faster(self) -> Self {
        match self {
            Self::Half => Self::Normal,
            Self::Normal => Self::OneAndHalf,
            Self::OneAndHalf | Self::Double => Self::Double,
        }
    }

    /// Next slower step, saturating at 0.5x.
    pub fn slower(self) -> Self {
        match self {
            Self::Double => Self::OneAndHalf,
            Self::OneAndHalf => Self::Normal,
            Self::Normal | Self::Half => Self::Half,
        }
    }

    pub fn is_normal(self) -> bool {
        self == Self::Normal
    }
}

impl std::fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}x", self.factor())
    }
}

/// Search heuristics. Tunable, not contractual.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WsolaTuning {
    /// Strength of the pull toward the previous offset (default: 0.15)
    pub continuity_bias: f32,
    /// Correlation below this counts as a poor match (default: 0.3)
    pub low_correlation_threshold: f32,
    /// Poor matches in a row before the search band narrows (default: 3)
    pub low_correlation_patience: usize,
    /// Share of buffered content one discard may reclaim (default: 0.5)
    pub max_discard_fraction: f64,
    /// Coarse search stride is `search_window / coarse_divisions` (default: 10)
    pub coarse_divisions: usize,
}

impl Default for WsolaTuning {
    fn default() -> Self {
        Self {
            continuity_bias: 0.15,
            low_correlation_threshold: 0.3,
            low_correlation_patience: 3,
            max_discard_fraction: 0.5,
            coarse_divisions: 10,
        }
    }
}

/// WSOLA frame geometry and ring sizing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WsolaConfig {
    /// Analysis frame length N (default: 512)
    pub frame_len: usize,
    /// Overlap length N_o, half the frame (default: 256)
    pub overlap_len: usize,
    /// Search half-width S_w in samples (default: 128)
    pub search_window: usize,
    /// Ring buffer capacity in samples (default: 16384)
    pub ring_capacity: usize,
    pub tuning: WsolaTuning,
}

impl Default for WsolaConfig {
    fn default() -> Self {
        Self::with_frame_len(512)
    }
}

impl WsolaConfig {
    /// Symmetric geometry for a frame length: N_o = N/2, S_w = N/4.
    pub fn with_frame_len(frame_len: usize) -> Self {
        let search_window = (frame_len / 4).max(1);
        Self {
            frame_len,
            overlap_len: frame_len / 2,
            search_window,
            ring_capacity: Self::min_ring_capacity_for(frame_len, search_window).max(16384),
            tuning: WsolaTuning::default(),
        }
    }

    fn min_ring_capacity_for(frame_len: usize, search_window: usize) -> usize {
        2 * (frame_len + 2 * search_window)
    }

    /// Smallest ring that can hold one search span plus a full burst of input.
    pub fn min_ring_capacity(&self) -> usize {
        Self::min_ring_capacity_for(self.frame_len, self.search_window)
    }

    /// Coarse search stride in samples.
    pub fn coarse_stride(&self) -> usize {
        (self.search_window / self.tuning.coarse_divisions.max(1)).max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_len == 0 || self.overlap_len == 0 {
            return Err(Error::InvalidConfig(format!(
                "frame_len {} and overlap_len {} must be non-zero",
                self.frame_len, self.overlap_len
            )));
        }
        if self.overlap_len >= self.frame_len {
            return Err(Error::OverlapTooLarge {
                overlap: self.overlap_len,
                frame: self.frame_len,
            });
        }
        if self.frame_len - self.overlap_len != self.overlap_len {
            return Err(Error::InvalidConfig(format!(
                "overlap_len {} must be half of frame_len {}",
                self.overlap_len, self.frame_len
            )));
        }
        if self.search_window == 0 {
            return Err(Error::InvalidConfig("search_window must be non-zero".into()));
        }
        if self.ring_capacity < self.min_ring_capacity() {
            return Err(Error::InvalidConfig(format!(
                "ring_capacity {} below minimum {}",
                self.ring_capacity,
                self.min_ring_capacity()
            )));
        }

        let t = &self.tuning;
        if !(0.0..=1.0).contains(&t.continuity_bias) {
            return Err(Error::InvalidConfig(format!(
                "continuity_bias {} out of range (0-1)",
                t.continuity_bias
            )));
        }
        if !(-1.0..=1.0).contains(&t.low_correlation_threshold) {
            return Err(Error::InvalidConfig(format!(
                "low_correlation_threshold {} out of range (-1-1)",
                t.low_correlation_threshold
            )));
        }
        if !(t.max_discard_fraction > 0.0 && t.max_discard_fraction <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "max_discard_fraction {} out of range (0-1]",
                t.max_discard_fraction
            )));
        }
        if t.coarse_divisions == 0 {
            return Err(Error::InvalidConfig("coarse_divisions must be non-zero".into()));
        }
        Ok(())
    }
}
