//! Fixed-tap FIR equalizer.
//!
//! Each channel keeps its own circular history of the last `taps - 1` input
//! samples, so stereo input (even/odd interleave) is filtered as two
//! independent lines. Output is rounded and clamped to 16 bits.
//!
//! Presets are linear-phase windowed-sinc designs computed for the track's
//! sample rate. `Normal` is a single unity tap and reproduces its input exactly.

use crate::signal::saturate_i16;
use crate::{Error, Result, TrackFormat};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;

/// Longest coefficient table the filter accepts.
pub const MAX_TAPS: usize = 64;

/// Tap count used for preset designs unless configured otherwise.
pub const DEFAULT_TAPS: usize = 31;

const BOOST_GAIN: f64 = 1.0;
const HEADROOM: f64 = 0.7;

/// Equalizer presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqPreset {
    #[default]
    Normal,
    BassBoost,
    TrebleBoost,
    VocalEnhance,
}

impl EqPreset {
    pub const ALL: [EqPreset; 4] = [
        Self::Normal,
        Self::BassBoost,
        Self::TrebleBoost,
        Self::VocalEnhance,
    ];

    /// Next preset in cycling order.
    pub fn next(self) -> Self {
        match self {
            Self::Normal => Self::BassBoost,
            Self::BassBoost => Self::TrebleBoost,
            Self::TrebleBoost => Self::VocalEnhance,
            Self::VocalEnhance => Self::Normal,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::BassBoost => "bass_boost",
            Self::TrebleBoost => "treble_boost",
            Self::VocalEnhance => "vocal_enhance",
        }
    }

    /// Coefficient table for this preset.
    ///
    /// `taps` is clamped to `3..=MAX_TAPS` and made odd so the design stays
    /// symmetric around a center tap.
    pub fn coefficients(self, sample_rate: u32, taps: usize) -> Vec<f32> {
        let taps = taps.clamp(3, MAX_TAPS);
        let taps = if taps % 2 == 0 { taps - 1 } else { taps };
        let sr = sample_rate.max(1) as f64;
        let center = taps / 2;

        let mut shaped: Vec<f64> = match self {
            Self::Normal => return vec![1.0],
            Self::BassBoost => lowpass(250.0, sr, taps),
            Self::TrebleBoost => {
                let mut hp: Vec<f64> = lowpass(4000.0, sr, taps).iter().map(|c| -c).collect();
                hp[center] += 1.0;
                hp
            }
            Self::VocalEnhance => {
                let low = lowpass(300.0, sr, taps);
                lowpass(3400.0, sr, taps)
                    .iter()
                    .zip(&low)
                    .map(|(hi, lo)| hi - lo)
                    .collect()
            }
        };

        // Unity path plus the boosted band
        for c in shaped.iter_mut() {
            *c *= BOOST_GAIN;
        }
        shaped[center] += 1.0;
        shaped.iter().map(|c| (c * HEADROOM) as f32).collect()
    }
}

impl std::fmt::Display for EqPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EqPreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "normal" | "flat" | "off" => Ok(Self::Normal),
            "bass" | "bass_boost" => Ok(Self::BassBoost),
            "treble" | "treble_boost" => Ok(Self::TrebleBoost),
            "vocal" | "vocal_enhance" => Ok(Self::VocalEnhance),
            other => Err(Error::InvalidConfig(format!("unknown EQ preset '{other}'"))),
        }
    }
}

/// Hamming-windowed sinc lowpass, normalized to unity gain at DC.
fn lowpass(cutoff_hz: f64, sample_rate: f64, taps: usize) -> Vec<f64> {
    let fc = (cutoff_hz / sample_rate).min(0.5);
    let m = (taps - 1) as f64;
    let mut h: Vec<f64> = (0..taps)
        .map(|n| {
            let x = n as f64 - m / 2.0;
            let sinc = if x == 0.0 {
                2.0 * fc
            } else {
                (2.0 * PI * fc * x).sin() / (PI * x)
            };
            let window = 0.54 - 0.46 * (2.0 * PI * n as f64 / m).cos();
            sinc * window
        })
        .collect();

    let sum: f64 = h.iter().sum();
    if sum.abs() > f64::EPSILON {
        for c in h.iter_mut() {
            *c /= sum;
        }
    }
    h
}

#[derive(Debug, Clone)]
struct History {
    line: Vec<f32>,
    write: usize,
}

impl History {
    fn new(len: usize) -> Self {
        Self {
            line: vec![0.0; len],
            write: 0,
        }
    }

    fn clear(&mut self) {
        self.line.fill(0.0);
        self.write = 0;
    }
}

/// Streaming FIR filter with per-channel history.
#[derive(Debug, Clone)]
pub struct FirFilter {
    preset: Option<EqPreset>,
    design_taps: usize,
    sample_rate: u32,
    coefficients: Vec<f32>,
    histories: Vec<History>,
}

impl FirFilter {
    /// Filter for a preset, designed for `format`'s sample rate.
    pub fn new(preset: EqPreset, format: TrackFormat, taps: usize) -> Result<Self> {
        check_taps(taps)?;
        let channels = check_channels(format.channels as usize)?;
        let coefficients = preset.coefficients(format.sample_rate, taps);
        Ok(Self {
            preset: Some(preset),
            design_taps: taps,
            sample_rate: format.sample_rate,
            histories: vec![History::new(coefficients.len() - 1); channels],
            coefficients,
        })
    }

    /// Filter with an explicit coefficient table.
    pub fn with_coefficients(coefficients: Vec<f32>, channels: usize) -> Result<Self> {
        if coefficients.is_empty() {
            return Err(Error::InvalidConfig("FIR needs at least one tap".into()));
        }
        check_taps(coefficients.len())?;
        let channels = check_channels(channels)?;
        Ok(Self {
            preset: None,
            design_taps: coefficients.len(),
            sample_rate: 0,
            histories: vec![History::new(coefficients.len() - 1); channels],
            coefficients,
        })
    }

    /// Preset in use, or `None` for a custom table.
    pub fn preset(&self) -> Option<EqPreset> {
        self.preset
    }

    pub fn taps(&self) -> usize {
        self.coefficients.len()
    }

    pub fn channels(&self) -> usize {
        self.histories.len()
    }

    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }

    pub fn is_identity(&self) -> bool {
        self.coefficients == [1.0]
    }

    /// True when every history line is zeroed.
    pub fn history_is_clear(&self) -> bool {
        self.histories
            .iter()
            .all(|h| h.write == 0 && h.line.iter().all(|&s| s == 0.0))
    }

    /// Switch preset. History is reset.
    pub fn set_preset(&mut self, preset: EqPreset) {
        self.preset = Some(preset);
        self.rebuild();
    }

    /// Adopt a new track format. History is reset.
    pub fn set_format(&mut self, format: TrackFormat) -> Result<()> {
        let channels = check_channels(format.channels as usize)?;
        self.sample_rate = format.sample_rate;
        self.histories = vec![History::new(0); channels];
        self.rebuild();
        Ok(())
    }

    /// Zero all history. Call whenever stream continuity is broken.
    pub fn reset(&mut self) {
        for history in &mut self.histories {
            history.clear();
        }
    }

    fn rebuild(&mut self) {
        if let Some(preset) = self.preset {
            self.coefficients = preset.coefficients(self.sample_rate, self.design_taps);
        }
        let len = self.coefficients.len() - 1;
        for history in &mut self.histories {
            *history = History::new(len);
        }
    }

    /// Filter interleaved `input`, appending the same number of samples to `output`.
    pub fn process(&mut self, input: &[i16], output: &mut Vec<i16>) {
        let channels = self.histories.len();
        let coeffs = &self.coefficients;
        let hist_len = coeffs.len() - 1;

        output.reserve(input.len());
        for (i, &x) in input.iter().enumerate() {
            let history = &mut self.histories[i % channels];
            let xf = x as f32;

            let mut acc = coeffs[0] * xf;
            if hist_len > 0 {
                for (j, &c) in coeffs.iter().enumerate().skip(1) {
                    let idx = (history.write + hist_len - j) % hist_len;
                    acc += c * history.line[idx];
                }
                history.line[history.write] = xf;
                history.write = (history.write + 1) % hist_len;
            }
            output.push(saturate_i16(acc));
        }
    }
}

fn check_taps(taps: usize) -> Result<()> {
    if taps > MAX_TAPS {
        return Err(Error::TooManyTaps {
            taps,
            max: MAX_TAPS,
        });
    }
    Ok(())
}

fn check_channels(channels: usize) -> Result<usize> {
    if (1..=2).contains(&channels) {
        Ok(channels)
    } else {
        Err(Error::UnsupportedFormat(format!(
            "FIR supports 1 or 2 channels, got {channels}"
        )))
    }
}
